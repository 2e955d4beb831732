//! Visit-type classification and complexity code tables

use serde::{Deserialize, Serialize};

/// Billing classification of a visit, derived from the timer name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitType {
    Established,
    New,
    Phone,
}

/// Tier table: inclusive upper bound in minutes paired with its code,
/// followed by the code used past the last bound
struct Tiers {
    bounds: &'static [(u64, u8)],
    beyond: u8,
}

const ESTABLISHED: Tiers = Tiers {
    bounds: &[(10, 1), (20, 2), (30, 3), (40, 4)],
    beyond: 5,
};

const NEW: Tiers = Tiers {
    bounds: &[(20, 1), (30, 2), (45, 3), (60, 4)],
    beyond: 5,
};

const PHONE: Tiers = Tiers {
    bounds: &[(10, 1), (20, 2)],
    beyond: 3,
};

impl VisitType {
    /// Classify a timer name: "phone" wins over "new", anything else is established
    pub fn classify(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.contains("phone") {
            VisitType::Phone
        } else if name.contains("new") {
            VisitType::New
        } else {
            VisitType::Established
        }
    }

    /// Complexity code for `elapsed_seconds` of work on this kind of visit
    pub fn complexity_code(self, elapsed_seconds: f64) -> u8 {
        let minutes = billable_minutes(elapsed_seconds);
        let tiers = self.tiers();
        tiers
            .bounds
            .iter()
            .find(|(upper, _)| minutes <= *upper)
            .map(|(_, code)| *code)
            .unwrap_or(tiers.beyond)
    }

    /// Highest code this visit type can reach
    pub fn max_code(self) -> u8 {
        self.tiers().beyond
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VisitType::Established => "established",
            VisitType::New => "new",
            VisitType::Phone => "phone",
        }
    }

    fn tiers(self) -> &'static Tiers {
        match self {
            VisitType::Established => &ESTABLISHED,
            VisitType::New => &NEW,
            VisitType::Phone => &PHONE,
        }
    }
}

impl std::fmt::Display for VisitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minutes compared against the tier bounds. A started minute counts, so
/// 10:00 is still within "10 minutes" while 10:01 is not.
fn billable_minutes(elapsed_seconds: f64) -> u64 {
    if !elapsed_seconds.is_finite() || elapsed_seconds <= 0.0 {
        return 0;
    }
    (elapsed_seconds / 60.0).ceil() as u64
}
