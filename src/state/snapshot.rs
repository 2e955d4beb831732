//! Read-only view of a timer handed to the presentation layer

use serde::{Deserialize, Serialize};

use super::{RunState, Timer, TimerId, VisitType};

/// Complexity codes for each visit type at the current elapsed time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityCodes {
    pub established: u8,
    pub new: u8,
    pub phone: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub id: TimerId,
    pub name: String,
    pub elapsed_seconds: f64,
    pub elapsed: String,
    pub run_state: RunState,
    pub visit_type: VisitType,
    pub complexity_code: u8,
    pub complexity_codes: ComplexityCodes,
}

impl From<&Timer> for TimerSnapshot {
    fn from(timer: &Timer) -> Self {
        Self {
            id: timer.id(),
            name: timer.name().to_string(),
            elapsed_seconds: timer.elapsed_seconds(),
            elapsed: timer.formatted_elapsed(),
            run_state: timer.run_state(),
            visit_type: timer.visit_type(),
            complexity_code: timer.complexity_code(),
            complexity_codes: ComplexityCodes {
                established: timer.complexity_code_for(VisitType::Established),
                new: timer.complexity_code_for(VisitType::New),
                phone: timer.complexity_code_for(VisitType::Phone),
            },
        }
    }
}
