//! Cooperatively scheduled accrual tick

use chrono::{DateTime, Duration, Utc};

/// Handle for a timer's recurring one-second tick.
///
/// The handle only records when the next tick is due; a single driver calls
/// [`TickHandle::fire_due`] and the owning timer decides what a fire means.
/// Dropping the handle cancels the schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickHandle {
    next_fire: DateTime<Utc>,
}

impl TickHandle {
    pub const PERIOD_SECS: i64 = 1;

    /// Arm a tick whose first fire is one period after `now`
    pub fn schedule(now: DateTime<Utc>) -> Self {
        Self {
            next_fire: now + Duration::seconds(Self::PERIOD_SECS),
        }
    }

    pub fn next_fire(&self) -> DateTime<Utc> {
        self.next_fire
    }

    /// Consume every fire due at or before `now` and return how many there were
    pub fn fire_due(&mut self, now: DateTime<Utc>) -> u64 {
        if now < self.next_fire {
            return 0;
        }
        let behind = (now - self.next_fire).num_seconds() / Self::PERIOD_SECS;
        let fires = behind + 1;
        self.next_fire += Duration::seconds(fires * Self::PERIOD_SECS);
        fires as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_elapsed_period() {
        let start = Utc::now();
        let mut tick = TickHandle::schedule(start);

        assert_eq!(tick.fire_due(start), 0);
        assert_eq!(tick.fire_due(start + Duration::milliseconds(999)), 0);
        assert_eq!(tick.fire_due(start + Duration::seconds(1)), 1);
        assert_eq!(tick.fire_due(start + Duration::milliseconds(1500)), 0);
        assert_eq!(tick.fire_due(start + Duration::seconds(5)), 4);
        assert_eq!(tick.next_fire(), start + Duration::seconds(6));
    }

    #[test]
    fn clock_going_backwards_fires_nothing() {
        let start = Utc::now();
        let mut tick = TickHandle::schedule(start);
        assert_eq!(tick.fire_due(start - Duration::seconds(30)), 0);
        assert_eq!(tick.next_fire(), start + Duration::seconds(1));
    }
}
