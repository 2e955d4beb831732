//! Change notifications published for observers of the timer list

use serde::Serialize;

use super::{RunState, TimerId};

/// Something changed in the timer list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TimerEvent {
    Added { id: TimerId },
    Removed { id: TimerId },
    Renamed { id: TimerId },
    Started { id: TimerId },
    PauseToggled { id: TimerId, run_state: RunState },
    Stopped { id: TimerId },
    Moved { from: usize, to: usize },
    ResetAll,
    Suspended,
    Resumed,
    Saved,
}

impl TimerEvent {
    /// Edits to the list itself or to what a timer is called; these are
    /// worth persisting right away
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            TimerEvent::Added { .. }
                | TimerEvent::Removed { .. }
                | TimerEvent::Renamed { .. }
                | TimerEvent::Moved { .. }
                | TimerEvent::ResetAll
        )
    }
}
