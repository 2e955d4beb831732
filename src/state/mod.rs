//! State management module
//!
//! This module contains the timer engine and the shared application state
//! that owns it.

pub mod app_state;
pub mod collection;
pub mod events;
pub mod snapshot;
pub mod tick;
pub mod timer;
pub mod visit;

// Re-export main types
pub use app_state::AppState;
pub use collection::{TimerCollection, TIMERS_KEY};
pub use events::TimerEvent;
pub use snapshot::{ComplexityCodes, TimerSnapshot};
pub use tick::TickHandle;
pub use timer::{RunState, Timer, TimerId, TimerRecord};
pub use visit::VisitType;
