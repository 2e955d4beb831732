//! Clinic Timer - named visit timers with billing complexity codes
//!
//! This library tracks elapsed active time for a list of independently
//! controlled timers, derives a complexity code from elapsed time and the
//! visit type encoded in each timer's name, and keeps that state across
//! process suspension and restarts.

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod state;
pub mod store;
pub mod tasks;

// Re-export commonly used types
pub use api::create_router;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::TimerError;
pub use state::{AppState, RunState, Timer, TimerCollection, TimerId, VisitType};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use tasks::shutdown_signal;
