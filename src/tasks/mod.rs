//! Background tasks module
//!
//! This module contains background tasks that run alongside the HTTP server.

pub mod accrual_tick;
pub mod autosave;
pub mod lifecycle;

// Re-export main functions
pub use accrual_tick::accrual_tick_task;
pub use autosave::autosave_task;
pub use lifecycle::{lifecycle_signal_task, shutdown_signal};
