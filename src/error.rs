//! Error taxonomy shared by the engine, the store and the HTTP layer

use thiserror::Error;

use crate::state::TimerId;

/// Errors raised by timer and collection operations
#[derive(Debug, Error)]
pub enum TimerError {
    /// Rejected input such as an empty name or an out-of-range index
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No timer with this id exists in the collection
    #[error("timer {0} not found")]
    NotFound(TimerId),

    /// Saved state could not be decoded
    #[error("saved timers are corrupt: {0}")]
    PersistenceCorrupt(String),

    /// The durable store failed to read or write
    #[error("store I/O failed for key '{key}': {source}")]
    Store {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("shared timer state lock poisoned")]
    StatePoisoned,
}

impl TimerError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

pub type Result<T> = std::result::Result<T, TimerError>;
