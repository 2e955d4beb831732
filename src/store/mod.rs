//! Durable key-value storage
//!
//! The timer collection persists itself as one opaque value under a fixed
//! key. Anything that can read and overwrite bytes by key can back it.

pub mod file_store;
pub mod memory_store;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;

use crate::error::Result;

/// Local durable key-value store with synchronous, bounded-latency access
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` if nothing was ever written
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Overwrite the value stored under `key`
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;
}
