//! In-process store for tests and for embedding the engine without a disk

use std::{collections::HashMap, sync::Mutex};

use super::KeyValueStore;
use crate::error::{Result, TimerError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let values = self.values.lock().map_err(|_| TimerError::StatePoisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| TimerError::StatePoisoned)?;
        values.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
