//! A store whose writes always fail, for exercising save-failure paths.

use std::path::PathBuf;

use super::{KeyValueStore, MemoryStore, StorageError};

/// Reads come from `seed`; every `set` and `remove` is recorded and fails.
#[derive(Debug, Default)]
pub struct FailingStore {
    pub seed: MemoryStore,
    pub attempted: Vec<String>,
}

impl FailingStore {
    pub const fn new(seed: MemoryStore) -> Self {
        Self {
            seed,
            attempted: Vec::new(),
        }
    }

    fn fail(&mut self, key: &str) -> StorageError {
        self.attempted.push(key.to_string());
        StorageError::Io {
            path: PathBuf::from(format!("{key}.json")),
            source: std::io::Error::other("disk full"),
        }
    }
}

impl KeyValueStore for FailingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.seed.get(key)
    }

    fn set(&mut self, key: &str, _value: &str) -> Result<(), StorageError> {
        Err(self.fail(key))
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        Err(self.fail(key))
    }
}
