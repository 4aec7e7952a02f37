//! Durable single-slot storage for the in-flight session.

mod queue;
mod session_store;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::db::Database;
use crate::error::StorageError;

pub use queue::PersistQueue;
pub use session_store::{PersistedRecord, PersistedSessionStore, ACTIVE_SESSION_KEY, RECORD_VERSION};

/// Durable key-value capability the session store is built on.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;
    /// Deleting a missing key succeeds.
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local store. Clones share entries, so a "restarted" controller
/// built from a clone sees what the previous one wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.entries().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.entries().remove(key);
        Ok(())
    }
}

/// The `kv` table of the app database.
#[derive(Clone)]
pub struct SqliteKv {
    db: Database,
}

impl SqliteKv {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl KeyValueStore for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.db.kv_get(key)?)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        Ok(self.db.kv_set(key, value)?)
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        Ok(self.db.kv_delete(key)?)
    }
}
