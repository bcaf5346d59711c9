//! Session Storage
//!
//! Persistent key-value storage for session material. Values are strings
//! stored under the fixed keys in [`StorageKeys`](crate::types::StorageKeys).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::StorageError;

/// Persistent store interface.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read the value stored under a key.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value under a key.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Returns whether it existed.
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;
}

/// In-memory store, scoped to the owning process.
#[derive(Default)]
pub struct InMemorySessionStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemorySessionStore {
    /// Create new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn values(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.values.lock().map_err(|_| StorageError::ReadFailed {
            message: "session store lock poisoned".to_string(),
        })
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.values()?.remove(key).is_some())
    }
}

/// Mock store for testing.
#[derive(Default)]
pub struct MockSessionStore {
    values: Mutex<HashMap<String, String>>,
    set_history: Mutex<Vec<(String, String)>>,
    remove_history: Mutex<Vec<String>>,
    fail_reads: Mutex<bool>,
    fail_writes: Mutex<bool>,
}

impl MockSessionStore {
    /// Create new mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a value without recording history.
    pub fn add_value(&self, key: &str, value: &str) -> &Self {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Read a value without going through the trait.
    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    /// Make reads fail.
    pub fn set_fail_reads(&self, fail: bool) -> &Self {
        *self.fail_reads.lock().unwrap() = fail;
        self
    }

    /// Make writes and removals fail.
    pub fn set_fail_writes(&self, fail: bool) -> &Self {
        *self.fail_writes.lock().unwrap() = fail;
        self
    }

    /// Get set history.
    pub fn get_set_history(&self) -> Vec<(String, String)> {
        self.set_history.lock().unwrap().clone()
    }

    /// Get remove history.
    pub fn get_remove_history(&self) -> Vec<String> {
        self.remove_history.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionStore for MockSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if *self.fail_reads.lock().unwrap() {
            return Err(StorageError::ReadFailed {
                message: "Mock storage failure".to_string(),
            });
        }
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if *self.fail_writes.lock().unwrap() {
            return Err(StorageError::WriteFailed {
                message: "Mock storage failure".to_string(),
            });
        }
        self.set_history
            .lock()
            .unwrap()
            .push((key.to_string(), value.to_string()));
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        if *self.fail_writes.lock().unwrap() {
            return Err(StorageError::DeleteFailed {
                message: "Mock storage failure".to_string(),
            });
        }
        self.remove_history.lock().unwrap().push(key.to_string());
        Ok(self.values.lock().unwrap().remove(key).is_some())
    }
}

/// Create in-memory session store.
pub fn create_in_memory_session_store() -> InMemorySessionStore {
    InMemorySessionStore::new()
}

/// Create mock session store for testing.
pub fn create_mock_session_store() -> MockSessionStore {
    MockSessionStore::new()
}
