//! File-backed Session Storage
//!
//! Keeps all keys in a single JSON object on disk so a session survives a
//! process restart. Writes go to a sibling temp file that is renamed over the
//! original.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StorageError;
use crate::token::SessionStore;

/// JSON file store.
pub struct FileSessionStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileSessionStore {
    /// Create a store at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| StorageError::CorruptedData {
                message: format!("{}: {}", self.path.display(), e),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StorageError::ReadFailed {
                message: format!("{}: {}", self.path.display(), e),
            }),
        }
    }

    async fn save(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let write_failed = |e: &dyn std::fmt::Display| StorageError::WriteFailed {
            message: format!("{}: {}", self.path.display(), e),
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| write_failed(&e))?;
        }

        let raw = serde_json::to_string_pretty(values).map_err(|e| write_failed(&e))?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, raw)
            .await
            .map_err(|e| write_failed(&e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| write_failed(&e))?;

        debug!(path = %self.path.display(), keys = values.len(), "session file written");
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut values = self.load().await?;
        values.insert(key.to_string(), value.to_string());
        self.save(&values).await
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let _guard = self.lock.lock().await;
        let mut values = self.load().await?;
        if values.remove(key).is_none() {
            return Ok(false);
        }
        self.save(&values).await.map_err(|e| StorageError::DeleteFailed {
            message: e.to_string(),
        })?;
        Ok(true)
    }
}
