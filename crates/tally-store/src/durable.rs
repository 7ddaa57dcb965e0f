//! Durable configuration store backed by an embedded sled database

use std::path::Path;

use async_trait::async_trait;

use crate::{ConfigStore, Result, StoreError};

/// Durable store persisting each document as one sled entry
pub struct SledConfigStore {
    db: sled::Db,
}

impl SledConfigStore {
    /// Open (or create) a database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Wrap an already-open database
    pub fn with_db(db: sled::Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConfigStore for SledConfigStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.db.get(key)? {
            Some(ivec) => {
                let text = String::from_utf8(ivec.to_vec()).map_err(|_| StoreError::Encoding {
                    key: key.to_string(),
                })?;
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.db.insert(key, value.as_bytes())?;
        // Writes carry configuration state; make them survive a crash.
        self.db
            .flush_async()
            .await
            .map_err(|e| StoreError::backend(e.to_string()))?;
        tracing::debug!(key, bytes = value.len(), "config document persisted");
        Ok(())
    }
}
