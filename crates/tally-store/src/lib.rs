//! Tally Store - Key-value configuration persistence
//!
//! The orchestration layer persists exactly one JSON document per key
//! (for example the multi-provider LLM configuration). This crate exposes
//! the [`ConfigStore`] trait with get/put-by-key semantics and two
//! implementations:
//!
//! - [`SledConfigStore`] — durable, backed by an embedded sled database
//! - [`MemoryConfigStore`] — in-process, for tests and embedded use
//!
//! Writes replace the whole document: last writer wins. There is no
//! optimistic locking; concurrent admin edits can race.

pub mod durable;
pub mod memory;

pub use durable::SledConfigStore;
pub use memory::MemoryConfigStore;

use async_trait::async_trait;
use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by configuration stores
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing database failed
    #[error("Storage backend error: {message}")]
    Backend { message: String },

    /// A stored value was not valid UTF-8
    #[error("Stored value under key '{key}' is not valid UTF-8")]
    Encoding { key: String },
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

impl From<sled::Error> for StoreError {
    fn from(e: sled::Error) -> Self {
        Self::Backend {
            message: e.to_string(),
        }
    }
}

/// A store holding one serialized document per key.
///
/// Core code only needs get/set-by-key; partial updates are intentionally
/// not part of the contract.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Fetch the document stored under `key`, if any
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the document stored under `key`
    async fn put(&self, key: &str, value: &str) -> Result<()>;
}
