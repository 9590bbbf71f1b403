//! Storage sink trait and its error type

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Failure reported by a storage sink
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("object not found: {key}")]
    NotFound { key: String },

    #[error("transient failure on '{key}': {message}")]
    Transient { key: String, message: String },

    #[error("failure on '{key}': {message}")]
    Permanent { key: String, message: String },

    #[error("key '{key}' is outside storage root '{root}'")]
    InvalidKey { key: String, root: String },
}

impl StorageError {
    /// Create a transient (retryable) error
    pub fn transient(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a permanent error
    pub fn permanent(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Permanent {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Key the failure refers to
    pub fn key(&self) -> &str {
        match self {
            StorageError::NotFound { key }
            | StorageError::Transient { key, .. }
            | StorageError::Permanent { key, .. }
            | StorageError::InvalidKey { key, .. } => key,
        }
    }

    /// Check if retrying the same operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Transient { .. })
    }
}

/// Key/value object store capability
///
/// Keys are fully-qualified (`gs://bucket/ns/entity/schema.avsc`).
/// `put` must be atomic: a partially written object is never visible.
#[async_trait]
pub trait StorageSink: Send + Sync + std::fmt::Debug {
    /// Read a whole object
    async fn get(&self, key: &str) -> Result<Bytes, StorageError>;

    /// Write a whole object, replacing any existing one
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StorageError>;
}
