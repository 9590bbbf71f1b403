//! Error types for fnavro
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use crate::storage::StorageError;
use thiserror::Error;

/// The main error type for fnavro
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Schema Errors
    // ============================================================================
    #[error("Schema not found: {key}")]
    SchemaNotFound { key: String },

    #[error("Invalid schema at '{key}': {message}")]
    SchemaParse { key: String, message: String },

    // ============================================================================
    // Mapping Errors
    // ============================================================================
    #[error("Cannot map field '{field}': {reason}")]
    Mapping { field: String, reason: String },

    // ============================================================================
    // Writer Errors
    // ============================================================================
    #[error("Writer is closed")]
    WriterClosed,

    #[error("Writer already closed")]
    AlreadyClosed,

    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Upload of shard {shard} to '{key}' failed: {source}")]
    Upload {
        shard: usize,
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("{} shard(s) failed: {}", .failures.len(), describe_failures(.failures))]
    ShardUploads { failures: Vec<ShardFailure> },

    // ============================================================================
    // Storage / I/O Errors
    // ============================================================================
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

/// A single shard that could not be persisted during close
#[derive(Debug)]
pub struct ShardFailure {
    /// Shard index
    pub shard: usize,
    /// Destination key
    pub key: String,
    /// Underlying failure (encode or upload)
    pub error: Box<Error>,
}

fn describe_failures(failures: &[ShardFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("[shard {} '{}': {}]", f.shard, f.key, f.error))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a schema parse error for the given key
    pub fn schema_parse(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaParse {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a mapping error naming the field
    pub fn mapping(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Mapping {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an encode error
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Shard failures carried by a `ShardUploads` error, empty otherwise
    pub fn shard_failures(&self) -> &[ShardFailure] {
        match self {
            Error::ShardUploads { failures } => failures,
            _ => &[],
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Storage(e) | Error::Upload { source: e, .. } => e.is_retryable(),
            _ => false,
        }
    }
}

/// Result type alias for fnavro
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
