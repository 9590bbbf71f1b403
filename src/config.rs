//! Client configuration
//!
//! Everything a `Client` needs is passed in explicitly through
//! `ClientConfig`; nothing is read from the process environment except by
//! `CredentialSource::Environment`, which defers to the object store SDK.
//!
//! # Example
//!
//! ```yaml
//! bucket: gs://exports
//! namespace: knowledge_hub/fund
//! credentials:
//!   type: service_account_file
//!   path: ./service-account.json
//! writer:
//!   empty_shards: skip
//!   upload_concurrency: 8
//! retry:
//!   max_retries: 5
//!   initial_backoff: 200
//! rounding: half_even
//! ```

use crate::error::{Error, Result};
use crate::storage::RetryPolicy;
use crate::types::RoundingMode;
use crate::writer::WriterOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where object store credentials come from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialSource {
    /// The SDK's standard environment lookup
    #[default]
    Environment,
    /// A Google service account key file (gs:// roots only)
    ServiceAccountFile { path: PathBuf },
}

/// Configuration for a `Client`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Root URL of the bucket, e.g. `gs://exports` or `/tmp/exports`
    pub bucket: String,

    /// Path segment between bucket and entity (may be empty)
    #[serde(default)]
    pub namespace: String,

    #[serde(default)]
    pub credentials: CredentialSource,

    #[serde(default)]
    pub writer: WriterOptions,

    #[serde(default)]
    pub retry: RetryPolicy,

    /// Rounding applied when a decimal has more digits than its field scale
    #[serde(default)]
    pub rounding: RoundingMode,
}

impl ClientConfig {
    /// Create a config for `bucket` with defaults for everything else
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            namespace: String::new(),
            credentials: CredentialSource::default(),
            writer: WriterOptions::default(),
            retry: RetryPolicy::default(),
            rounding: RoundingMode::default(),
        }
    }

    /// Load a config file; `.json` files are parsed as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config = if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json(&content)?
        } else {
            Self::from_yaml(&content)?
        };
        Ok(config)
    }

    /// Parse and validate a YAML config
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the namespace
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the credential source
    #[must_use]
    pub fn with_credentials(mut self, credentials: CredentialSource) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set writer options
    #[must_use]
    pub fn with_writer(mut self, writer: WriterOptions) -> Self {
        self.writer = writer;
        self
    }

    /// Set the upload retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the decimal rounding mode
    #[must_use]
    pub fn with_rounding(mut self, rounding: RoundingMode) -> Self {
        self.rounding = rounding;
        self
    }

    /// Check required values
    pub fn validate(&self) -> Result<()> {
        if self.bucket.trim().is_empty() {
            return Err(Error::config("bucket must not be empty"));
        }
        if let CredentialSource::ServiceAccountFile { path } = &self.credentials {
            if path.as_os_str().is_empty() {
                return Err(Error::config("service account file path must not be empty"));
            }
        }
        self.writer.validate()
    }
}
