//! Bounded retry with backoff for storage writes

use super::sink::{StorageError, StorageSink};
use crate::types::BackoffType;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Retry settings for uploads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Initial delay for backoff
    #[serde(with = "millis")]
    pub initial_backoff: Duration,
    /// Maximum delay for backoff
    #[serde(with = "millis")]
    pub max_backoff: Duration,
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            backoff_type: BackoffType::Exponential,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Set max retries
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set backoff configuration
    #[must_use]
    pub fn with_backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.backoff_type = backoff_type;
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Calculate backoff delay for a given attempt
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let delay = match self.backoff_type {
            BackoffType::Constant => self.initial_backoff,
            BackoffType::Linear => self.initial_backoff.saturating_mul(attempt + 1),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.initial_backoff.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.max_backoff)
    }
}

/// Put an object, retrying transient failures according to `policy`
///
/// Non-retryable errors are returned immediately; after the last attempt
/// the final transient error is returned.
pub async fn put_with_retry(
    sink: &dyn StorageSink,
    key: &str,
    data: Bytes,
    policy: &RetryPolicy,
) -> Result<(), StorageError> {
    let mut attempt = 0;

    loop {
        match sink.put(key, data.clone()).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.calculate_backoff(attempt);
                warn!(
                    "Upload of {} failed ({}), attempt {}/{}, retrying in {:?}",
                    key,
                    e,
                    attempt + 1,
                    policy.max_retries + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Serialize durations as integer milliseconds in config files
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
