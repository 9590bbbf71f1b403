//! Output destinations and writer tuning

use crate::encode::DEFAULT_BLOCK_SIZE;
use crate::error::{Error, Result};
use crate::types::EmptyShardPolicy;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default number of shard uploads in flight at once
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 4;

/// Writer settings shared by every writer a client creates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    /// What to do with shards that received no records
    pub empty_shards: EmptyShardPolicy,
    /// Maximum records per container block
    pub block_size: usize,
    /// Maximum parallel shard uploads during close
    pub upload_concurrency: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            empty_shards: EmptyShardPolicy::Skip,
            block_size: DEFAULT_BLOCK_SIZE,
            upload_concurrency: DEFAULT_UPLOAD_CONCURRENCY,
        }
    }
}

impl WriterOptions {
    /// Set the empty shard policy
    #[must_use]
    pub fn with_empty_shards(mut self, policy: EmptyShardPolicy) -> Self {
        self.empty_shards = policy;
        self
    }

    /// Set the block size
    #[must_use]
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set the upload concurrency
    #[must_use]
    pub fn with_upload_concurrency(mut self, limit: usize) -> Self {
        self.upload_concurrency = limit;
        self
    }

    /// Reject zero block size and zero concurrency
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::config("writer block_size must be at least 1"));
        }
        if self.upload_concurrency == 0 {
            return Err(Error::config("writer upload_concurrency must be at least 1"));
        }
        Ok(())
    }
}

/// Where a writer's shard files go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    directory: String,
    base_name: String,
}

impl OutputTarget {
    /// Create a target from a directory key and a file base name
    pub fn new(directory: impl Into<String>, base_name: impl Into<String>) -> Result<Self> {
        let directory = directory.into().trim_end_matches('/').to_string();
        let base_name = base_name.into();

        if directory.is_empty() {
            return Err(Error::config("output directory must not be empty"));
        }
        if base_name.is_empty() {
            return Err(Error::config("output base name must not be empty"));
        }
        if base_name.contains('/') {
            return Err(Error::config(format!(
                "output base name '{base_name}' must not contain '/'"
            )));
        }

        Ok(Self {
            directory,
            base_name,
        })
    }

    /// Date-partitioned target for an entity
    ///
    /// Format: `{bucket}/{namespace}/{entity}/{yyyy}/{mm}/{dd}` with base name
    /// `{entity}_{yyyy-mm-dd}`. An empty namespace is left out.
    pub fn for_entity(bucket: &str, namespace: &str, entity: &str, date: NaiveDate) -> Result<Self> {
        if entity.is_empty() {
            return Err(Error::config("entity name must not be empty"));
        }
        let directory = format!(
            "{}/{}",
            entity_root(bucket, namespace, entity),
            date.format("%Y/%m/%d")
        );
        Self::new(directory, format!("{entity}_{}", date.format("%Y-%m-%d")))
    }

    /// Directory key shard files are written under
    pub fn directory(&self) -> &str {
        &self.directory
    }

    /// File base name shared by all shards
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Full key for one shard
    pub fn shard_key(&self, shard: usize) -> String {
        format!("{}/{}_{shard:06}", self.directory, self.base_name)
    }
}

/// `{bucket}/{namespace}/{entity}`, skipping an empty namespace
pub(crate) fn entity_root(bucket: &str, namespace: &str, entity: &str) -> String {
    let bucket = bucket.trim_end_matches('/');
    let namespace = namespace.trim_matches('/');
    if namespace.is_empty() {
        format!("{bucket}/{entity}")
    } else {
        format!("{bucket}/{namespace}/{entity}")
    }
}
