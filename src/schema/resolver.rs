//! Schema resolution with a per-key cache

use super::parser::parse_schema_at;
use super::types::Schema;
use crate::error::{Error, Result};
use crate::storage::{StorageError, StorageSink};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info};

type CacheSlot = Arc<OnceCell<Arc<Schema>>>;

/// Fetches schema definitions from storage and caches them by key
///
/// Safe to share between writers. Concurrent lookups of the same key wait
/// on a single fetch; a failed fetch leaves the slot empty so a later call
/// tries again.
#[derive(Debug)]
pub struct SchemaResolver {
    sink: Arc<dyn StorageSink>,
    cache: RwLock<HashMap<String, CacheSlot>>,
}

impl SchemaResolver {
    /// Create a resolver reading from `sink`
    pub fn new(sink: Arc<dyn StorageSink>) -> Self {
        Self {
            sink,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve the schema stored at `key`
    pub async fn get_schema(&self, key: &str) -> Result<Arc<Schema>> {
        let slot = self.slot(key).await;

        if let Some(schema) = slot.get() {
            debug!("Schema cache hit: {}", key);
            return Ok(Arc::clone(schema));
        }

        let schema = slot.get_or_try_init(|| self.fetch(key)).await?;
        Ok(Arc::clone(schema))
    }

    /// Drop the cached schema for `key`; returns whether one was cached
    pub async fn invalidate(&self, key: &str) -> bool {
        let removed = self.cache.write().await.remove(key);
        removed.is_some_and(|slot| slot.initialized())
    }

    /// Drop every cached schema
    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    /// Check if a resolved schema is cached for `key`
    pub async fn is_cached(&self, key: &str) -> bool {
        self.cache
            .read()
            .await
            .get(key)
            .is_some_and(|slot| slot.initialized())
    }

    /// Keys with a resolved schema, sorted
    pub async fn cached_keys(&self) -> Vec<String> {
        let cache = self.cache.read().await;
        let mut keys: Vec<String> = cache
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    async fn slot(&self, key: &str) -> CacheSlot {
        if let Some(slot) = self.cache.read().await.get(key) {
            return Arc::clone(slot);
        }

        let mut cache = self.cache.write().await;
        Arc::clone(cache.entry(key.to_string()).or_default())
    }

    async fn fetch(&self, key: &str) -> Result<Arc<Schema>> {
        debug!("Fetching schema: {}", key);

        let bytes = self.sink.get(key).await.map_err(|e| match e {
            StorageError::NotFound { .. } => Error::SchemaNotFound {
                key: key.to_string(),
            },
            other => Error::Storage(other),
        })?;

        let text = std::str::from_utf8(&bytes)
            .map_err(|e| Error::schema_parse(key, format!("not valid UTF-8: {e}")))?;
        let schema = parse_schema_at(key, text)?;

        info!(
            "Resolved schema {} ({} fields) from {}",
            schema.full_name(),
            schema.len(),
            key
        );
        Ok(Arc::new(schema))
    }
}
