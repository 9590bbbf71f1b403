//! Shared test fixtures

use crate::schema::{parse_schema, Schema};
use crate::storage::{ObjectStoreSink, StorageError, StorageSink};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const NAV_SCHEMA: &str = r#"{
  "type": "record",
  "name": "Nav",
  "namespace": "knowledge_hub.fund",
  "fields": [
    {"name": "mstar_id", "type": "string"},
    {"name": "nav_date", "type": {"type": "long", "logicalType": "timestamp-micros"}},
    {"name": "value", "type": {"type": "bytes", "logicalType": "decimal", "precision": 18, "scale": 6}},
    {"name": "amount", "type": {"type": "bytes", "logicalType": "decimal", "precision": 18, "scale": 6}}
  ]
}"#;

pub fn nav_schema() -> Arc<Schema> {
    Arc::new(parse_schema(NAV_SCHEMA).unwrap())
}

/// In-memory sink that counts calls and can inject failures per key
#[derive(Debug)]
pub struct ScriptedSink {
    inner: ObjectStoreSink,
    gets: AtomicUsize,
    puts: AtomicUsize,
    /// key suffix -> remaining transient failures
    transient: Mutex<HashMap<String, usize>>,
    /// key suffixes that always fail permanently
    permanent: Mutex<Vec<String>>,
}

impl ScriptedSink {
    pub fn new(root: &str) -> Self {
        Self {
            inner: ObjectStoreSink::in_memory(root),
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            transient: Mutex::new(HashMap::new()),
            permanent: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_transiently(&self, key_suffix: &str, times: usize) {
        self.transient
            .lock()
            .unwrap()
            .insert(key_suffix.to_string(), times);
    }

    pub fn fail_permanently(&self, key_suffix: &str) {
        self.permanent.lock().unwrap().push(key_suffix.to_string());
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.inner.get(key).await.is_ok()
    }

    pub async fn fetch(&self, key: &str) -> Bytes {
        self.inner.get(key).await.unwrap()
    }

    pub async fn seed(&self, key: &str, data: &str) {
        self.inner
            .put(key, Bytes::from(data.to_string()))
            .await
            .unwrap();
    }
}

#[async_trait]
impl StorageSink for ScriptedSink {
    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        // Let concurrent callers overlap
        tokio::task::yield_now().await;
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        self.puts.fetch_add(1, Ordering::SeqCst);

        if self
            .permanent
            .lock()
            .unwrap()
            .iter()
            .any(|suffix| key.ends_with(suffix.as_str()))
        {
            return Err(StorageError::permanent(key, "access denied"));
        }

        {
            let mut transient = self.transient.lock().unwrap();
            if let Some(remaining) = transient
                .iter_mut()
                .find(|(suffix, _)| key.ends_with(suffix.as_str()))
                .map(|(_, n)| n)
            {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(StorageError::transient(key, "service unavailable"));
                }
            }
        }

        self.inner.put(key, data).await
    }
}
