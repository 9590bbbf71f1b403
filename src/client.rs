//! Client facade
//!
//! Wires schema resolution, field mapping and partitioned writing to one
//! storage sink built from a `ClientConfig`.
//!
//! # Example
//!
//! ```ignore
//! let client = Client::new(ClientConfig::new("gs://exports").with_namespace("knowledge_hub/fund"))?;
//! let schema = client.get_schema(&client.schema_path("nav")).await?;
//! let mapper = client
//!     .mapper::<Nav>()
//!     .field("mstar_id", |n: &Nav| n.mstar_id.clone())
//!     .field("nav_date", |n: &Nav| n.nav_date)
//!     .field("value", |n: &Nav| n.value)
//!     .field("amount", |n: &Nav| n.amount)
//!     .build(schema.clone())?;
//!
//! let mut writer = client.writer_for_entity(schema, "nav", today, 1)?;
//! for nav in &navs {
//!     mapper.map_and_append(nav, &mut writer)?;
//! }
//! writer.close().await?;
//! ```

use crate::config::ClientConfig;
use crate::error::Result;
use crate::mapping::{FieldMapper, MappingBuilder};
use crate::schema::{Schema, SchemaResolver};
use crate::storage::{ObjectStoreSink, StorageSink};
use crate::writer::{entity_root, OutputTarget, PartitionedWriter};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

/// File name of an entity's schema definition
pub const SCHEMA_FILE_NAME: &str = "schema.avsc";

/// Entry point for resolving schemas and writing sharded exports
#[derive(Debug)]
pub struct Client {
    config: ClientConfig,
    sink: Arc<dyn StorageSink>,
    resolver: Arc<SchemaResolver>,
}

impl Client {
    /// Create a client whose sink is built from `config.bucket`
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let sink = ObjectStoreSink::parse(&config.bucket, &config.credentials)?;
        info!("Using {} storage at {}", sink.scheme(), sink.root());
        Self::with_sink(config, Arc::new(sink))
    }

    /// Create a client over an existing sink
    pub fn with_sink(config: ClientConfig, sink: Arc<dyn StorageSink>) -> Result<Self> {
        config.validate()?;
        let resolver = Arc::new(SchemaResolver::new(Arc::clone(&sink)));
        Ok(Self {
            config,
            sink,
            resolver,
        })
    }

    /// Key of an entity's schema: `{bucket}/{namespace}/{entity}/schema.avsc`
    pub fn schema_path(&self, entity: &str) -> String {
        format!(
            "{}/{SCHEMA_FILE_NAME}",
            entity_root(&self.config.bucket, &self.config.namespace, entity)
        )
    }

    /// Resolve (and cache) the schema stored at `path`
    pub async fn get_schema(&self, path: &str) -> Result<Arc<Schema>> {
        self.resolver.get_schema(path).await
    }

    /// Open a writer for `{directory}/{base_name}_{shard:06}` files
    pub fn new_writer(
        &self,
        schema: Arc<Schema>,
        directory: &str,
        base_name: &str,
        shard_count: usize,
    ) -> Result<PartitionedWriter> {
        let target = OutputTarget::new(directory, base_name)?;
        self.open_writer(schema, target, shard_count)
    }

    /// Open a writer at the date-partitioned location of `entity`
    pub fn writer_for_entity(
        &self,
        schema: Arc<Schema>,
        entity: &str,
        date: NaiveDate,
        shard_count: usize,
    ) -> Result<PartitionedWriter> {
        let target =
            OutputTarget::for_entity(&self.config.bucket, &self.config.namespace, entity, date)?;
        self.open_writer(schema, target, shard_count)
    }

    fn open_writer(
        &self,
        schema: Arc<Schema>,
        target: OutputTarget,
        shard_count: usize,
    ) -> Result<PartitionedWriter> {
        PartitionedWriter::new(
            schema,
            target,
            shard_count,
            Arc::clone(&self.sink),
            self.config.writer.clone(),
            self.config.retry.clone(),
        )
    }

    /// Start a mapper for `T` using the configured rounding mode
    pub fn mapper<T>(&self) -> MappingBuilder<T> {
        FieldMapper::<T>::builder().rounding(self.config.rounding)
    }

    /// Mapper for JSON objects keyed by field name
    pub fn json_mapper(&self, schema: Arc<Schema>) -> Result<FieldMapper<serde_json::Value>> {
        FieldMapper::<serde_json::Value>::json(schema, self.config.rounding)
    }

    /// Shared schema resolver
    pub fn resolver(&self) -> &Arc<SchemaResolver> {
        &self.resolver
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Storage sink used for reads and uploads
    pub fn sink(&self) -> &Arc<dyn StorageSink> {
        &self.sink
    }
}
