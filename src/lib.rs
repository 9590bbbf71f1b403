// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # fnavro
//!
//! Schema-driven export of typed records to object storage as Avro object
//! container files.
//!
//! ## Features
//!
//! - **Schema Resolution**: Fetch `.avsc` definitions from a bucket, cached per key
//! - **Exact Decimals**: Rational arithmetic end to end, rounding only at the field scale
//! - **Static Field Mapping**: Accessor tables instead of runtime reflection
//! - **Sharded Output**: Round-robin shards, parallel uploads with bounded retry
//! - **Object Stores**: GCS, S3, R2, Azure, local filesystem, in-memory
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fnavro::{Client, ClientConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ClientConfig::new("gs://exports").with_namespace("knowledge_hub/fund");
//!     let client = Client::new(config)?;
//!     let schema = client.get_schema(&client.schema_path("nav")).await?;
//!
//!     let mapper = client
//!         .mapper::<Nav>()
//!         .field("mstar_id", |n: &Nav| n.mstar_id.clone())
//!         .field("nav_date", |n: &Nav| n.nav_date)
//!         .field("value", |n: &Nav| n.value)
//!         .field("amount", |n: &Nav| n.amount)
//!         .build(schema.clone())?;
//!
//!     let mut writer = client.writer_for_entity(schema, "nav", today, 1)?;
//!     for nav in &navs {
//!         mapper.map_and_append(nav, &mut writer)?;
//!     }
//!     writer.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Client                             │
//! │  get_schema(path)   new_writer(schema, dir, base, shards)   │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────────┬───────────────┴──┬──────────────┬────────────┐
//! │    Schema    │     Mapping      │    Writer    │  Storage   │
//! ├──────────────┼──────────────────┼──────────────┼────────────┤
//! │ Parser       │ Accessor tables  │ Round-robin  │ GCS/S3/R2  │
//! │ Resolver     │ Exact decimals   │ Encoder      │ Azure      │
//! │ Cache        │ Rounding modes   │ Parallel put │ Retry      │
//! └──────────────┴──────────────────┴──────────────┴────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common policy enums
pub mod types;

/// Client configuration
pub mod config;

/// Storage sinks and upload retry
pub mod storage;

/// Schema parsing and resolution
pub mod schema;

/// Source values, schema values, exact decimals
pub mod record;

/// Domain record to schema record mapping
pub mod mapping;

/// Avro object container encoding and decoding
pub mod encode;

/// Sharded buffering writer
pub mod writer;

/// Client facade
pub mod client;

/// Command-line interface
pub mod cli;

#[cfg(test)]
pub(crate) mod test_util;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use client::Client;
pub use config::{ClientConfig, CredentialSource};
pub use mapping::{FieldMapper, MappingBuilder};
pub use record::{MappedRecord, SourceValue, Value};
pub use schema::{Schema, SchemaResolver};
pub use storage::{ObjectStoreSink, RetryPolicy, StorageError, StorageSink};
pub use writer::{CloseReport, OutputTarget, PartitionedWriter, WriterOptions};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
