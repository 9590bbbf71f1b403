//! Storage module
//!
//! The object-store capability the pipeline consumes.
//!
//! # Overview
//!
//! This module provides:
//! - `StorageSink` - the get/put capability schemas are read from and
//!   container files are written to
//! - `ObjectStoreSink` - adapter over the `object_store` crate
//!   (GCS, S3, R2, Azure, local filesystem, in-memory)
//! - `RetryPolicy` - bounded backoff for transient put failures

mod cloud;
mod retry;
mod sink;

pub use cloud::ObjectStoreSink;
pub use retry::{put_with_retry, RetryPolicy};
pub use sink::{StorageError, StorageSink};
