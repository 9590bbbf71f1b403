//! Partitioned writer module
//!
//! Buffers mapped records across a fixed number of shards and, on close,
//! encodes each shard as an Avro object container and uploads it.
//!
//! # Output layout
//!
//! Each shard lands at `{directory}/{base_name}_{shard:06}`, e.g.
//! `gs://bucket/knowledge_hub/nav/2024/01/02/nav_2024-01-02_000000`.

mod layout;
mod partitioned;

pub use layout::{OutputTarget, WriterOptions, DEFAULT_UPLOAD_CONCURRENCY};
pub use partitioned::{CloseReport, PartitionedWriter, UploadedObject};

pub(crate) use layout::entity_root;

#[cfg(test)]
mod tests;
