//! Sharded buffering writer with parallel upload on close

use super::layout::{OutputTarget, WriterOptions};
use crate::encode::{validate_record, ContainerEncoder};
use crate::error::{Error, Result, ShardFailure};
use crate::record::MappedRecord;
use crate::schema::Schema;
use crate::storage::{put_with_retry, RetryPolicy, StorageSink};
use crate::types::EmptyShardPolicy;
use bytes::Bytes;
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One shard file persisted during close
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedObject {
    /// Shard index
    pub shard: usize,
    /// Destination key
    pub key: String,
    /// Records in the file
    pub records: usize,
    /// Encoded size in bytes
    pub bytes: usize,
}

/// Result of a successful close, objects ordered by shard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CloseReport {
    pub objects: Vec<UploadedObject>,
}

impl CloseReport {
    /// Records across all uploaded shards
    pub fn total_records(&self) -> usize {
        self.objects.iter().map(|o| o.records).sum()
    }

    /// Encoded bytes across all uploaded shards
    pub fn total_bytes(&self) -> usize {
        self.objects.iter().map(|o| o.bytes).sum()
    }
}

/// Buffers records round-robin across shards, uploads them on `close`
///
/// Record `i` (counting from zero across the writer's lifetime) goes to
/// shard `i % shard_count`. Records are validated on `append`, so nothing
/// buffered can fail to encode later.
#[derive(Debug)]
pub struct PartitionedWriter {
    schema: Arc<Schema>,
    target: OutputTarget,
    shards: Vec<Vec<MappedRecord>>,
    appended: usize,
    closed: bool,
    sink: Arc<dyn StorageSink>,
    options: WriterOptions,
    retry: RetryPolicy,
}

impl PartitionedWriter {
    /// Create a writer with `shard_count` shards
    pub fn new(
        schema: Arc<Schema>,
        target: OutputTarget,
        shard_count: usize,
        sink: Arc<dyn StorageSink>,
        options: WriterOptions,
        retry: RetryPolicy,
    ) -> Result<Self> {
        if shard_count == 0 {
            return Err(Error::config("shard count must be at least 1"));
        }
        options.validate()?;

        debug!(
            "Opened writer for {} at {}/{}_* with {} shard(s)",
            schema.full_name(),
            target.directory(),
            target.base_name(),
            shard_count
        );

        Ok(Self {
            schema,
            target,
            shards: vec![Vec::new(); shard_count],
            appended: 0,
            closed: false,
            sink,
            options,
            retry,
        })
    }

    /// Buffer one record, returning the shard it was assigned to
    ///
    /// A record that does not match the schema is rejected and the writer
    /// state is left unchanged.
    pub fn append(&mut self, record: MappedRecord) -> Result<usize> {
        if self.closed {
            return Err(Error::WriterClosed);
        }
        validate_record(&self.schema, &record)?;

        let shard = self.appended % self.shards.len();
        self.shards[shard].push(record);
        self.appended += 1;
        Ok(shard)
    }

    /// Encode and upload every shard
    ///
    /// All shards are attempted even when some fail; failures are reported
    /// together in `Error::ShardUploads`. The writer is closed afterwards
    /// either way, and a second call returns `Error::AlreadyClosed`.
    pub async fn close(&mut self) -> Result<CloseReport> {
        if self.closed {
            return Err(Error::AlreadyClosed);
        }
        self.closed = true;

        let shard_count = self.shards.len();
        let shards = std::mem::replace(&mut self.shards, vec![Vec::new(); shard_count]);
        let jobs: Vec<(usize, Vec<MappedRecord>)> = shards
            .into_iter()
            .enumerate()
            .filter(|(_, records)| {
                !records.is_empty() || self.options.empty_shards == EmptyShardPolicy::WriteEmpty
            })
            .collect();

        let encoder =
            ContainerEncoder::new(self.schema.clone()).with_block_size(self.options.block_size);
        let encoder = &encoder;
        let sink = self.sink.as_ref();
        let retry = &self.retry;
        let target = &self.target;

        let results: Vec<std::result::Result<UploadedObject, ShardFailure>> =
            futures::stream::iter(jobs.into_iter().map(|(shard, records)| {
                upload_shard(encoder, sink, retry, shard, target.shard_key(shard), records)
            }))
            .buffer_unordered(self.options.upload_concurrency)
            .collect()
            .await;

        let (mut objects, mut failures) = (Vec::new(), Vec::new());
        for result in results {
            match result {
                Ok(object) => objects.push(object),
                Err(failure) => failures.push(failure),
            }
        }
        objects.sort_by_key(|o| o.shard);

        if !failures.is_empty() {
            failures.sort_by_key(|f| f.shard);
            warn!(
                "Closed {}/{}_* with {} of {} shard(s) failed",
                target.directory(),
                target.base_name(),
                failures.len(),
                shard_count
            );
            return Err(Error::ShardUploads { failures });
        }

        let report = CloseReport { objects };
        info!(
            "Closed {}/{}_*: {} record(s) in {} file(s), {} bytes",
            target.directory(),
            target.base_name(),
            report.total_records(),
            report.objects.len(),
            report.total_bytes()
        );
        Ok(report)
    }

    /// Number of shards
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Records buffered and not yet uploaded
    pub fn buffered_records(&self) -> usize {
        self.shards.iter().map(Vec::len).sum()
    }

    /// Records buffered for one shard (0 for an unknown index)
    pub fn shard_len(&self, shard: usize) -> usize {
        self.shards.get(shard).map_or(0, Vec::len)
    }

    /// Records accepted over the writer's lifetime
    pub fn records_appended(&self) -> usize {
        self.appended
    }

    /// Check if `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Destination of the shard files
    pub fn target(&self) -> &OutputTarget {
        &self.target
    }

    /// Schema every record is checked against
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}

impl Drop for PartitionedWriter {
    fn drop(&mut self) {
        if !self.closed && self.appended > 0 {
            warn!(
                "Writer for {}/{}_* dropped without close; {} buffered record(s) discarded",
                self.target.directory(),
                self.target.base_name(),
                self.buffered_records()
            );
        }
    }
}

async fn upload_shard(
    encoder: &ContainerEncoder,
    sink: &dyn StorageSink,
    retry: &RetryPolicy,
    shard: usize,
    key: String,
    records: Vec<MappedRecord>,
) -> std::result::Result<UploadedObject, ShardFailure> {
    let data = match encoder.encode(&records) {
        Ok(data) => data,
        Err(e) => {
            return Err(ShardFailure {
                shard,
                key,
                error: Box::new(e),
            })
        }
    };
    let bytes = data.len();
    debug!("Encoded shard {} ({} records, {} bytes)", shard, records.len(), bytes);

    match put_with_retry(sink, &key, Bytes::from(data), retry).await {
        Ok(()) => {
            info!("Uploaded {} ({} records, {} bytes)", key, records.len(), bytes);
            Ok(UploadedObject {
                shard,
                key,
                records: records.len(),
                bytes,
            })
        }
        Err(source) => Err(ShardFailure {
            shard,
            key: key.clone(),
            error: Box::new(Error::Upload { shard, key, source }),
        }),
    }
}
