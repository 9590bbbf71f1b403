//! Tests for writer module

use super::*;
use crate::encode::decode_container;
use crate::error::Error;
use crate::record::decimal::parse_decimal;
use crate::record::{MappedRecord, Value};
use crate::storage::{RetryPolicy, StorageError, StorageSink};
use crate::test_util::{nav_schema, ScriptedSink};
use crate::types::{BackoffType, EmptyShardPolicy};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use test_case::test_case;

const ROOT: &str = "memory://bucket";

fn nav(id: &str) -> MappedRecord {
    MappedRecord::new()
        .with("mstar_id", Value::String(id.to_string()))
        .with("nav_date", Value::TimestampMicros(1_704_153_600_000_000))
        .with("value", Value::Decimal(parse_decimal("30.4").unwrap()))
        .with("amount", Value::Decimal(parse_decimal("12039.4").unwrap()))
}

fn target() -> OutputTarget {
    OutputTarget::for_entity(
        ROOT,
        "knowledge_hub",
        "nav",
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
    )
    .unwrap()
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::default().with_backoff(
        BackoffType::Constant,
        Duration::from_millis(1),
        Duration::from_millis(1),
    )
}

fn writer(sink: &Arc<ScriptedSink>, shards: usize, options: WriterOptions) -> PartitionedWriter {
    let sink: Arc<dyn StorageSink> = sink.clone();
    PartitionedWriter::new(nav_schema(), target(), shards, sink, options, fast_retry()).unwrap()
}

// ============================================================================
// Layout Tests
// ============================================================================

#[test]
fn test_output_target_for_entity() {
    let target = target();
    assert_eq!(target.directory(), "memory://bucket/knowledge_hub/nav/2024/01/02");
    assert_eq!(target.base_name(), "nav_2024-01-02");
    assert_eq!(
        target.shard_key(0),
        "memory://bucket/knowledge_hub/nav/2024/01/02/nav_2024-01-02_000000"
    );
    assert_eq!(
        target.shard_key(12),
        "memory://bucket/knowledge_hub/nav/2024/01/02/nav_2024-01-02_000012"
    );
}

#[test]
fn test_output_target_without_namespace() {
    let date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
    let target = OutputTarget::for_entity("gs://b/", "", "fx", date).unwrap();
    assert_eq!(target.shard_key(3), "gs://b/fx/2023/12/31/fx_2023-12-31_000003");
}

#[test_case("", "nav" ; "empty directory")]
#[test_case("memory://bucket/out", "" ; "empty base name")]
#[test_case("memory://bucket/out", "a/b" ; "slash in base name")]
fn test_output_target_rejects(directory: &str, base_name: &str) {
    assert!(matches!(
        OutputTarget::new(directory, base_name),
        Err(Error::Config { .. })
    ));
}

#[test]
fn test_writer_options() {
    let options = WriterOptions::default();
    assert_eq!(options.upload_concurrency, 4);
    assert_eq!(options.block_size, 1000);
    assert_eq!(options.empty_shards, EmptyShardPolicy::Skip);
    assert!(options.validate().is_ok());

    assert!(options.clone().with_block_size(0).validate().is_err());
    assert!(options.with_upload_concurrency(0).validate().is_err());

    let parsed: WriterOptions =
        serde_yaml::from_str("empty_shards: write_empty\nupload_concurrency: 2\n").unwrap();
    assert_eq!(parsed.empty_shards, EmptyShardPolicy::WriteEmpty);
    assert_eq!(parsed.upload_concurrency, 2);
    assert_eq!(parsed.block_size, 1000);
}

// ============================================================================
// Append Tests
// ============================================================================

#[test]
fn test_new_rejects_zero_shards() {
    let sink: Arc<dyn StorageSink> = Arc::new(ScriptedSink::new(ROOT));
    let err = PartitionedWriter::new(
        nav_schema(),
        target(),
        0,
        sink,
        WriterOptions::default(),
        RetryPolicy::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}

#[test]
fn test_append_round_robin() {
    let sink = Arc::new(ScriptedSink::new(ROOT));
    let mut writer = writer(&sink, 3, WriterOptions::default());

    let shards: Vec<usize> = (0..7)
        .map(|i| writer.append(nav(&format!("F{i}"))).unwrap())
        .collect();

    assert_eq!(shards, vec![0, 1, 2, 0, 1, 2, 0]);
    assert_eq!(writer.shard_len(0), 3);
    assert_eq!(writer.shard_len(1), 2);
    assert_eq!(writer.shard_len(2), 2);
    assert_eq!(writer.shard_len(9), 0);
    assert_eq!(writer.buffered_records(), 7);
}

#[test]
fn test_append_rejects_mismatched_record() {
    let sink = Arc::new(ScriptedSink::new(ROOT));
    let mut writer = writer(&sink, 2, WriterOptions::default());
    writer.append(nav("F0")).unwrap();

    let bad = nav("F1").with("extra", Value::Null);
    assert!(matches!(writer.append(bad), Err(Error::Encode { .. })));

    // Counter did not advance, so the next record still goes to shard 1
    assert_eq!(writer.buffered_records(), 1);
    assert_eq!(writer.append(nav("F2")).unwrap(), 1);
}

// ============================================================================
// Close Tests
// ============================================================================

#[tokio::test]
async fn test_close_uploads_each_shard() {
    let sink = Arc::new(ScriptedSink::new(ROOT));
    let mut writer = writer(&sink, 2, WriterOptions::default());
    for i in 0..5 {
        writer.append(nav(&format!("F{i}"))).unwrap();
    }

    let report = writer.close().await.unwrap();

    let keys: Vec<_> = report.objects.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "memory://bucket/knowledge_hub/nav/2024/01/02/nav_2024-01-02_000000",
            "memory://bucket/knowledge_hub/nav/2024/01/02/nav_2024-01-02_000001",
        ]
    );
    assert_eq!(report.objects[0].records, 3);
    assert_eq!(report.objects[1].records, 2);
    assert_eq!(report.total_records(), 5);

    let shard1 = decode_container(&sink.fetch(keys[1]).await).unwrap();
    assert_eq!(shard1.records, vec![nav("F1"), nav("F3")]);
    assert_eq!(report.objects[1].bytes, sink.fetch(keys[1]).await.len());
    assert!(writer.is_closed());
    assert_eq!(writer.buffered_records(), 0);
}

#[tokio::test]
async fn test_close_skips_empty_shards_by_default() {
    let sink = Arc::new(ScriptedSink::new(ROOT));
    let mut writer = writer(&sink, 4, WriterOptions::default());
    writer.append(nav("F0")).unwrap();

    let report = writer.close().await.unwrap();
    assert_eq!(report.objects.len(), 1);
    assert_eq!(sink.puts(), 1);
    assert!(!sink.contains(&target().shard_key(1)).await);
}

#[tokio::test]
async fn test_close_writes_empty_shards_when_asked() {
    let sink = Arc::new(ScriptedSink::new(ROOT));
    let options = WriterOptions::default().with_empty_shards(EmptyShardPolicy::WriteEmpty);
    let mut writer = writer(&sink, 3, options);
    writer.append(nav("F0")).unwrap();

    let report = writer.close().await.unwrap();
    assert_eq!(report.objects.len(), 3);
    assert_eq!(report.objects[2].records, 0);

    let empty = decode_container(&sink.fetch(&target().shard_key(2)).await).unwrap();
    assert!(empty.records.is_empty());
    assert_eq!(empty.schema, *nav_schema());
}

#[tokio::test]
async fn test_close_is_single_shot() {
    let sink = Arc::new(ScriptedSink::new(ROOT));
    let mut writer = writer(&sink, 1, WriterOptions::default());
    writer.append(nav("F0")).unwrap();

    writer.close().await.unwrap();
    assert_eq!(sink.puts(), 1);

    assert!(matches!(writer.close().await, Err(Error::AlreadyClosed)));
    assert!(matches!(writer.append(nav("F1")), Err(Error::WriterClosed)));
    assert_eq!(sink.puts(), 1);
}

#[tokio::test]
async fn test_close_retries_transient_failures() {
    let sink = Arc::new(ScriptedSink::new(ROOT));
    sink.fail_transiently("_000000", 2);
    let mut writer = writer(&sink, 1, WriterOptions::default());
    writer.append(nav("F0")).unwrap();

    let report = writer.close().await.unwrap();
    assert_eq!(report.objects.len(), 1);
    assert_eq!(sink.puts(), 3);
    assert!(sink.contains(&target().shard_key(0)).await);
}

#[tokio::test]
async fn test_close_reports_every_failed_shard() {
    let sink = Arc::new(ScriptedSink::new(ROOT));
    sink.fail_permanently("_000001");
    sink.fail_transiently("_000002", 10);
    let mut writer = writer(&sink, 3, WriterOptions::default());
    for i in 0..3 {
        writer.append(nav(&format!("F{i}"))).unwrap();
    }

    let err = writer.close().await.unwrap_err();
    let failures = err.shard_failures();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].shard, 1);
    assert_eq!(failures[0].key, target().shard_key(1));
    assert_eq!(failures[1].shard, 2);
    match failures[1].error.as_ref() {
        Error::Upload { shard, source, .. } => {
            assert_eq!(*shard, 2);
            assert!(matches!(source, StorageError::Transient { .. }));
        }
        other => panic!("expected upload error, got {other:?}"),
    }
    assert!(err.to_string().starts_with("2 shard(s) failed"));

    // The healthy shard still landed
    assert!(sink.contains(&target().shard_key(0)).await);
    assert!(matches!(writer.close().await, Err(Error::AlreadyClosed)));
}

#[tokio::test]
async fn test_sharding_is_deterministic() {
    let mut outputs = Vec::new();
    for _ in 0..2 {
        let sink = Arc::new(ScriptedSink::new(ROOT));
        let mut writer = writer(&sink, 2, WriterOptions::default().with_upload_concurrency(1));
        for i in 0..6 {
            writer.append(nav(&format!("F{i}"))).unwrap();
        }
        writer.close().await.unwrap();
        outputs.push((
            sink.fetch(&target().shard_key(0)).await,
            sink.fetch(&target().shard_key(1)).await,
        ));
    }
    assert_eq!(outputs[0], outputs[1]);
}
