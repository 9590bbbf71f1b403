//! Integration tests against in-memory and local object stores
//!
//! Tests the full end-to-end flow: schema in bucket → typed records → mapped,
//! sharded container files → decoded back

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::Parser;
use fnavro::cli::{Cli, Runner};
use fnavro::encode::decode_container;
use fnavro::record::decimal::parse_decimal;
use fnavro::{
    Client, ClientConfig, Error, ObjectStoreSink, RetryPolicy, StorageSink, Value, WriterOptions,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::tempdir;

const BUCKET: &str = "memory://exports";
const NAMESPACE: &str = "avrotest/knowledge-hub/fund";

const NAV_SCHEMA: &str = r#"{
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

/// Domain record as an application would hold it
#[derive(Debug, Clone)]
struct Nav {
    mstar_id: String,
    nav_date: DateTime<Utc>,
    value: f64,
    amount: Option<f64>,
}

fn nav(id: &str, value: f64, amount: Option<f64>) -> Nav {
    Nav {
        mstar_id: id.to_string(),
        nav_date: Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap(),
        value,
        amount,
    }
}

fn nav_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
}

async fn client_with_schema() -> (Client, Arc<ObjectStoreSink>) {
    let sink = Arc::new(ObjectStoreSink::in_memory(BUCKET));
    let config = ClientConfig::new(BUCKET)
        .with_namespace(NAMESPACE)
        .with_retry(RetryPolicy::none());
    let client = Client::with_sink(config, sink.clone()).unwrap();

    sink.put(&client.schema_path("nav"), Bytes::from_static(NAV_SCHEMA.as_bytes()))
        .await
        .unwrap();
    (client, sink)
}

fn nav_mapper(client: &Client, schema: Arc<fnavro::Schema>) -> fnavro::FieldMapper<Nav> {
    client
        .mapper::<Nav>()
        .field("mstar_id", |n: &Nav| n.mstar_id.clone())
        .field("nav_date", |n: &Nav| n.nav_date)
        .field("value", |n: &Nav| n.value)
        .field("amount", |n: &Nav| n.amount)
        .build(schema)
        .unwrap()
}

fn decimal_text(value: &Value) -> String {
    match value {
        Value::Decimal(d) => fnavro::record::decimal::format_scaled(d, 6).unwrap(),
        other => panic!("expected decimal, got {other:?}"),
    }
}

// ============================================================================
// Client Flow Tests
// ============================================================================

#[tokio::test]
async fn test_nav_export_end_to_end() {
    let (client, sink) = client_with_schema().await;
    assert_eq!(
        client.schema_path("nav"),
        "memory://exports/avrotest/knowledge-hub/fund/nav/schema.avsc"
    );

    let schema = client.get_schema(&client.schema_path("nav")).await.unwrap();
    let mapper = nav_mapper(&client, schema.clone());

    let directory = format!("{BUCKET}/{NAMESPACE}/nav/2024/01/02");
    let mut writer = client
        .new_writer(schema, &directory, "nav_2024-01-02", 1)
        .unwrap();

    mapper
        .map_and_append(&nav("F000000010", 30.4, Some(12039.4)), &mut writer)
        .unwrap();
    mapper
        .map_and_append(&nav("F000000011", 30.4, Some(12040.4)), &mut writer)
        .unwrap();

    let report = writer.close().await.unwrap();
    assert_eq!(report.objects.len(), 1);
    let key = &report.objects[0].key;
    assert_eq!(
        key,
        "memory://exports/avrotest/knowledge-hub/fund/nav/2024/01/02/nav_2024-01-02_000000"
    );

    let decoded = decode_container(&sink.get(key).await.unwrap()).unwrap();
    assert_eq!(decoded.records.len(), 2);
    assert_eq!(decoded.schema.full_name(), "knowledge_hub.fund.Nav");

    let values: Vec<_> = decoded
        .records
        .iter()
        .map(|r| {
            (
                decimal_text(r.get("value").unwrap()),
                decimal_text(r.get("amount").unwrap()),
            )
        })
        .collect();
    assert_eq!(
        values,
        vec![
            ("30.400000".to_string(), "12039.400000".to_string()),
            ("30.400000".to_string(), "12040.400000".to_string()),
        ]
    );
    assert_eq!(
        decoded.records[0].get("value"),
        Some(&Value::Decimal(parse_decimal("30.4").unwrap()))
    );
    assert_eq!(
        decoded.records[1].get("nav_date"),
        Some(&Value::TimestampMicros(1_704_187_800_000_000))
    );
}

#[tokio::test]
async fn test_missing_value_leaves_buffer_unchanged() {
    let (client, _sink) = client_with_schema().await;
    let schema = client.get_schema(&client.schema_path("nav")).await.unwrap();
    let mapper = nav_mapper(&client, schema.clone());
    let mut writer = client
        .writer_for_entity(schema, "nav", nav_date(), 2)
        .unwrap();

    mapper
        .map_and_append(&nav("F000000010", 30.4, Some(1.0)), &mut writer)
        .unwrap();

    let err = mapper
        .map_and_append(&nav("F000000011", 30.4, None), &mut writer)
        .unwrap_err();
    match err {
        Error::Mapping { field, .. } => assert_eq!(field, "amount"),
        other => panic!("expected mapping error, got {other:?}"),
    }
    assert_eq!(writer.buffered_records(), 1);
    assert_eq!(writer.shard_len(0), 1);
    assert_eq!(writer.shard_len(1), 0);
}

#[tokio::test]
async fn test_schema_is_fetched_once() {
    let (client, _sink) = client_with_schema().await;
    let path = client.schema_path("nav");

    let first = client.get_schema(&path).await.unwrap();
    let second = client.get_schema(&path).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(client.resolver().is_cached(&path).await);

    let missing = client.get_schema(&client.schema_path("fx")).await.unwrap_err();
    assert!(matches!(missing, Error::SchemaNotFound { .. }));
}

#[tokio::test]
async fn test_multi_shard_export_is_deterministic() {
    let mut runs = Vec::new();
    for _ in 0..2 {
        let (client, sink) = client_with_schema().await;
        let schema = client.get_schema(&client.schema_path("nav")).await.unwrap();
        let mapper = nav_mapper(&client, schema.clone());
        let mut writer = client
            .writer_for_entity(schema, "nav", nav_date(), 3)
            .unwrap();

        for i in 0..10 {
            let id = format!("F{i:09}");
            let shard = mapper
                .map_and_append(&nav(&id, 10.0 + f64::from(i), Some(0.5)), &mut writer)
                .unwrap();
            assert_eq!(shard, i as usize % 3);
        }

        let report = writer.close().await.unwrap();
        let records: Vec<_> = report.objects.iter().map(|o| o.records).collect();
        assert_eq!(records, vec![4, 3, 3]);

        let mut blobs = Vec::new();
        for object in &report.objects {
            blobs.push(sink.get(&object.key).await.unwrap());
        }
        runs.push(blobs);
    }
    assert_eq!(runs[0], runs[1]);
}

#[tokio::test]
async fn test_writer_options_flow_from_config() {
    let sink = Arc::new(ObjectStoreSink::in_memory(BUCKET));
    let config = ClientConfig::new(BUCKET).with_writer(
        WriterOptions::default().with_empty_shards(fnavro::EmptyShardPolicy::WriteEmpty),
    );
    let client = Client::with_sink(config, sink.clone()).unwrap();
    sink.put(&client.schema_path("nav"), Bytes::from_static(NAV_SCHEMA.as_bytes()))
        .await
        .unwrap();

    let schema = client.get_schema(&client.schema_path("nav")).await.unwrap();
    let mut writer = client
        .writer_for_entity(schema, "nav", nav_date(), 2)
        .unwrap();
    let report = writer.close().await.unwrap();

    assert_eq!(report.objects.len(), 2);
    assert_eq!(
        report.objects[1].key,
        "memory://exports/nav/2024/01/02/nav_2024-01-02_000001"
    );
    assert_eq!(report.total_records(), 0);
}

// ============================================================================
// CLI Tests
// ============================================================================

#[tokio::test]
async fn test_cli_export_and_inspect_local_bucket() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path().to_str().unwrap().to_string();

    let schema_dir = temp_dir.path().join("fund/nav");
    std::fs::create_dir_all(&schema_dir).unwrap();
    std::fs::write(schema_dir.join("schema.avsc"), NAV_SCHEMA).unwrap();

    let input = temp_dir.path().join("navs.jsonl");
    std::fs::write(
        &input,
        concat!(
            r#"{"mstar_id": "F000000010", "nav_date": "2024-01-02T00:00:00Z", "value": 30.4, "amount": "12039.4"}"#,
            "\n\n",
            r#"{"mstar_id": "F000000011", "nav_date": "2024-01-02T00:00:00Z", "value": 30.4, "amount": 12040.4}"#,
            "\n",
        ),
    )
    .unwrap();

    let export = Cli::parse_from([
        "fnavro",
        "--bucket",
        &root,
        "--namespace",
        "fund",
        "export",
        "nav",
        "--input",
        input.to_str().unwrap(),
        "--date",
        "2024-01-02",
        "--shards",
        "2",
    ]);
    Runner::new(export).run().await.unwrap();

    let shard0 = temp_dir
        .path()
        .join("fund/nav/2024/01/02/nav_2024-01-02_000000");
    let shard1 = temp_dir
        .path()
        .join("fund/nav/2024/01/02/nav_2024-01-02_000001");
    let decoded = decode_container(&std::fs::read(&shard1).unwrap()).unwrap();
    assert_eq!(decoded.records.len(), 1);
    assert_eq!(decimal_text(decoded.records[0].get("amount").unwrap()), "12040.400000");

    let inspect = Cli::parse_from(["fnavro", "inspect", shard0.to_str().unwrap()]);
    Runner::new(inspect).run().await.unwrap();
}

#[tokio::test]
async fn test_cli_reports_bad_input_line() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path().to_str().unwrap().to_string();
    let schema_dir = temp_dir.path().join("nav");
    std::fs::create_dir_all(&schema_dir).unwrap();
    std::fs::write(schema_dir.join("schema.avsc"), NAV_SCHEMA).unwrap();

    let input = temp_dir.path().join("navs.jsonl");
    std::fs::write(&input, "{\"mstar_id\": \"F1\"}\n").unwrap();

    let export = Cli::parse_from([
        "fnavro",
        "--bucket",
        &root,
        "export",
        "nav",
        "--input",
        input.to_str().unwrap(),
    ]);
    let err = Runner::new(export).run().await.unwrap_err();
    assert!(err.to_string().contains("navs.jsonl:1"));
    assert!(err.to_string().contains("nav_date"));
}
