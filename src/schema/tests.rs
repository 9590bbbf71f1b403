//! Tests for schema module

use super::*;
use crate::error::Error;
use crate::test_util::{ScriptedSink, NAV_SCHEMA};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use test_case::test_case;

// ============================================================================
// Parser Tests
// ============================================================================

#[test]
fn test_parse_nav_schema() {
    let schema = parse_schema(NAV_SCHEMA).unwrap();

    assert_eq!(schema.name(), "Nav");
    assert_eq!(schema.namespace(), Some("knowledge_hub.fund"));
    assert_eq!(schema.full_name(), "knowledge_hub.fund.Nav");

    let names: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["mstar_id", "nav_date", "value", "amount"]);

    assert_eq!(schema.fields()[0].field_type, FieldType::String);
    assert_eq!(schema.fields()[1].field_type, FieldType::TimestampMicros);
    assert_eq!(
        schema.field("value").unwrap().field_type,
        FieldType::Decimal {
            precision: 18,
            scale: 6,
            fixed_size: None
        }
    );
    assert_eq!(schema.index_of("amount"), Some(3));
    assert!(!schema.field("mstar_id").unwrap().is_nullable());
}

#[test]
fn test_parse_nullable_unions_keep_branch_order() {
    let schema = parse_schema(
        r#"{"type":"record","name":"R","fields":[
            {"name":"a","type":["null","string"]},
            {"name":"b","type":["long","null"]}
        ]}"#,
    )
    .unwrap();

    assert_eq!(schema.fields()[0].nullability, Nullability::NullFirst);
    assert_eq!(schema.fields()[1].nullability, Nullability::NullSecond);
    assert_eq!(schema.fields()[1].field_type, FieldType::Long);
}

#[test]
fn test_parse_logical_types() {
    let schema = parse_schema(
        r#"{"type":"record","name":"R","fields":[
            {"name":"d","type":{"type":"int","logicalType":"date"}},
            {"name":"ts","type":{"type":"long","logicalType":"timestamp-millis"}},
            {"name":"id","type":{"type":"string","logicalType":"uuid"}},
            {"name":"px","type":{"type":"fixed","name":"px","size":8,"logicalType":"decimal","precision":18,"scale":4}},
            {"name":"raw","type":{"type":"fixed","name":"raw","size":4}},
            {"name":"odd","type":{"type":"long","logicalType":"local-timestamp-nanos"}}
        ]}"#,
    )
    .unwrap();

    let types: Vec<FieldType> = schema
        .fields()
        .iter()
        .map(|f| f.field_type.clone())
        .collect();
    assert_eq!(
        types,
        vec![
            FieldType::Date,
            FieldType::TimestampMillis,
            FieldType::Uuid,
            FieldType::Decimal {
                precision: 18,
                scale: 4,
                fixed_size: Some(8)
            },
            FieldType::Fixed { size: 4 },
            // unknown logical type falls back to its base type
            FieldType::Long,
        ]
    );
}

#[test_case("not json", "invalid JSON" ; "not json")]
#[test_case(r#"{"type":"enum","name":"E","symbols":[]}"#, "must be 'record'" ; "not a record")]
#[test_case(r#"{"type":"record","fields":[]}"#, "missing 'name'" ; "record without name")]
#[test_case(r#"{"type":"record","name":"R"}"#, "'fields' missing" ; "no fields")]
#[test_case(r#"{"type":"record","name":"R","fields":[{"type":"string"}]}"#, "missing 'name'" ; "unnamed field")]
#[test_case(r#"{"type":"record","name":"R","fields":[{"name":"a"}]}"#, "missing 'type'" ; "untyped field")]
#[test_case(r#"{"type":"record","name":"R","fields":[{"name":"a","type":"varchar"}]}"#, "unrecognized type 'varchar'" ; "unknown primitive")]
#[test_case(r#"{"type":"record","name":"R","fields":[{"name":"a","type":"int"},{"name":"a","type":"long"}]}"#, "duplicate field name 'a'" ; "duplicate names")]
#[test_case(r#"{"type":"record","name":"R","fields":[{"name":"1a","type":"int"}]}"#, "invalid field name" ; "bad field name")]
#[test_case(r#"{"type":"record","name":"R","fields":[{"name":"a","type":["int","long"]}]}"#, "two-branch unions" ; "non-null union")]
#[test_case(r#"{"type":"record","name":"R","fields":[{"name":"a","type":{"type":"bytes","logicalType":"decimal","scale":2}}]}"#, "positive 'precision'" ; "decimal without precision")]
#[test_case(r#"{"type":"record","name":"R","fields":[{"name":"a","type":{"type":"bytes","logicalType":"decimal","precision":4,"scale":6}}]}"#, "exceeds precision" ; "scale above precision")]
#[test_case(r#"{"type":"record","name":"R","fields":[{"name":"a","type":{"type":"fixed","name":"a","size":2,"logicalType":"decimal","precision":10}}]}"#, "does not fit" ; "fixed too small")]
#[test_case(r#"{"type":"record","name":"R","fields":[{"name":"a","type":{"type":"array","items":"int"}}]}"#, "not supported" ; "array field")]
#[test_case(r#"{"type":"record","name":"R","fields":[{"name":"a","type":{"type":"fixed","name":"a","size":4611686018427387904,"logicalType":"decimal","precision":10}}]}"#, "exceeds 128 bytes" ; "huge fixed decimal")]
#[test_case(r#"{"type":"record","name":"R","fields":[{"name":"a","type":{"type":"bytes","logicalType":"decimal","precision":4,"scale":4294967297}}]}"#, "scale 4294967297 exceeds precision 4" ; "scale beyond u32")]
#[test_case(r#"{"type":"record","name":"R","fields":[{"name":"a","type":{"type":"bytes","logicalType":"decimal","precision":4000000000}}]}"#, "precision 4000000000 exceeds 256" ; "precision beyond cap")]
#[test_case(r#"{"type":"record","name":"R","fields":[{"name":"a","type":{"type":"bytes","logicalType":"decimal","precision":300,"scale":2}}]}"#, "exceeds 256" ; "precision just past cap")]
fn test_parse_rejects(text: &str, expected: &str) {
    let err = parse_schema(text).unwrap_err();
    match &err {
        Error::SchemaParse { key, message } => {
            assert_eq!(key, "<inline>");
            assert!(
                message.contains(expected),
                "expected '{expected}' in '{message}'"
            );
        }
        other => panic!("expected SchemaParse, got {other:?}"),
    }
}

#[test]
fn test_canonical_text_is_stable_and_reparses() {
    let schema = parse_schema(NAV_SCHEMA).unwrap();
    let text = schema.canonical_text();

    // Whitespace and key order in the source do not matter
    let reordered = r#"{"fields":[
        {"type":"string","name":"mstar_id"},
        {"type":{"logicalType":"timestamp-micros","type":"long"},"name":"nav_date"},
        {"type":{"scale":6,"precision":18,"logicalType":"decimal","type":"bytes"},"name":"value"},
        {"type":{"scale":6,"precision":18,"logicalType":"decimal","type":"bytes"},"name":"amount"}
    ],"namespace":"knowledge_hub.fund","name":"Nav","type":"record"}"#;
    assert_eq!(parse_schema(reordered).unwrap().canonical_text(), text);

    assert_eq!(parse_schema(&text).unwrap(), schema);
    assert!(text.starts_with(r#"{"fields":[{"name":"mstar_id","type":"string"}"#));
}

// ============================================================================
// Resolver Tests
// ============================================================================

const KEY: &str = "memory://bucket/avrotest/fund/nav/schema.avsc";

#[tokio::test]
async fn test_resolver_fetches_once() {
    let sink = Arc::new(ScriptedSink::new("memory://bucket"));
    sink.seed(KEY, NAV_SCHEMA).await;
    let resolver = SchemaResolver::new(sink.clone());

    let first = resolver.get_schema(KEY).await.unwrap();
    let second = resolver.get_schema(KEY).await.unwrap();

    assert_eq!(first, second);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(sink.gets(), 1);
    assert!(resolver.is_cached(KEY).await);
    assert_eq!(resolver.cached_keys().await, vec![KEY.to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_resolver_concurrent_callers_share_fetch() {
    let sink = Arc::new(ScriptedSink::new("memory://bucket"));
    sink.seed(KEY, NAV_SCHEMA).await;
    let resolver = Arc::new(SchemaResolver::new(sink.clone()));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            tokio::spawn(async move { resolver.get_schema(KEY).await.unwrap() })
        })
        .collect();

    let mut schemas = Vec::new();
    for handle in handles {
        schemas.push(handle.await.unwrap());
    }

    assert_eq!(sink.gets(), 1);
    assert!(schemas.iter().all(|s| Arc::ptr_eq(s, &schemas[0])));
}

#[tokio::test]
async fn test_resolver_missing_key() {
    let sink = Arc::new(ScriptedSink::new("memory://bucket"));
    let resolver = SchemaResolver::new(sink.clone());

    let err = resolver.get_schema(KEY).await.unwrap_err();
    assert!(matches!(err, Error::SchemaNotFound { ref key } if key == KEY));
    assert!(!resolver.is_cached(KEY).await);

    // Failures are not cached: once the object exists it resolves
    sink.seed(KEY, NAV_SCHEMA).await;
    assert!(resolver.get_schema(KEY).await.is_ok());
    assert_eq!(sink.gets(), 2);
}

#[tokio::test]
async fn test_resolver_parse_error_names_key() {
    let sink = Arc::new(ScriptedSink::new("memory://bucket"));
    sink.seed(KEY, r#"{"type":"record","name":"Nav","fields":[{"name":"x","type":"decimal"}]}"#)
        .await;
    let resolver = SchemaResolver::new(sink);

    let err = resolver.get_schema(KEY).await.unwrap_err();
    match err {
        Error::SchemaParse { key, message } => {
            assert_eq!(key, KEY);
            assert!(message.contains("unrecognized type 'decimal'"));
        }
        other => panic!("expected SchemaParse, got {other:?}"),
    }
}

#[tokio::test]
async fn test_resolver_invalidate_refetches() {
    let sink = Arc::new(ScriptedSink::new("memory://bucket"));
    sink.seed(KEY, NAV_SCHEMA).await;
    let resolver = SchemaResolver::new(sink.clone());

    resolver.get_schema(KEY).await.unwrap();
    assert!(resolver.invalidate(KEY).await);
    assert!(!resolver.invalidate(KEY).await);

    resolver.get_schema(KEY).await.unwrap();
    assert_eq!(sink.gets(), 2);

    resolver.clear().await;
    assert!(resolver.cached_keys().await.is_empty());
}
