//! Field mapping for dynamic JSON objects

use super::mapper::FieldMapper;
use crate::error::Result;
use crate::record::SourceValue;
use crate::schema::Schema;
use crate::types::RoundingMode;
use serde_json::Value as JsonValue;
use std::sync::Arc;

impl FieldMapper<JsonValue> {
    /// Mapper reading each schema field from the same-named JSON key
    ///
    /// Integral numbers map as integers; every other number keeps its JSON
    /// text so decimals stay exact. Arrays of small integers map as bytes.
    pub fn json(schema: Arc<Schema>, rounding: RoundingMode) -> Result<Self> {
        let mut builder = FieldMapper::<JsonValue>::builder().rounding(rounding);
        for field in schema.fields() {
            let key = field.name.clone();
            builder = builder.try_field(field.name.clone(), move |row: &JsonValue| {
                json_source(row, &key)
            });
        }
        builder.build(schema)
    }
}

fn json_source(row: &JsonValue, key: &str) -> std::result::Result<SourceValue, String> {
    let object = row
        .as_object()
        .ok_or_else(|| "input record is not a JSON object".to_string())?;
    let value = object
        .get(key)
        .ok_or_else(|| "missing from input record".to_string())?;

    match value {
        JsonValue::Null => Ok(SourceValue::Null),
        JsonValue::Bool(b) => Ok(SourceValue::Bool(*b)),
        JsonValue::Number(n) => Ok(n
            .as_i64()
            .map_or_else(|| SourceValue::Text(n.to_string()), SourceValue::Int)),
        JsonValue::String(s) => Ok(SourceValue::Text(s.clone())),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| "arrays must hold byte values 0-255".to_string())
            })
            .collect::<std::result::Result<Vec<u8>, String>>()
            .map(SourceValue::Bytes),
        JsonValue::Object(_) => Err("nested objects are not supported".to_string()),
    }
}
