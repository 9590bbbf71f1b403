//! Avro JSON schema parser
//!
//! Accepts a single top-level `record` whose fields use primitive types,
//! the logical types `decimal`, `date`, `timestamp-millis`,
//! `timestamp-micros` and `uuid`, `fixed`, and two-branch nullable unions.

use super::types::{Field, FieldType, Nullability, Schema};
use crate::error::{Error, Result};
use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Avro name rule: `[A-Za-z_][A-Za-z0-9_]*`
static NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("name regex is valid")
});

/// Namespace rule: dot-separated names, possibly empty
static NAMESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*)?$")
        .expect("namespace regex is valid")
});

/// Upper bound on decimal precision, which also bounds scale
pub const MAX_DECIMAL_PRECISION: u32 = 256;

/// Widest `fixed` backing a decimal; 107 bytes already hold 256 digits
pub const MAX_DECIMAL_FIXED_SIZE: usize = 128;

/// Parse an inline schema definition
pub fn parse_schema(text: &str) -> Result<Schema> {
    parse_schema_at("<inline>", text)
}

/// Parse a schema definition fetched from `key`
///
/// All failures are reported as `Error::SchemaParse` naming the key.
pub fn parse_schema_at(key: &str, text: &str) -> Result<Schema> {
    let json: JsonValue = serde_json::from_str(text)
        .map_err(|e| Error::schema_parse(key, format!("invalid JSON: {e}")))?;

    parse_record(&json).map_err(|message| Error::schema_parse(key, message))
}

type ParseResult<T> = std::result::Result<T, String>;

fn parse_record(json: &JsonValue) -> ParseResult<Schema> {
    let obj = json
        .as_object()
        .ok_or_else(|| "top-level schema must be a JSON object".to_string())?;

    match obj.get("type").and_then(JsonValue::as_str) {
        Some("record") => {}
        Some(other) => return Err(format!("top-level type must be 'record', got '{other}'")),
        None => return Err("top-level schema missing 'type'".to_string()),
    }

    let name = obj
        .get("name")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| "record missing 'name'".to_string())?;
    if !NAME_REGEX.is_match(name) {
        return Err(format!("invalid record name '{name}'"));
    }

    let namespace = match obj.get("namespace") {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::String(ns)) if NAMESPACE_REGEX.is_match(ns) => Some(ns.clone()),
        Some(other) => return Err(format!("invalid namespace {other}")),
    };

    let doc = obj.get("doc").and_then(JsonValue::as_str).map(String::from);

    let fields_arr = obj
        .get("fields")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| "record 'fields' missing or not an array".to_string())?;

    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(fields_arr.len());
    for (idx, field_json) in fields_arr.iter().enumerate() {
        let field = parse_field(idx, field_json)?;
        if !seen.insert(field.name.clone()) {
            return Err(format!("duplicate field name '{}'", field.name));
        }
        fields.push(field);
    }

    Ok(Schema::from_parts(name.to_string(), namespace, doc, fields))
}

fn parse_field(idx: usize, json: &JsonValue) -> ParseResult<Field> {
    let obj = json
        .as_object()
        .ok_or_else(|| format!("field #{idx} is not an object"))?;

    let name = obj
        .get("name")
        .and_then(JsonValue::as_str)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| format!("field #{idx} missing 'name'"))?;
    if !NAME_REGEX.is_match(name) {
        return Err(format!("invalid field name '{name}'"));
    }

    let type_json = obj
        .get("type")
        .ok_or_else(|| format!("field '{name}' missing 'type'"))?;

    let (field_type, nullability) = match type_json {
        JsonValue::Array(branches) => parse_union(name, branches)?,
        other => (parse_type(name, other)?, Nullability::Required),
    };

    Ok(Field {
        name: name.to_string(),
        field_type,
        nullability,
        doc: obj.get("doc").and_then(JsonValue::as_str).map(String::from),
        default: obj.get("default").cloned(),
    })
}

/// Only `["null", T]` and `[T, "null"]` are accepted.
fn parse_union(name: &str, branches: &[JsonValue]) -> ParseResult<(FieldType, Nullability)> {
    let is_null = |v: &JsonValue| v.as_str() == Some("null");

    match branches {
        [first, second] if is_null(first) && !is_null(second) => {
            Ok((parse_type(name, second)?, Nullability::NullFirst))
        }
        [first, second] if !is_null(first) && is_null(second) => {
            Ok((parse_type(name, first)?, Nullability::NullSecond))
        }
        _ => Err(format!(
            "field '{name}': only two-branch unions with 'null' are supported"
        )),
    }
}

fn parse_type(name: &str, json: &JsonValue) -> ParseResult<FieldType> {
    match json {
        JsonValue::String(s) => parse_primitive(name, s),
        JsonValue::Object(obj) => parse_complex(name, obj),
        other => Err(format!("field '{name}': unexpected type definition {other}")),
    }
}

fn parse_primitive(name: &str, type_name: &str) -> ParseResult<FieldType> {
    match type_name {
        "null" => Ok(FieldType::Null),
        "boolean" => Ok(FieldType::Boolean),
        "int" => Ok(FieldType::Int),
        "long" => Ok(FieldType::Long),
        "float" => Ok(FieldType::Float),
        "double" => Ok(FieldType::Double),
        "bytes" => Ok(FieldType::Bytes),
        "string" => Ok(FieldType::String),
        _ => Err(format!("field '{name}': unrecognized type '{type_name}'")),
    }
}

fn parse_complex(name: &str, obj: &Map<String, JsonValue>) -> ParseResult<FieldType> {
    let base = obj
        .get("type")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| format!("field '{name}': type object missing 'type'"))?;
    let logical = obj.get("logicalType").and_then(JsonValue::as_str);

    match (base, logical) {
        ("bytes", Some("decimal")) => {
            let (precision, scale) = decimal_params(name, obj)?;
            Ok(FieldType::Decimal {
                precision,
                scale,
                fixed_size: None,
            })
        }
        ("fixed", Some("decimal")) => {
            let size = fixed_size(name, obj)?;
            if size > MAX_DECIMAL_FIXED_SIZE {
                return Err(format!(
                    "field '{name}': decimal fixed({size}) exceeds {MAX_DECIMAL_FIXED_SIZE} bytes"
                ));
            }
            let (precision, scale) = decimal_params(name, obj)?;
            if precision > max_precision_for_size(size) {
                return Err(format!(
                    "field '{name}': precision {precision} does not fit in fixed({size})"
                ));
            }
            Ok(FieldType::Decimal {
                precision,
                scale,
                fixed_size: Some(size),
            })
        }
        ("fixed", _) => Ok(FieldType::Fixed {
            size: fixed_size(name, obj)?,
        }),
        ("int", Some("date")) => Ok(FieldType::Date),
        ("long", Some("timestamp-millis")) => Ok(FieldType::TimestampMillis),
        ("long", Some("timestamp-micros")) => Ok(FieldType::TimestampMicros),
        ("string", Some("uuid")) => Ok(FieldType::Uuid),
        ("record" | "enum" | "array" | "map", _) => Err(format!(
            "field '{name}': complex type '{base}' is not supported"
        )),
        // Unknown logical types fall back to the underlying type
        (primitive, _) => parse_primitive(name, primitive),
    }
}

fn decimal_params(name: &str, obj: &Map<String, JsonValue>) -> ParseResult<(u32, u32)> {
    let precision = obj
        .get("precision")
        .and_then(JsonValue::as_u64)
        .filter(|p| *p > 0)
        .ok_or_else(|| format!("field '{name}': decimal requires a positive 'precision'"))?;
    let precision = u32::try_from(precision)
        .ok()
        .filter(|p| *p <= MAX_DECIMAL_PRECISION)
        .ok_or_else(|| {
            format!("field '{name}': precision {precision} exceeds {MAX_DECIMAL_PRECISION}")
        })?;

    let scale = match obj.get("scale") {
        None => 0,
        Some(v) => {
            let scale = v.as_u64().ok_or_else(|| {
                format!("field '{name}': decimal 'scale' must be a non-negative integer")
            })?;
            u32::try_from(scale).map_err(|_| {
                format!("field '{name}': scale {scale} exceeds precision {precision}")
            })?
        }
    };

    if scale > precision {
        return Err(format!(
            "field '{name}': scale {scale} exceeds precision {precision}"
        ));
    }
    Ok((precision, scale))
}

fn fixed_size(name: &str, obj: &Map<String, JsonValue>) -> ParseResult<usize> {
    obj.get("size")
        .and_then(JsonValue::as_u64)
        .filter(|s| *s > 0)
        .and_then(|s| usize::try_from(s).ok())
        .ok_or_else(|| format!("field '{name}': fixed requires a positive 'size'"))
}

/// Largest decimal precision a two's-complement integer of `size` bytes holds
fn max_precision_for_size(size: usize) -> u32 {
    // floor(log10(2^(8*size - 1) - 1))
    let bits = size.saturating_mul(8).saturating_sub(1) as f64;
    (bits * std::f64::consts::LOG10_2).floor() as u32
}
