//! Schema-conformant values and mapped records

use super::decimal;
use crate::schema::{Field, FieldType};
use chrono::{DateTime, NaiveDate, Utc};
use num_rational::BigRational;
use serde_json::{json, Value as JsonValue};

/// A value shaped for one schema field
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    String(String),
    /// Days since 1970-01-01
    Date(i32),
    /// Milliseconds since the Unix epoch, UTC
    TimestampMillis(i64),
    /// Microseconds since the Unix epoch, UTC
    TimestampMicros(i64),
    /// Exact decimal, already constrained to the field scale
    Decimal(BigRational),
    Fixed(Vec<u8>),
}

impl Value {
    /// Kind name used in messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::TimestampMillis(_) => "timestamp-millis",
            Value::TimestampMicros(_) => "timestamp-micros",
            Value::Decimal(_) => "decimal",
            Value::Fixed(_) => "fixed",
        }
    }

    /// Check that this value can be encoded for `field`
    ///
    /// Decimals must already be exact at the field scale and within its
    /// precision; fixed values must match the declared size.
    pub fn check_against(&self, field: &Field) -> Result<(), String> {
        let ok = match (&field.field_type, self) {
            (_, Value::Null) => field.is_nullable() || field.field_type == FieldType::Null,
            (FieldType::Boolean, Value::Boolean(_))
            | (FieldType::Int, Value::Int(_))
            | (FieldType::Long, Value::Long(_))
            | (FieldType::Float, Value::Float(_))
            | (FieldType::Double, Value::Double(_))
            | (FieldType::Bytes, Value::Bytes(_))
            | (FieldType::String | FieldType::Uuid, Value::String(_))
            | (FieldType::Date, Value::Date(_))
            | (FieldType::TimestampMillis, Value::TimestampMillis(_))
            | (FieldType::TimestampMicros, Value::TimestampMicros(_)) => true,
            (FieldType::Fixed { size }, Value::Fixed(bytes)) => {
                if bytes.len() != *size {
                    return Err(format!(
                        "fixed({size}) value has {} bytes",
                        bytes.len()
                    ));
                }
                true
            }
            (
                FieldType::Decimal {
                    precision, scale, ..
                },
                Value::Decimal(value),
            ) => {
                let unscaled = decimal::to_unscaled(value, *scale)
                    .ok_or_else(|| format!("decimal {value} is not exact at scale {scale}"))?;
                if decimal::digit_count(&unscaled) > *precision {
                    return Err(format!(
                        "decimal {value} exceeds precision {precision}"
                    ));
                }
                true
            }
            _ => false,
        };

        if ok {
            Ok(())
        } else {
            Err(format!(
                "{} value does not match field type {}",
                self.kind(),
                field.field_type
            ))
        }
    }

    /// Render for display, using the field type for decimal scale
    ///
    /// Decimals become fixed-scale strings (`"30.400000"`), timestamps and
    /// dates ISO 8601 strings, bytes arrays of numbers.
    pub fn to_json(&self, field_type: &FieldType) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Boolean(b) => json!(b),
            Value::Int(i) => json!(i),
            Value::Long(l) => json!(l),
            Value::Float(f) => json!(f),
            Value::Double(d) => json!(d),
            Value::Bytes(b) | Value::Fixed(b) => json!(b),
            Value::String(s) => json!(s),
            Value::Date(days) => days
                .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
                .and_then(NaiveDate::from_num_days_from_ce_opt)
                .map_or_else(|| json!(days), |d| json!(d.format("%Y-%m-%d").to_string())),
            Value::TimestampMillis(ms) => DateTime::<Utc>::from_timestamp_millis(*ms)
                .map_or_else(|| json!(ms), |t| json!(t.to_rfc3339())),
            Value::TimestampMicros(us) => DateTime::<Utc>::from_timestamp_micros(*us)
                .map_or_else(|| json!(us), |t| json!(t.to_rfc3339())),
            Value::Decimal(value) => {
                let text = match field_type {
                    FieldType::Decimal { scale, .. } => decimal::format_scaled(value, *scale),
                    _ => None,
                };
                json!(text.unwrap_or_else(|| value.to_string()))
            }
        }
    }
}

/// `NaiveDate::num_days_from_ce` of 1970-01-01
pub(crate) const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// One domain record translated into schema order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedRecord {
    fields: Vec<(String, Value)>,
}

impl MappedRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty record with room for `n` fields
    pub fn with_capacity(n: usize) -> Self {
        Self {
            fields: Vec::with_capacity(n),
        }
    }

    /// Append the next field in schema order
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.fields.push((name.into(), value));
    }

    /// Builder-style `push`
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.push(name, value);
        self
    }

    /// `(name, value)` pairs in schema order
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// Look up a value by field name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
