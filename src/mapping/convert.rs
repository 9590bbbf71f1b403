//! Per-field conversion from source values to schema values

use crate::record::{decimal, SourceValue, Value, UNIX_EPOCH_DAYS_FROM_CE};
use crate::schema::{Field, FieldType};
use crate::types::RoundingMode;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use num_rational::BigRational;
use num_traits::ToPrimitive;
use regex::Regex;
use std::sync::LazyLock;

/// 8-4-4-4-12 hex digits
static UUID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("uuid regex is valid")
});

type Converted = std::result::Result<Value, String>;

/// Convert `source` for `field`, rounding decimals with `rounding`
///
/// The error string is the reason; callers attach the field name.
pub(crate) fn convert(field: &Field, source: SourceValue, rounding: RoundingMode) -> Converted {
    if matches!(source, SourceValue::Null) {
        return if field.is_nullable() || field.field_type == FieldType::Null {
            Ok(Value::Null)
        } else {
            Err(format!("null for non-nullable {} field", field.field_type))
        };
    }

    match &field.field_type {
        FieldType::Null => Err(mismatch(&source, &field.field_type)),
        FieldType::Boolean => match source {
            SourceValue::Bool(b) => Ok(Value::Boolean(b)),
            SourceValue::Text(t) => match t.as_str() {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                _ => Err(format!("'{t}' is not a boolean")),
            },
            other => Err(mismatch(&other, &field.field_type)),
        },
        FieldType::Int => to_i64(source, &field.field_type).and_then(|n| {
            i32::try_from(n)
                .map(Value::Int)
                .map_err(|_| format!("{n} does not fit a 32-bit int"))
        }),
        FieldType::Long => to_i64(source, &field.field_type).map(Value::Long),
        FieldType::Float => to_f64(source, &field.field_type).and_then(|f| {
            let narrowed = f as f32;
            if narrowed.is_finite() {
                Ok(Value::Float(narrowed))
            } else {
                Err(format!("{f} is out of range for float"))
            }
        }),
        FieldType::Double => to_f64(source, &field.field_type).map(Value::Double),
        FieldType::Bytes => match source {
            SourceValue::Bytes(b) => Ok(Value::Bytes(b)),
            SourceValue::Text(t) => Ok(Value::Bytes(t.into_bytes())),
            other => Err(mismatch(&other, &field.field_type)),
        },
        FieldType::Fixed { size } => match source {
            SourceValue::Bytes(b) if b.len() == *size => Ok(Value::Fixed(b)),
            SourceValue::Bytes(b) => Err(format!("{} bytes for fixed({size})", b.len())),
            other => Err(mismatch(&other, &field.field_type)),
        },
        FieldType::String => match source {
            SourceValue::Text(t) if t.is_empty() && !field.is_nullable() => {
                Err("empty string for required field".to_string())
            }
            SourceValue::Text(t) => Ok(Value::String(t)),
            other => Err(mismatch(&other, &field.field_type)),
        },
        FieldType::Uuid => match source {
            SourceValue::Text(t) if t.is_empty() && !field.is_nullable() => {
                Err("empty string for required field".to_string())
            }
            SourceValue::Text(t) if t.is_empty() || UUID_REGEX.is_match(&t) => Ok(Value::String(t)),
            SourceValue::Text(t) => Err(format!("'{t}' is not a UUID")),
            other => Err(mismatch(&other, &field.field_type)),
        },
        FieldType::Date => to_days(source).map(Value::Date),
        FieldType::TimestampMillis => match source {
            SourceValue::Int(n) => Ok(Value::TimestampMillis(n)),
            other => to_utc(other, &field.field_type).map(|t| Value::TimestampMillis(t.timestamp_millis())),
        },
        FieldType::TimestampMicros => match source {
            SourceValue::Int(n) => Ok(Value::TimestampMicros(n)),
            other => to_utc(other, &field.field_type).map(|t| Value::TimestampMicros(t.timestamp_micros())),
        },
        FieldType::Decimal {
            precision, scale, ..
        } => to_decimal(source, *precision, *scale, rounding).map(Value::Decimal),
    }
}

fn mismatch(source: &SourceValue, field_type: &FieldType) -> String {
    format!("cannot convert {} to {field_type}", source.kind())
}

fn to_i64(source: SourceValue, field_type: &FieldType) -> std::result::Result<i64, String> {
    match source {
        SourceValue::Int(n) => Ok(n),
        SourceValue::Text(t) => t
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("'{t}' is not an integer")),
        SourceValue::Decimal(d) if d.is_integer() => d
            .to_integer()
            .to_i64()
            .ok_or_else(|| format!("{d} does not fit a 64-bit long")),
        SourceValue::Decimal(d) => Err(format!("{d} is not an integer")),
        other => Err(mismatch(&other, field_type)),
    }
}

fn to_f64(source: SourceValue, field_type: &FieldType) -> std::result::Result<f64, String> {
    let value = match source {
        SourceValue::Float(f) => f,
        SourceValue::Int(n) => n as f64,
        SourceValue::Text(t) => t
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("'{t}' is not a number"))?,
        SourceValue::Decimal(d) => rational_to_f64(&d).ok_or_else(|| format!("{d} is out of range"))?,
        other => return Err(mismatch(&other, field_type)),
    };
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("non-finite value {value}"))
    }
}

fn rational_to_f64(value: &BigRational) -> Option<f64> {
    let numer = value.numer().to_f64()?;
    let denom = value.denom().to_f64()?;
    Some(numer / denom)
}

fn to_decimal(
    source: SourceValue,
    precision: u32,
    scale: u32,
    rounding: RoundingMode,
) -> std::result::Result<BigRational, String> {
    let exact = match source {
        SourceValue::Decimal(d) => d,
        SourceValue::Int(n) => BigRational::from_integer(n.into()),
        SourceValue::Text(t) => {
            decimal::parse_decimal(&t).ok_or_else(|| format!("'{t}' is not a decimal literal"))?
        }
        SourceValue::Float(f) => {
            decimal::from_f64(f).ok_or_else(|| format!("non-finite value {f}"))?
        }
        other => {
            return Err(format!(
                "cannot convert {} to decimal({precision},{scale})",
                other.kind()
            ))
        }
    };

    let scaled = decimal::rescale(&exact, scale, rounding).ok_or_else(|| {
        format!("value needs rounding to scale {scale} but rounding mode is {rounding}")
    })?;

    // rescale guarantees exactness at `scale`
    let digits = decimal::to_unscaled(&scaled, scale).map_or(0, |u| decimal::digit_count(&u));
    if digits > precision {
        return Err(format!(
            "value has {digits} digits at scale {scale}, precision is {precision}"
        ));
    }
    Ok(scaled)
}

fn to_utc(source: SourceValue, field_type: &FieldType) -> std::result::Result<DateTime<Utc>, String> {
    match source {
        SourceValue::Timestamp(t) => Ok(t),
        SourceValue::Date(d) => d
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .ok_or_else(|| format!("invalid date {d}")),
        SourceValue::Text(t) => DateTime::parse_from_rfc3339(t.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| format!("'{t}' is not an RFC 3339 timestamp: {e}")),
        other => Err(mismatch(&other, field_type)),
    }
}

fn to_days(source: SourceValue) -> std::result::Result<i32, String> {
    let date = match source {
        SourceValue::Date(d) => d,
        SourceValue::Timestamp(t) => t.date_naive(),
        SourceValue::Text(t) => NaiveDate::parse_from_str(t.trim(), "%Y-%m-%d")
            .map_err(|e| format!("'{t}' is not a YYYY-MM-DD date: {e}"))?,
        SourceValue::Int(n) => {
            return i32::try_from(n).map_err(|_| format!("{n} days is out of range"));
        }
        other => return Err(mismatch(&other, &FieldType::Date)),
    };
    Ok(date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
}
