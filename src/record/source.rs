//! Caller-side values produced by field accessors

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use num_bigint::BigInt;
use num_rational::BigRational;

/// A domain member value before it is bound to a schema field
///
/// Accessors registered in a `MappingBuilder` return anything convertible
/// into `SourceValue`; the field mapper then converts it according to the
/// schema field's type.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceValue {
    Null,
    Bool(bool),
    Int(i64),
    /// Converted through its shortest round-trip decimal text when bound to
    /// a decimal field
    Float(f64),
    Decimal(BigRational),
    Text(String),
    Bytes(Vec<u8>),
    /// Any-offset timestamp, normalized to UTC on construction
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
}

impl SourceValue {
    /// Exact decimal from text, kept as text until bound to a field
    pub fn decimal_text(text: impl Into<String>) -> Self {
        SourceValue::Text(text.into())
    }

    /// Kind name used in messages
    pub fn kind(&self) -> &'static str {
        match self {
            SourceValue::Null => "null",
            SourceValue::Bool(_) => "bool",
            SourceValue::Int(_) => "integer",
            SourceValue::Float(_) => "float",
            SourceValue::Decimal(_) => "decimal",
            SourceValue::Text(_) => "text",
            SourceValue::Bytes(_) => "bytes",
            SourceValue::Timestamp(_) => "timestamp",
            SourceValue::Date(_) => "date",
        }
    }
}

macro_rules! from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for SourceValue {
            fn from(v: $t) -> Self {
                SourceValue::Int(i64::from(v))
            }
        })*
    };
}

from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for SourceValue {
    fn from(v: bool) -> Self {
        SourceValue::Bool(v)
    }
}

impl From<f32> for SourceValue {
    fn from(v: f32) -> Self {
        SourceValue::Float(f64::from(v))
    }
}

impl From<f64> for SourceValue {
    fn from(v: f64) -> Self {
        SourceValue::Float(v)
    }
}

impl From<BigRational> for SourceValue {
    fn from(v: BigRational) -> Self {
        SourceValue::Decimal(v)
    }
}

impl From<&BigRational> for SourceValue {
    fn from(v: &BigRational) -> Self {
        SourceValue::Decimal(v.clone())
    }
}

impl From<BigInt> for SourceValue {
    fn from(v: BigInt) -> Self {
        SourceValue::Decimal(BigRational::from_integer(v))
    }
}

impl From<String> for SourceValue {
    fn from(v: String) -> Self {
        SourceValue::Text(v)
    }
}

impl From<&String> for SourceValue {
    fn from(v: &String) -> Self {
        SourceValue::Text(v.clone())
    }
}

impl From<&str> for SourceValue {
    fn from(v: &str) -> Self {
        SourceValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for SourceValue {
    fn from(v: Vec<u8>) -> Self {
        SourceValue::Bytes(v)
    }
}

impl From<&[u8]> for SourceValue {
    fn from(v: &[u8]) -> Self {
        SourceValue::Bytes(v.to_vec())
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for SourceValue {
    fn from(v: DateTime<Tz>) -> Self {
        SourceValue::Timestamp(v.with_timezone(&Utc))
    }
}

/// Naive date-times are taken to be UTC
impl From<NaiveDateTime> for SourceValue {
    fn from(v: NaiveDateTime) -> Self {
        SourceValue::Timestamp(v.and_utc())
    }
}

impl From<NaiveDate> for SourceValue {
    fn from(v: NaiveDate) -> Self {
        SourceValue::Date(v)
    }
}

impl<T: Into<SourceValue>> From<Option<T>> for SourceValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SourceValue::Null, Into::into)
    }
}
