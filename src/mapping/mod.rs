//! Field mapping module
//!
//! Turns domain values into schema-ordered records with explicit,
//! precision-safe conversions.
//!
//! # Overview
//!
//! Each schema field is bound by name to an accessor closure in a
//! `MappingBuilder`. Mapping a record walks the schema in order, reads the
//! accessor, and converts its `SourceValue`:
//!
//! | field type | accepted sources |
//! |------------|------------------|
//! | decimal | decimal, integer, decimal text, finite float (shortest text) |
//! | timestamp-millis/micros | timestamp (any offset), date, RFC 3339 text, integer epoch units |
//! | date | date, timestamp, `YYYY-MM-DD` text, integer days |
//! | string / uuid | text (non-empty when required; uuid shape checked) |
//! | int / long | integer, integer text, integral decimal (range checked) |
//! | float / double | float, integer, numeric text, decimal |
//! | boolean | bool, `true`/`false` text |
//! | bytes / fixed | bytes (fixed size checked); bytes also accepts text |
//!
//! Decimals are rescaled to the field scale once, with the mapper's
//! `RoundingMode`.

mod convert;
mod json;
mod mapper;

pub use mapper::{FieldMapper, MappingBuilder};
