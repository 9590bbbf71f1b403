//! Schema module
//!
//! Record schemas: parsing Avro JSON definitions and resolving them
//! from storage.
//!
//! # Features
//!
//! - **Typed Fields**: Primitive, `fixed` and logical types (decimal,
//!   date, timestamps, uuid) with nullability
//! - **Validation**: Field names, duplicates, decimal precision/scale
//! - **Canonical Text**: Deterministic JSON embedded in container files
//! - **Cached Resolution**: One fetch per storage key, shared across writers

mod parser;
mod resolver;
mod types;

pub use parser::{parse_schema, parse_schema_at};
pub use resolver::SchemaResolver;
pub use types::{Field, FieldType, Nullability, Schema};

#[cfg(test)]
mod tests;
