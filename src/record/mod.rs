//! Record module
//!
//! Values on both sides of the field mapping.
//!
//! # Overview
//!
//! - `SourceValue` - what a domain accessor yields
//! - `Value` / `MappedRecord` - schema-conformant values in schema order
//! - `decimal` - exact rational helpers (parsing, rescaling, unscaled form)

pub mod decimal;
mod source;
mod types;

pub use source::SourceValue;
pub use types::{MappedRecord, Value};

pub(crate) use types::UNIX_EPOCH_DAYS_FROM_CE;
