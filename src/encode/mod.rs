//! Encode module
//!
//! Avro object container files: the on-disk contract consumers of the
//! exported data rely on.
//!
//! # Layout
//!
//! ```text
//! "Obj" 0x01 | metadata map {avro.codec: "null", avro.schema: <json>} | sync(16)
//! block*: count(long) | size(long) | records | sync(16)
//! ```
//!
//! Output is deterministic: the sync marker is derived from the schema text
//! and blocks always hold `block_size` records except the last.

mod binary;
mod container;
mod decoder;

pub use container::{
    encode, sync_marker_for, validate_record, ContainerEncoder, DEFAULT_BLOCK_SIZE, MAGIC,
    SYNC_MARKER_LEN,
};
pub use decoder::{decode_container, DecodedContainer};
