//! Avro object container encoder

use super::binary::{write_bytes, write_long};
use crate::error::{Error, Result};
use crate::record::{decimal, MappedRecord, Value};
use crate::schema::{Field, FieldType, Nullability, Schema};
use num_bigint::Sign;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Container file magic: `Obj` followed by format version 1
pub const MAGIC: [u8; 4] = *b"Obj\x01";

/// Length of the block synchronization marker
pub const SYNC_MARKER_LEN: usize = 16;

/// Default number of records per data block
pub const DEFAULT_BLOCK_SIZE: usize = 1000;

/// Metadata key holding the schema text
pub const SCHEMA_KEY: &str = "avro.schema";

/// Metadata key holding the compression codec
pub const CODEC_KEY: &str = "avro.codec";

/// Sync marker derived from the schema text
///
/// First 16 bytes of SHA-256 over the canonical schema, so files for the
/// same schema are byte-identical for identical records.
pub fn sync_marker_for(schema_text: &str) -> [u8; SYNC_MARKER_LEN] {
    let digest = Sha256::digest(schema_text.as_bytes());
    let mut marker = [0u8; SYNC_MARKER_LEN];
    marker.copy_from_slice(&digest[..SYNC_MARKER_LEN]);
    marker
}

/// Check every field of `record` against `schema`, in order
pub fn validate_record(schema: &Schema, record: &MappedRecord) -> Result<()> {
    if record.len() != schema.len() {
        return Err(Error::encode(format!(
            "record has {} fields, schema {} has {}",
            record.len(),
            schema.full_name(),
            schema.len()
        )));
    }

    for (idx, (field, (name, value))) in schema.fields().iter().zip(record.fields()).enumerate() {
        if field.name != *name {
            return Err(Error::encode(format!(
                "record field #{idx} is '{name}', schema expects '{}'",
                field.name
            )));
        }
        value
            .check_against(field)
            .map_err(|reason| Error::encode(format!("field '{name}': {reason}")))?;
    }
    Ok(())
}

/// Encodes mapped records into an Avro object container
#[derive(Debug, Clone)]
pub struct ContainerEncoder {
    schema: Arc<Schema>,
    schema_text: String,
    sync_marker: [u8; SYNC_MARKER_LEN],
    block_size: usize,
}

impl ContainerEncoder {
    /// Create an encoder for `schema` with the default block size
    pub fn new(schema: Arc<Schema>) -> Self {
        let schema_text = schema.canonical_text();
        let sync_marker = sync_marker_for(&schema_text);
        Self {
            schema,
            schema_text,
            sync_marker,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    /// Set the maximum number of records per block (at least 1)
    #[must_use]
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    /// Schema this encoder writes
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Sync marker written after the header and every block
    pub fn sync_marker(&self) -> [u8; SYNC_MARKER_LEN] {
        self.sync_marker
    }

    /// Encode a complete container file
    ///
    /// An empty slice yields a header-only file.
    pub fn encode(&self, records: &[MappedRecord]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_header(&mut out);

        let mut block = Vec::new();
        for chunk in records.chunks(self.block_size) {
            block.clear();
            for record in chunk {
                self.encode_record(record, &mut block)?;
            }
            write_long(&mut out, chunk.len() as i64);
            write_long(&mut out, block.len() as i64);
            out.extend_from_slice(&block);
            out.extend_from_slice(&self.sync_marker);
        }

        Ok(out)
    }

    fn write_header(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&MAGIC);

        // Metadata map, one block, keys in sorted order
        write_long(out, 2);
        write_bytes(out, CODEC_KEY.as_bytes());
        write_bytes(out, b"null");
        write_bytes(out, SCHEMA_KEY.as_bytes());
        write_bytes(out, self.schema_text.as_bytes());
        write_long(out, 0);

        out.extend_from_slice(&self.sync_marker);
    }

    /// Append the binary encoding of one record
    pub fn encode_record(&self, record: &MappedRecord, buf: &mut Vec<u8>) -> Result<()> {
        validate_record(&self.schema, record)?;

        for (field, (_, value)) in self.schema.fields().iter().zip(record.fields()) {
            encode_field(field, value, buf)?;
        }
        Ok(())
    }
}

/// Convenience wrapper: encode `records` for `schema` with default settings
pub fn encode(schema: Arc<Schema>, records: &[MappedRecord]) -> Result<Vec<u8>> {
    ContainerEncoder::new(schema).encode(records)
}

fn encode_field(field: &Field, value: &Value, buf: &mut Vec<u8>) -> Result<()> {
    match (field.nullability, value) {
        (Nullability::Required, _) => encode_value(field, value, buf),
        (Nullability::NullFirst, Value::Null) => {
            write_long(buf, 0);
            Ok(())
        }
        (Nullability::NullFirst, _) => {
            write_long(buf, 1);
            encode_value(field, value, buf)
        }
        (Nullability::NullSecond, Value::Null) => {
            write_long(buf, 1);
            Ok(())
        }
        (Nullability::NullSecond, _) => {
            write_long(buf, 0);
            encode_value(field, value, buf)
        }
    }
}

fn encode_value(field: &Field, value: &Value, buf: &mut Vec<u8>) -> Result<()> {
    match (&field.field_type, value) {
        (_, Value::Null) => {}
        (_, Value::Boolean(b)) => buf.push(u8::from(*b)),
        (_, Value::Int(i) | Value::Date(i)) => write_long(buf, i64::from(*i)),
        (_, Value::Long(l) | Value::TimestampMillis(l) | Value::TimestampMicros(l)) => {
            write_long(buf, *l);
        }
        (_, Value::Float(f)) => buf.extend_from_slice(&f.to_le_bytes()),
        (_, Value::Double(d)) => buf.extend_from_slice(&d.to_le_bytes()),
        (_, Value::Bytes(b)) => write_bytes(buf, b),
        (_, Value::String(s)) => write_bytes(buf, s.as_bytes()),
        (_, Value::Fixed(b)) => buf.extend_from_slice(b),
        (
            FieldType::Decimal {
                scale, fixed_size, ..
            },
            Value::Decimal(d),
        ) => {
            let unscaled = decimal::to_unscaled(d, *scale).ok_or_else(|| {
                Error::encode(format!(
                    "field '{}': decimal {d} is not exact at scale {scale}",
                    field.name
                ))
            })?;
            let bytes = unscaled.to_signed_bytes_be();
            match fixed_size {
                None => write_bytes(buf, &bytes),
                Some(size) => {
                    if bytes.len() > *size {
                        return Err(Error::encode(format!(
                            "field '{}': decimal {d} needs {} bytes, fixed size is {size}",
                            field.name,
                            bytes.len()
                        )));
                    }
                    let pad = if unscaled.sign() == Sign::Minus { 0xFF } else { 0x00 };
                    buf.extend(std::iter::repeat(pad).take(size - bytes.len()));
                    buf.extend_from_slice(&bytes);
                }
            }
        }
        (other, Value::Decimal(_)) => {
            return Err(Error::encode(format!(
                "field '{}': decimal value for {other} field",
                field.name
            )));
        }
    }
    Ok(())
}
