//! Avro object container decoder
//!
//! Reads files produced by `ContainerEncoder` (and any uncompressed
//! container whose schema this crate can parse).

use super::binary::Reader;
use super::container::{CODEC_KEY, MAGIC, SCHEMA_KEY, SYNC_MARKER_LEN};
use crate::error::{Error, Result};
use crate::record::{decimal, MappedRecord, Value};
use crate::schema::{parse_schema_at, Field, FieldType, Nullability, Schema};
use num_bigint::BigInt;
use std::collections::BTreeMap;

/// Cap on records claimed by one block of a schema whose records encode to no bytes
const MAX_ZERO_WIDTH_RECORDS: i64 = 1 << 20;

/// Contents of a decoded container file
#[derive(Debug, Clone)]
pub struct DecodedContainer {
    /// Schema embedded in the header
    pub schema: Schema,
    /// Records from every block, in file order
    pub records: Vec<MappedRecord>,
    /// Header metadata entries
    pub metadata: BTreeMap<String, Vec<u8>>,
    /// Block synchronization marker
    pub sync_marker: [u8; SYNC_MARKER_LEN],
    /// Number of data blocks
    pub blocks: usize,
}

/// Decode a complete container file
pub fn decode_container(bytes: &[u8]) -> Result<DecodedContainer> {
    let mut reader = Reader::new(bytes);

    if reader.read_fixed(MAGIC.len())? != MAGIC {
        return Err(Error::decode("not an Avro object container (bad magic)"));
    }

    let metadata = read_metadata(&mut reader)?;

    match metadata.get(CODEC_KEY).map(Vec::as_slice) {
        None | Some(b"null") => {}
        Some(other) => {
            return Err(Error::decode(format!(
                "unsupported codec '{}'",
                String::from_utf8_lossy(other)
            )))
        }
    }

    let schema_text = metadata
        .get(SCHEMA_KEY)
        .ok_or_else(|| Error::decode("header has no avro.schema entry"))?;
    let schema_text = std::str::from_utf8(schema_text)
        .map_err(|e| Error::decode(format!("schema is not UTF-8: {e}")))?;
    let schema = parse_schema_at(SCHEMA_KEY, schema_text)?;

    let mut sync_marker = [0u8; SYNC_MARKER_LEN];
    sync_marker.copy_from_slice(reader.read_fixed(SYNC_MARKER_LEN)?);

    let min_record_len = min_record_len(&schema);
    let mut records = Vec::new();
    let mut blocks = 0;
    while !reader.is_empty() {
        let count = reader.read_long()?;
        let size = reader.read_long()?;
        if count < 0 || size < 0 {
            return Err(Error::decode(format!(
                "block {blocks}: negative count or size"
            )));
        }

        let max_records = if min_record_len == 0 {
            MAX_ZERO_WIDTH_RECORDS
        } else {
            size / min_record_len
        };
        if count > max_records {
            return Err(Error::decode(format!(
                "block {blocks}: {count} records cannot fit in {size} bytes"
            )));
        }

        let data = reader.read_fixed(size as usize)?;
        let mut block_reader = Reader::new(data);
        for _ in 0..count {
            records.push(read_record(&schema, &mut block_reader)?);
        }
        if !block_reader.is_empty() {
            return Err(Error::decode(format!(
                "block {blocks}: {} trailing bytes",
                data.len() - block_reader.position()
            )));
        }

        if reader.read_fixed(SYNC_MARKER_LEN)? != sync_marker {
            return Err(Error::decode(format!("block {blocks}: sync marker mismatch")));
        }
        blocks += 1;
    }

    Ok(DecodedContainer {
        schema,
        records,
        metadata,
        sync_marker,
        blocks,
    })
}

fn read_metadata(reader: &mut Reader<'_>) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut metadata = BTreeMap::new();
    loop {
        let mut count = reader.read_long()?;
        if count == 0 {
            break;
        }
        if count < 0 {
            // Negative count is followed by the block's byte size
            count = count
                .checked_neg()
                .ok_or_else(|| Error::decode("metadata block count out of range"))?;
            reader.read_long()?;
        }
        for _ in 0..count {
            let key = reader.read_string()?;
            let value = reader.read_bytes()?.to_vec();
            metadata.insert(key, value);
        }
    }
    Ok(metadata)
}

/// Fewest bytes one encoded record can take: zero only when every field is `null`
fn min_record_len(schema: &Schema) -> i64 {
    let zero_width = schema.fields().iter().all(|field| {
        matches!(field.field_type, FieldType::Null) && !field.is_nullable()
    });
    i64::from(!zero_width)
}

fn read_record(schema: &Schema, reader: &mut Reader<'_>) -> Result<MappedRecord> {
    let mut record = MappedRecord::with_capacity(schema.len());
    for field in schema.fields() {
        let value = read_field(field, reader)?;
        record.push(field.name.clone(), value);
    }
    Ok(record)
}

fn read_field(field: &Field, reader: &mut Reader<'_>) -> Result<Value> {
    let null_branch = match field.nullability {
        Nullability::Required => return read_value(field, reader),
        Nullability::NullFirst => 0,
        Nullability::NullSecond => 1,
    };

    match reader.read_long()? {
        branch if branch == null_branch => Ok(Value::Null),
        0 | 1 => read_value(field, reader),
        other => Err(Error::decode(format!(
            "field '{}': union branch {other} out of range",
            field.name
        ))),
    }
}

fn read_value(field: &Field, reader: &mut Reader<'_>) -> Result<Value> {
    let value = match &field.field_type {
        FieldType::Null => Value::Null,
        FieldType::Boolean => Value::Boolean(reader.read_u8()? != 0),
        FieldType::Int => Value::Int(read_int(field, reader)?),
        FieldType::Date => Value::Date(read_int(field, reader)?),
        FieldType::Long => Value::Long(reader.read_long()?),
        FieldType::TimestampMillis => Value::TimestampMillis(reader.read_long()?),
        FieldType::TimestampMicros => Value::TimestampMicros(reader.read_long()?),
        FieldType::Float => {
            let raw: [u8; 4] = reader
                .read_fixed(4)?
                .try_into()
                .map_err(|_| Error::decode("short float"))?;
            Value::Float(f32::from_le_bytes(raw))
        }
        FieldType::Double => {
            let raw: [u8; 8] = reader
                .read_fixed(8)?
                .try_into()
                .map_err(|_| Error::decode("short double"))?;
            Value::Double(f64::from_le_bytes(raw))
        }
        FieldType::Bytes => Value::Bytes(reader.read_bytes()?.to_vec()),
        FieldType::String | FieldType::Uuid => Value::String(reader.read_string()?),
        FieldType::Fixed { size } => Value::Fixed(reader.read_fixed(*size)?.to_vec()),
        FieldType::Decimal {
            scale, fixed_size, ..
        } => {
            let raw = match fixed_size {
                Some(size) => reader.read_fixed(*size)?,
                None => reader.read_bytes()?,
            };
            let unscaled = BigInt::from_signed_bytes_be(raw);
            Value::Decimal(decimal::from_unscaled(unscaled, *scale))
        }
    };
    Ok(value)
}

fn read_int(field: &Field, reader: &mut Reader<'_>) -> Result<i32> {
    let long = reader.read_long()?;
    i32::try_from(long)
        .map_err(|_| Error::decode(format!("field '{}': int {long} out of range", field.name)))
}
