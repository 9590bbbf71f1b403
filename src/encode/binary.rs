//! Avro binary primitives: zig-zag varints and length-prefixed bytes

use crate::error::{Error, Result};

/// Append a zig-zag varint `long`
pub fn write_long(buf: &mut Vec<u8>, value: i64) {
    let mut n = ((value << 1) ^ (value >> 63)) as u64;
    while n & !0x7F != 0 {
        buf.push(((n & 0x7F) | 0x80) as u8);
        n >>= 7;
    }
    buf.push(n as u8);
}

/// Append a length-prefixed byte sequence (`bytes` / `string`)
pub fn write_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    write_long(buf, data.len() as i64);
    buf.extend_from_slice(data);
}

/// Forward-only reader over an encoded buffer
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Check if every byte has been consumed
    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Take exactly `n` bytes
    pub fn read_fixed(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| {
                Error::decode(format!(
                    "unexpected end of data: need {n} bytes at offset {}",
                    self.pos
                ))
            })?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_fixed(1)?[0])
    }

    /// Read a zig-zag varint `long`
    pub fn read_long(&mut self) -> Result<i64> {
        let mut n: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            if shift >= 64 {
                return Err(Error::decode(format!(
                    "varint too long at offset {}",
                    self.pos
                )));
            }
            n |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        Ok(((n >> 1) as i64) ^ -((n & 1) as i64))
    }

    /// Read a length-prefixed byte sequence
    pub fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_long()?;
        let len = usize::try_from(len)
            .map_err(|_| Error::decode(format!("negative length {len} at offset {}", self.pos)))?;
        self.read_fixed(len)
    }

    /// Read a length-prefixed UTF-8 string
    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::decode(format!("invalid UTF-8 string: {e}")))
    }
}
