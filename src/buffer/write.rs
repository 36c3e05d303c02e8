//! Write buffer for encoding engine RPC payloads
//!
//! Mirrors [`ReadBuffer`](super::ReadBuffer): big-endian fixed-width items
//! and length-prefixed variable items padded to a four-byte boundary.

use bytes::{BufMut, BytesMut};

use super::read::padding;
use crate::error::{Error, Result};
use crate::types::Oid;

/// A buffer for writing packed RPC data
#[derive(Debug)]
pub struct WriteBuffer {
    /// The underlying byte buffer
    data: BytesMut,
    /// Maximum capacity (for frame size limits)
    max_capacity: Option<usize>,
}

impl WriteBuffer {
    /// Create a new WriteBuffer with default capacity
    pub fn new() -> Self {
        Self {
            data: BytesMut::with_capacity(1024),
            max_capacity: None,
        }
    }

    /// Create a new WriteBuffer with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            max_capacity: None,
        }
    }

    /// Create a new WriteBuffer with a maximum capacity limit
    pub fn with_max_capacity(capacity: usize, max_capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            max_capacity: Some(max_capacity),
        }
    }

    /// Get the current length of data in the buffer
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Clear the buffer, keeping its allocation
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Get the buffer contents as a byte slice
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Freeze the buffer into immutable Bytes
    pub fn freeze(self) -> bytes::Bytes {
        self.data.freeze()
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    #[inline]
    fn ensure_capacity(&self, n: usize) -> Result<()> {
        if let Some(max) = self.max_capacity {
            if self.data.len() + n > max {
                return Err(Error::BufferOverflow {
                    needed: n,
                    available: max.saturating_sub(self.data.len()),
                });
            }
        }
        Ok(())
    }

    fn write_length(&mut self, len: usize) -> Result<()> {
        let len = i32::try_from(len)
            .map_err(|_| Error::InvalidArgument(format!("item too long: {} bytes", len)))?;
        self.write_i32(len)
    }

    // =========================================================================
    // Fixed-width writes
    // =========================================================================

    /// Write raw bytes without a length prefix
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_capacity(bytes.len())?;
        self.data.put_slice(bytes);
        Ok(())
    }

    /// Write zeros
    pub fn write_zeros(&mut self, n: usize) -> Result<()> {
        self.ensure_capacity(n)?;
        self.data.put_bytes(0, n);
        Ok(())
    }

    /// Write a 4-byte big-endian signed integer
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.ensure_capacity(4)?;
        self.data.put_i32(value);
        Ok(())
    }

    /// Write an 8-byte big-endian signed integer
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.ensure_capacity(8)?;
        self.data.put_i64(value);
        Ok(())
    }

    /// Write a short, widened to four bytes
    pub fn write_short(&mut self, value: i16) -> Result<()> {
        self.write_i32(value as i32)
    }

    /// Write a boolean, widened to four bytes
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_i32(value as i32)
    }

    /// Write a 4-byte IEEE-754 float
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.ensure_capacity(4)?;
        self.data.put_f32(value);
        Ok(())
    }

    /// Write an 8-byte IEEE-754 double
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.ensure_capacity(8)?;
        self.data.put_f64(value);
        Ok(())
    }

    /// Write an object identifier (page, slot, volume)
    pub fn write_oid(&mut self, oid: &Oid) -> Result<()> {
        self.write_i32(oid.page_id())?;
        self.write_short(oid.slot_id())?;
        self.write_short(oid.vol_id())
    }

    // =========================================================================
    // Variable-length writes
    // =========================================================================

    /// Write a length-prefixed byte array followed by its padding
    pub fn write_bytes_with_length(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_length(bytes.len())?;
        self.write_raw(bytes)?;
        self.write_zeros(padding(bytes.len()))
    }

    /// Write the null marker used for strings and byte arrays
    pub fn write_null_length(&mut self) -> Result<()> {
        self.write_i32(-1)
    }

    /// Write already-encoded string bytes with terminator and padding
    ///
    /// The length field holds the padded size, terminator included. The
    /// reader ends the string at the first NUL, so an interior NUL is rejected.
    pub fn write_string_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if let Some(at) = bytes.iter().position(|&b| b == 0) {
            return Err(Error::InvalidArgument(format!(
                "string contains a NUL byte at offset {}",
                at
            )));
        }
        let total = bytes.len() + 1;
        let padded = total + padding(total);
        self.write_length(padded)?;
        self.write_raw(bytes)?;
        self.write_zeros(padded - bytes.len())
    }

    /// Write a UTF-8 string
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_string_bytes(value.as_bytes())
    }

    /// Write an optional string, using the null marker for `None`
    pub fn write_opt_string(&mut self, value: Option<&str>) -> Result<()> {
        match value {
            Some(s) => self.write_string(s),
            None => self.write_null_length(),
        }
    }
}

impl Default for WriteBuffer {
    fn default() -> Self {
        Self::new()
    }
}
