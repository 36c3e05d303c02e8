//! Read buffer for decoding engine RPC payloads
//!
//! Provides methods for reading the packed primitive types used on the
//! engine channel. Every item is big-endian and occupies a multiple of
//! four bytes, so the cursor stays aligned between items.

use bytes::Bytes;

use crate::constants::ALIGNMENT;
use crate::error::{Error, Result};
use crate::types::Oid;

/// A buffer for reading packed RPC data
#[derive(Debug)]
pub struct ReadBuffer {
    /// The underlying byte data
    data: Bytes,
    /// Current read position
    pos: usize,
}

impl ReadBuffer {
    /// Create a new ReadBuffer from bytes
    pub fn new(data: Bytes) -> Self {
        Self { data, pos: 0 }
    }

    /// Create a new ReadBuffer from a byte slice
    pub fn from_slice(data: &[u8]) -> Self {
        Self {
            data: Bytes::copy_from_slice(data),
            pos: 0,
        }
    }

    /// Create a new ReadBuffer from a Vec
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            data: Bytes::from(data),
            pos: 0,
        }
    }

    /// Get the current position in the buffer
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Get the total length of the buffer
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the number of bytes remaining to be read
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Check if there are at least `n` bytes remaining
    #[inline]
    pub fn has_remaining(&self, n: usize) -> bool {
        self.remaining() >= n
    }

    /// Skip `n` bytes in the buffer
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure_remaining(n)?;
        self.pos += n;
        Ok(())
    }

    /// Fail unless every byte has been consumed
    ///
    /// Called after a response decoder finishes; leftover bytes mean the
    /// decoder and the engine disagree about the layout.
    pub fn expect_consumed(&self, function: &'static str) -> Result<()> {
        if self.remaining() != 0 {
            return Err(Error::desync(
                function,
                format!("{} unread bytes after decode", self.remaining()),
            ));
        }
        Ok(())
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    #[inline]
    fn ensure_remaining(&self, n: usize) -> Result<()> {
        if self.remaining() < n {
            Err(Error::BufferUnderflow {
                needed: n,
                available: self.remaining(),
            })
        } else {
            Ok(())
        }
    }

    #[inline]
    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.ensure_remaining(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    fn read_length(&mut self) -> Result<Option<usize>> {
        let len = self.read_i32()?;
        match len {
            -1 => Ok(None),
            n if n < 0 => Err(Error::InvalidLength(n)),
            n => Ok(Some(n as usize)),
        }
    }

    // =========================================================================
    // Fixed-width reads
    // =========================================================================

    /// Read a 4-byte big-endian signed integer
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.take::<4>()?))
    }

    /// Read an 8-byte big-endian signed integer
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.take::<8>()?))
    }

    /// Read a short, widened to four bytes on the wire
    pub fn read_short(&mut self) -> Result<i16> {
        let v = self.read_i32()?;
        i16::try_from(v).map_err(|_| Error::Protocol(format!("short out of range: {}", v)))
    }

    /// Read a boolean, widened to four bytes on the wire
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_i32()? != 0)
    }

    /// Read a 4-byte IEEE-754 float
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_be_bytes(self.take::<4>()?))
    }

    /// Read an 8-byte IEEE-754 double
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_be_bytes(self.take::<8>()?))
    }

    /// Read an object identifier (page, slot, volume)
    pub fn read_oid(&mut self) -> Result<Oid> {
        let page_id = self.read_i32()?;
        let slot_id = self.read_short()?;
        let vol_id = self.read_short()?;
        Ok(Oid::new(page_id, slot_id, vol_id))
    }

    // =========================================================================
    // Variable-length reads
    // =========================================================================

    /// Read raw bytes and return as a new Bytes (no padding handling)
    pub fn read_bytes_owned(&mut self, n: usize) -> Result<Bytes> {
        self.ensure_remaining(n)?;
        let bytes = self.data.slice(self.pos..self.pos + n);
        self.pos += n;
        Ok(bytes)
    }

    /// Read a length-prefixed byte array and its alignment padding
    ///
    /// Returns `None` for the null marker (length -1).
    pub fn read_bytes_with_length(&mut self) -> Result<Option<Bytes>> {
        let Some(len) = self.read_length()? else {
            return Ok(None);
        };
        let bytes = self.read_bytes_owned(len)?;
        self.skip(padding(len))?;
        Ok(Some(bytes))
    }

    /// Read the raw bytes of a packed string, without the terminator
    ///
    /// The length field covers the terminator and the padding; the content
    /// ends at the first NUL.
    pub fn read_string_bytes(&mut self) -> Result<Option<Bytes>> {
        let Some(len) = self.read_length()? else {
            return Ok(None);
        };
        if len == 0 || len % ALIGNMENT != 0 {
            return Err(Error::InvalidLength(len as i32));
        }
        let raw = self.read_bytes_owned(len)?;
        let end = raw.iter().position(|&b| b == 0).ok_or_else(|| {
            Error::Protocol("packed string is missing its terminator".to_string())
        })?;
        Ok(Some(raw.slice(..end)))
    }

    /// Read a packed UTF-8 string
    pub fn read_string(&mut self) -> Result<Option<String>> {
        match self.read_string_bytes()? {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|e| Error::Protocol(format!("invalid UTF-8 in string: {}", e))),
            None => Ok(None),
        }
    }

    /// Read a packed string that must not be null
    pub fn read_string_required(&mut self) -> Result<String> {
        self.read_string()?
            .ok_or_else(|| Error::Protocol("unexpected null string".to_string()))
    }

    /// Read a count field, rejecting negative values
    pub fn read_count(&mut self) -> Result<usize> {
        let n = self.read_i32()?;
        usize::try_from(n).map_err(|_| Error::InvalidLength(n))
    }
}

/// Number of zero bytes that follow `len` bytes to reach alignment
#[inline]
pub(crate) fn padding(len: usize) -> usize {
    (ALIGNMENT - len % ALIGNMENT) % ALIGNMENT
}

impl From<Bytes> for ReadBuffer {
    fn from(data: Bytes) -> Self {
        Self::new(data)
    }
}

impl From<Vec<u8>> for ReadBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}

impl From<&[u8]> for ReadBuffer {
    fn from(data: &[u8]) -> Self {
        Self::from_slice(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_i32_be() {
        let mut buf = ReadBuffer::from_slice(&[0x01, 0x02, 0x03, 0x04, 0xff, 0xff, 0xff, 0xff]);
        assert_eq!(buf.read_i32().unwrap(), 0x01020304);
        assert_eq!(buf.read_i32().unwrap(), -1);
        assert!(buf.read_i32().is_err());
    }

    #[test]
    fn test_read_i64_be() {
        let mut buf = ReadBuffer::from_slice(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);
        assert_eq!(buf.read_i64().unwrap(), 0x0102030405060708);
    }

    #[test]
    fn test_read_short_widened() {
        let mut buf = ReadBuffer::from_slice(&[0xff, 0xff, 0xff, 0xfe]);
        assert_eq!(buf.read_short().unwrap(), -2);

        let mut buf = ReadBuffer::from_slice(&[0x00, 0x01, 0x00, 0x00]);
        assert!(buf.read_short().is_err());
    }

    #[test]
    fn test_read_string_padded() {
        // "abc" + NUL = 4 bytes, no extra padding
        let mut buf = ReadBuffer::from_slice(&[0, 0, 0, 4, b'a', b'b', b'c', 0]);
        assert_eq!(buf.read_string().unwrap().unwrap(), "abc");
        assert_eq!(buf.remaining(), 0);

        // "abcd" + NUL = 5 bytes, padded to 8
        let mut buf =
            ReadBuffer::from_slice(&[0, 0, 0, 8, b'a', b'b', b'c', b'd', 0, 0, 0, 0]);
        assert_eq!(buf.read_string().unwrap().unwrap(), "abcd");
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_read_string_null_and_empty() {
        let mut buf = ReadBuffer::from_slice(&[0xff, 0xff, 0xff, 0xff, 0, 0, 0, 4, 0, 0, 0, 0]);
        assert!(buf.read_string().unwrap().is_none());
        assert_eq!(buf.read_string().unwrap().unwrap(), "");
    }

    #[test]
    fn test_read_string_unaligned_length_rejected() {
        let mut buf = ReadBuffer::from_slice(&[0, 0, 0, 3, b'a', b'b', 0]);
        assert!(matches!(buf.read_string(), Err(Error::InvalidLength(3))));
    }

    #[test]
    fn test_read_bytes_with_padding() {
        let mut buf = ReadBuffer::from_slice(&[0, 0, 0, 2, 0xaa, 0xbb, 0, 0, 0, 0, 0, 7]);
        let bytes = buf.read_bytes_with_length().unwrap().unwrap();
        assert_eq!(&bytes[..], &[0xaa, 0xbb]);
        assert_eq!(buf.read_i32().unwrap(), 7);
    }

    #[test]
    fn test_read_oid() {
        let mut buf = ReadBuffer::from_slice(&[0, 0, 1, 0, 0, 0, 0, 3, 0, 0, 0, 1]);
        let oid = buf.read_oid().unwrap();
        assert_eq!(oid.page_id(), 256);
        assert_eq!(oid.slot_id(), 3);
        assert_eq!(oid.vol_id(), 1);
    }

    #[test]
    fn test_expect_consumed() {
        let mut buf = ReadBuffer::from_slice(&[0, 0, 0, 1, 0, 0, 0, 2]);
        buf.read_i32().unwrap();
        assert!(matches!(
            buf.expect_consumed("fetch"),
            Err(Error::ProtocolDesync { function: "fetch", .. })
        ));
        buf.read_i32().unwrap();
        assert!(buf.expect_consumed("fetch").is_ok());
    }

    #[test]
    fn test_negative_count_rejected() {
        let mut buf = ReadBuffer::from_slice(&[0xff, 0xff, 0xff, 0xfd]);
        assert!(matches!(buf.read_count(), Err(Error::InvalidLength(-3))));
    }

    #[test]
    fn test_padding() {
        assert_eq!(padding(0), 0);
        assert_eq!(padding(1), 3);
        assert_eq!(padding(4), 0);
        assert_eq!(padding(6), 2);
    }
}
