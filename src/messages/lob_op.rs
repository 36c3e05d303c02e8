//! LOB read message

use bytes::Bytes;

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::constants::FunctionCode;
use crate::error::{Error, Result};

use super::Message;

/// Read a slice of a large object
#[derive(Debug, Clone)]
pub struct LobReadMessage<'a> {
    locator: &'a str,
    offset: i64,
    length: i32,
}

impl<'a> LobReadMessage<'a> {
    /// Create a new read of `length` bytes starting at 0-based `offset`
    pub fn new(locator: &'a str, offset: i64, length: i32) -> Self {
        Self {
            locator,
            offset,
            length,
        }
    }
}

impl Message for LobReadMessage<'_> {
    const FUNCTION: FunctionCode = FunctionCode::LobRead;
    type Response = Bytes;

    fn encode(&self, buf: &mut WriteBuffer) -> Result<()> {
        if self.offset < 0 || self.length <= 0 {
            return Err(Error::InvalidArgument(format!(
                "invalid LOB read range: offset {} length {}",
                self.offset, self.length
            )));
        }
        buf.write_string(self.locator)?;
        buf.write_i64(self.offset)?;
        buf.write_i32(self.length)
    }

    fn parse_response(&self, buf: &mut ReadBuffer) -> Result<Bytes> {
        let data = buf.read_bytes_with_length()?.unwrap_or_default();
        if data.len() > self.length as usize {
            return Err(Error::desync(
                Self::FUNCTION.name(),
                format!("asked for {} bytes, got {}", self.length, data.len()),
            ));
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_range() {
        let mut buf = WriteBuffer::new();
        assert!(LobReadMessage::new("loc", -1, 10).encode(&mut buf).is_err());
        assert!(LobReadMessage::new("loc", 0, 0).encode(&mut buf).is_err());
    }

    #[test]
    fn test_oversized_reply_is_desync() {
        let msg = LobReadMessage::new("loc", 0, 2);
        let mut read = ReadBuffer::from_slice(&[0, 0, 0, 3, 1, 2, 3, 0]);
        assert!(matches!(
            msg.parse_response(&mut read),
            Err(Error::ProtocolDesync { .. })
        ));
    }
}
