//! Frame encoding/decoding
//!
//! Every message on the engine channel is a frame: a 4-byte big-endian
//! payload length followed by the payload. The first int of the payload is
//! the function code (requests) or the response code (responses).

use bytes::{BufMut, Bytes, BytesMut};

use crate::constants::FRAME_HEADER_SIZE;
use crate::error::{Error, Result};

/// A complete frame with its leading code split off
#[derive(Debug, Clone)]
pub struct Frame {
    /// Function code or response code
    pub code: i32,
    /// Remaining payload after the code
    pub body: Bytes,
}

impl Frame {
    /// Create a new frame from a code and body
    pub fn new(code: i32, body: Bytes) -> Self {
        Self { code, body }
    }

    /// Split a received payload into code and body
    pub fn from_payload(payload: Bytes) -> Result<Self> {
        if payload.len() < 4 {
            return Err(Error::BufferUnderflow {
                needed: 4,
                available: payload.len(),
            });
        }
        let code = i32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
        Ok(Self {
            code,
            body: payload.slice(4..),
        })
    }

    /// Payload size (code plus body)
    pub fn payload_len(&self) -> usize {
        4 + self.body.len()
    }

    /// Serialize the frame including its length prefix
    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(FRAME_HEADER_SIZE + self.payload_len());
        out.put_u32(self.payload_len() as u32);
        out.put_i32(self.code);
        out.extend_from_slice(&self.body);
        out.freeze()
    }
}

/// Validate a frame length prefix against the configured limit
pub fn parse_frame_length(header: [u8; FRAME_HEADER_SIZE], max_frame_size: usize) -> Result<usize> {
    let raw = i32::from_be_bytes(header);
    let size = usize::try_from(raw).map_err(|_| Error::InvalidLength(raw))?;
    if size > max_frame_size {
        return Err(Error::FrameTooLarge {
            size,
            limit: max_frame_size,
        });
    }
    Ok(size)
}
