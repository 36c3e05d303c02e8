//! Handle release and transaction end messages

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::constants::{end_tran, FunctionCode};
use crate::error::Result;
use crate::statement::HandleId;

use super::Message;

/// Release an engine statement handle
#[derive(Debug, Clone, Copy)]
pub struct CloseReqHandleMessage {
    handle: HandleId,
}

impl CloseReqHandleMessage {
    /// Create a new close message
    pub fn new(handle: HandleId) -> Self {
        Self { handle }
    }
}

impl Message for CloseReqHandleMessage {
    const FUNCTION: FunctionCode = FunctionCode::CloseReqHandle;
    type Response = ();

    fn encode(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.write_i32(self.handle)
    }

    fn parse_response(&self, _buf: &mut ReadBuffer) -> Result<()> {
        Ok(())
    }
}

/// Commit or roll back the engine transaction
#[derive(Debug, Clone, Copy)]
pub struct EndTransactionMessage {
    commit: bool,
}

impl EndTransactionMessage {
    /// Create a commit message
    pub fn commit() -> Self {
        Self { commit: true }
    }

    /// Create a rollback message
    pub fn rollback() -> Self {
        Self { commit: false }
    }
}

impl Message for EndTransactionMessage {
    const FUNCTION: FunctionCode = FunctionCode::EndTransaction;
    type Response = ();

    fn encode(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.write_i32(if self.commit {
            end_tran::COMMIT
        } else {
            end_tran::ROLLBACK
        })
    }

    fn parse_response(&self, _buf: &mut ReadBuffer) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_encoding() {
        let mut buf = WriteBuffer::new();
        CloseReqHandleMessage::new(12).encode(&mut buf).unwrap();
        assert_eq!(buf.as_slice(), &[0, 0, 0, 12]);
    }

    #[test]
    fn test_end_transaction_encoding() {
        let mut buf = WriteBuffer::new();
        EndTransactionMessage::rollback().encode(&mut buf).unwrap();
        assert_eq!(buf.as_slice(), &[0, 0, 0, 2]);
    }
}
