//! Fetch message for retrieving tuples from an executed handle

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::constants::FunctionCode;
use crate::error::Result;
use crate::statement::HandleId;

use super::describe::FetchBlock;
use super::Message;

/// Fetch a block of tuples starting at a 1-based cursor index
#[derive(Debug, Clone, Copy)]
pub struct FetchMessage {
    handle: HandleId,
    cursor_index: i32,
    fetch_size: i32,
    fetch_flags: i32,
    column_count: usize,
}

impl FetchMessage {
    /// Create a new fetch message
    pub fn new(
        handle: HandleId,
        cursor_index: i32,
        fetch_size: i32,
        fetch_flags: i32,
        column_count: usize,
    ) -> Self {
        Self {
            handle,
            cursor_index,
            fetch_size,
            fetch_flags,
            column_count,
        }
    }

    /// Get the handle id
    pub fn handle(&self) -> HandleId {
        self.handle
    }

    /// Get the number of tuples requested
    pub fn fetch_size(&self) -> i32 {
        self.fetch_size
    }
}

impl Message for FetchMessage {
    const FUNCTION: FunctionCode = FunctionCode::Fetch;
    type Response = FetchBlock;

    fn encode(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.write_i32(self.handle)?;
        buf.write_i32(self.cursor_index)?;
        buf.write_i32(self.fetch_size)?;
        buf.write_i32(self.fetch_flags)
    }

    fn parse_response(&self, buf: &mut ReadBuffer) -> Result<FetchBlock> {
        FetchBlock::parse(buf, self.column_count)
    }
}
