//! Next-result message for multi-result executes

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::constants::{FunctionCode, StatementType};
use crate::error::Result;
use crate::statement::{ColumnInfo, HandleId};

use super::describe::parse_columns;
use super::Message;

/// Move a handle to its next result
#[derive(Debug, Clone, Copy)]
pub struct NextResultMessage {
    handle: HandleId,
}

impl NextResultMessage {
    /// Create a new next-result message
    pub fn new(handle: HandleId) -> Self {
        Self { handle }
    }
}

/// Description of the result the handle moved to
#[derive(Debug, Clone, PartialEq)]
pub struct NextResultResponse {
    /// Affected rows, or tuple count for queries
    pub result_count: i32,
    /// Statement type of this result
    pub statement_type: StatementType,
    /// Whether the result is updatable
    pub updatable: bool,
    /// Result columns
    pub columns: Vec<ColumnInfo>,
    /// Whether yet another result follows
    pub has_more_results: bool,
}

impl Message for NextResultMessage {
    const FUNCTION: FunctionCode = FunctionCode::NextResult;
    type Response = NextResultResponse;

    fn encode(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.write_i32(self.handle)
    }

    fn parse_response(&self, buf: &mut ReadBuffer) -> Result<NextResultResponse> {
        let result_count = buf.read_i32()?;
        let statement_type = StatementType::from_code(buf.read_i32()?);
        let updatable = buf.read_bool()?;
        let columns = parse_columns(buf)?;
        let has_more_results = buf.read_bool()?;
        Ok(NextResultResponse {
            result_count,
            statement_type,
            updatable,
            columns,
            has_more_results,
        })
    }
}
