//! Out result set message
//!
//! Opens a statement handle over a query result that a procedure returned
//! as an OUT value.

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::constants::{FunctionCode, StatementType};
use crate::error::Result;
use crate::statement::{ColumnInfo, HandleId};

use super::describe::parse_columns;
use super::Message;

/// Open a handle for an engine query id
#[derive(Debug, Clone, Copy)]
pub struct MakeOutResultSetMessage {
    query_id: i64,
}

impl MakeOutResultSetMessage {
    /// Create a new message for the given query id
    pub fn new(query_id: i64) -> Self {
        Self { query_id }
    }
}

/// Handle and description of the opened result
#[derive(Debug, Clone, PartialEq)]
pub struct OutResultSetResponse {
    /// New statement handle
    pub handle: HandleId,
    /// Statement type that produced the result
    pub statement_type: StatementType,
    /// Number of tuples in the result
    pub tuple_count: i32,
    /// Result columns
    pub columns: Vec<ColumnInfo>,
}

impl Message for MakeOutResultSetMessage {
    const FUNCTION: FunctionCode = FunctionCode::MakeOutRs;
    type Response = OutResultSetResponse;

    fn encode(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.write_i64(self.query_id)
    }

    fn parse_response(&self, buf: &mut ReadBuffer) -> Result<OutResultSetResponse> {
        let handle = buf.read_i32()?;
        let statement_type = StatementType::from_code(buf.read_i32()?);
        let tuple_count = buf.read_i32()?;
        let columns = parse_columns(buf)?;
        Ok(OutResultSetResponse {
            handle,
            statement_type,
            tuple_count,
            columns,
        })
    }
}
