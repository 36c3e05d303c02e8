//! Execute message
//!
//! Runs a prepared statement. The response describes the result, carries
//! the values of OUT and INOUT parameters and may piggyback the first block
//! of tuples.

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::constants::{FunctionCode, StatementType};
use crate::error::Result;
use crate::statement::{ColumnInfo, HandleId};
use crate::types::{Param, Value};

use super::describe::{parse_columns, FetchBlock};
use super::Message;

/// Execute a prepared statement
#[derive(Debug, Clone)]
pub struct ExecuteMessage<'a> {
    handle: HandleId,
    exec_flags: i32,
    max_field: i32,
    forward_only: bool,
    params: &'a [Param],
    /// Columns known from prepare, used when the response has none
    column_count: usize,
}

impl<'a> ExecuteMessage<'a> {
    /// Create a new execute message
    ///
    /// A negative `max_field` is sent as 0 (no limit).
    pub fn new(
        handle: HandleId,
        exec_flags: i32,
        max_field: i32,
        scrollable: bool,
        params: &'a [Param],
        column_count: usize,
    ) -> Self {
        Self {
            handle,
            exec_flags,
            max_field: max_field.max(0),
            forward_only: !scrollable,
            params,
            column_count,
        }
    }

    /// Normalized max field length
    pub fn max_field(&self) -> i32 {
        self.max_field
    }
}

/// Result of a successful execute
#[derive(Debug)]
pub struct ExecuteResponse {
    /// Affected rows, or tuple count for queries
    pub result_count: i32,
    /// Statement type of the first result
    pub statement_type: StatementType,
    /// Replacement column metadata, when the engine sends it
    pub columns: Option<Vec<ColumnInfo>>,
    /// Whether next_result has something to return
    pub has_more_results: bool,
    /// Engine query id of the result
    pub query_id: i64,
    /// OUT/INOUT values in parameter order, each decoded on its own
    pub out_values: Vec<Result<Value>>,
    /// First block of tuples, if the engine sent one
    pub fetch: Option<FetchBlock>,
}

impl Message for ExecuteMessage<'_> {
    const FUNCTION: FunctionCode = FunctionCode::Execute;
    type Response = ExecuteResponse;

    fn encode(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.write_i32(self.handle)?;
        buf.write_i32(self.exec_flags)?;
        buf.write_i32(self.max_field)?;
        buf.write_bool(self.forward_only)?;
        buf.write_i32(self.params.len() as i32)?;
        for param in self.params {
            param.encode(buf)?;
        }
        Ok(())
    }

    fn parse_response(&self, buf: &mut ReadBuffer) -> Result<ExecuteResponse> {
        let result_count = buf.read_i32()?;
        let statement_type = StatementType::from_code(buf.read_i32()?);
        let columns = if buf.read_bool()? {
            Some(parse_columns(buf)?)
        } else {
            None
        };
        let has_more_results = buf.read_bool()?;
        let query_id = buf.read_i64()?;

        let out_count = buf.read_count()?;
        let mut out_values = Vec::with_capacity(out_count.min(256));
        for _ in 0..out_count {
            out_values.push(Value::decode_checked(buf)?);
        }

        let fetch = if buf.read_bool()? {
            let column_count = columns.as_ref().map_or(self.column_count, Vec::len);
            Some(FetchBlock::parse(buf, column_count)?)
        } else {
            None
        };

        Ok(ExecuteResponse {
            result_count,
            statement_type,
            columns,
            has_more_results,
            query_id,
            out_values,
            fetch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{stmt_code, DbType};
    use crate::error::Error;

    #[test]
    fn test_negative_max_field_sent_as_zero() {
        let msg = ExecuteMessage::new(1, 0, -5, false, &[], 0);
        assert_eq!(msg.max_field(), 0);

        let mut buf = WriteBuffer::new();
        msg.encode(&mut buf).unwrap();
        assert_eq!(
            buf.as_slice(),
            &[0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_out_value_error_is_local() {
        let mut buf = WriteBuffer::new();
        buf.write_i32(1).unwrap(); // result count
        buf.write_i32(stmt_code::CALL).unwrap();
        buf.write_bool(false).unwrap(); // no columns
        buf.write_bool(false).unwrap(); // no more results
        buf.write_i64(0).unwrap();
        buf.write_i32(2).unwrap(); // two out values
        buf.write_i32(DbType::Date as i32).unwrap();
        for part in [2024, 2, 30] {
            buf.write_i32(part).unwrap();
        }
        Value::from("ok").encode(&mut buf).unwrap();
        buf.write_bool(false).unwrap(); // no rows

        let params = [Param::output(DbType::Date), Param::output(DbType::String)];
        let msg = ExecuteMessage::new(1, 0, 0, false, &params, 0);
        let mut read = ReadBuffer::from_slice(buf.as_slice());
        let resp = msg.parse_response(&mut read).unwrap();
        assert_eq!(resp.statement_type, StatementType::Call);
        assert!(matches!(resp.out_values[0], Err(Error::ValueConversion(_))));
        assert_eq!(resp.out_values[1].as_ref().unwrap(), &Value::from("ok"));
        assert!(read.expect_consumed("execute").is_ok());
    }
}
