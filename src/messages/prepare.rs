//! Prepare message

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::constants::{FunctionCode, StatementType};
use crate::error::{Error, Result};
use crate::statement::{ColumnInfo, HandleId};

use super::describe::parse_columns;
use super::Message;

/// Prepare a SQL statement on the engine
#[derive(Debug, Clone)]
pub struct PrepareMessage<'a> {
    sql: &'a str,
    flags: i32,
    recompile: bool,
}

impl<'a> PrepareMessage<'a> {
    /// Create a new prepare message
    pub fn new(sql: &'a str, flags: i32) -> Self {
        Self {
            sql,
            flags,
            recompile: false,
        }
    }

    /// Ask the engine to discard any cached plan for this SQL
    pub fn recompile(mut self, recompile: bool) -> Self {
        self.recompile = recompile;
        self
    }
}

/// Result of a successful prepare
#[derive(Debug, Clone, PartialEq)]
pub struct PrepareResponse {
    /// New statement handle
    pub handle: HandleId,
    /// Statement type
    pub statement_type: StatementType,
    /// Number of bind markers
    pub bind_count: usize,
    /// Result columns (empty for non-queries)
    pub columns: Vec<ColumnInfo>,
}

impl Message for PrepareMessage<'_> {
    const FUNCTION: FunctionCode = FunctionCode::Prepare;
    type Response = PrepareResponse;

    fn encode(&self, buf: &mut WriteBuffer) -> Result<()> {
        if self.sql.trim().is_empty() {
            return Err(Error::InvalidArgument("empty SQL text".to_string()));
        }
        buf.write_string(self.sql)?;
        buf.write_i32(self.flags)?;
        buf.write_bool(self.recompile)
    }

    fn parse_response(&self, buf: &mut ReadBuffer) -> Result<PrepareResponse> {
        let handle = buf.read_i32()?;
        let statement_type = StatementType::from_code(buf.read_i32()?);
        let bind_count = buf.read_count()?;
        let columns = parse_columns(buf)?;
        Ok(PrepareResponse {
            handle,
            statement_type,
            bind_count,
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::prepare_flag;

    #[test]
    fn test_prepare_encoding() {
        let msg = PrepareMessage::new("SELECT 1", prepare_flag::CALL).recompile(true);
        let mut buf = WriteBuffer::new();
        msg.encode(&mut buf).unwrap();

        let mut read = ReadBuffer::from_slice(buf.as_slice());
        assert_eq!(read.read_string().unwrap().unwrap(), "SELECT 1");
        assert_eq!(read.read_i32().unwrap(), prepare_flag::CALL);
        assert!(read.read_bool().unwrap());
        assert_eq!(read.remaining(), 0);
    }

    #[test]
    fn test_empty_sql_rejected() {
        let mut buf = WriteBuffer::new();
        assert!(PrepareMessage::new("  ", 0).encode(&mut buf).is_err());
    }
}
