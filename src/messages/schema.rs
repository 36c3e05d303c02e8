//! Schema information message

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::constants::{schema_flag, schema_type, FunctionCode};
use crate::error::{Error, Result};
use crate::statement::{ColumnInfo, HandleId};

use super::describe::parse_columns;
use super::Message;

/// Open a result describing part of the schema
#[derive(Debug, Clone)]
pub struct GetSchemaInfoMessage<'a> {
    schema_type: i32,
    arg1: Option<&'a str>,
    arg2: Option<&'a str>,
    flags: i32,
}

impl<'a> GetSchemaInfoMessage<'a> {
    /// Create a new schema info message
    pub fn new(schema_type: i32, arg1: Option<&'a str>, arg2: Option<&'a str>, flags: i32) -> Self {
        Self {
            schema_type,
            arg1,
            arg2,
            flags,
        }
    }

    /// Check the request type and pattern flags
    pub fn validate(&self) -> Result<()> {
        if !(schema_type::FIRST..=schema_type::LAST).contains(&self.schema_type) {
            return Err(Error::InvalidArgument(format!(
                "invalid schema info type: {}",
                self.schema_type
            )));
        }
        if !(schema_flag::NONE..=schema_flag::MAX).contains(&self.flags) {
            return Err(Error::InvalidArgument(format!(
                "invalid schema info flag: {}",
                self.flags
            )));
        }
        Ok(())
    }
}

/// Handle and description of a schema info result
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaInfoResponse {
    /// New statement handle
    pub handle: HandleId,
    /// Number of tuples in the result
    pub tuple_count: i32,
    /// Result columns
    pub columns: Vec<ColumnInfo>,
}

impl Message for GetSchemaInfoMessage<'_> {
    const FUNCTION: FunctionCode = FunctionCode::GetSchemaInfo;
    type Response = SchemaInfoResponse;

    fn encode(&self, buf: &mut WriteBuffer) -> Result<()> {
        self.validate()?;
        buf.write_i32(self.schema_type)?;
        buf.write_opt_string(self.arg1)?;
        buf.write_opt_string(self.arg2)?;
        buf.write_i32(self.flags)
    }

    fn parse_response(&self, buf: &mut ReadBuffer) -> Result<SchemaInfoResponse> {
        let handle = buf.read_i32()?;
        let tuple_count = buf.read_i32()?;
        let columns = parse_columns(buf)?;
        Ok(SchemaInfoResponse {
            handle,
            tuple_count,
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_range() {
        assert!(GetSchemaInfoMessage::new(schema_type::CLASS, None, None, 3).validate().is_ok());
        assert!(GetSchemaInfoMessage::new(schema_type::CLASS, None, None, 4).validate().is_err());
        assert!(GetSchemaInfoMessage::new(schema_type::CLASS, None, None, -1).validate().is_err());
    }

    #[test]
    fn test_type_range() {
        assert!(GetSchemaInfoMessage::new(0, None, None, 0).validate().is_err());
        assert!(GetSchemaInfoMessage::new(schema_type::LAST + 1, None, None, 0).validate().is_err());
    }

    #[test]
    fn test_encoding_with_null_args() {
        let msg = GetSchemaInfoMessage::new(schema_type::ATTRIBUTE, Some("t"), None, 0);
        let mut buf = WriteBuffer::new();
        msg.encode(&mut buf).unwrap();
        assert_eq!(
            buf.as_slice(),
            &[0, 0, 0, 4, 0, 0, 0, 4, b't', 0, 0, 0, 0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0]
        );
    }
}
