//! Session parameter and version queries

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::constants::FunctionCode;
use crate::error::Result;

use super::Message;

/// Parameters of the engine session the procedure runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbParameters {
    /// Transaction isolation level
    pub isolation_level: i32,
    /// Lock timeout in milliseconds (-1 = wait forever)
    pub lock_timeout: i32,
    /// Largest string the engine will return
    pub max_string_length: i32,
}

/// Read the current session parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct GetDbParameterMessage;

impl Message for GetDbParameterMessage {
    const FUNCTION: FunctionCode = FunctionCode::GetDbParameter;
    type Response = DbParameters;

    fn encode(&self, _buf: &mut WriteBuffer) -> Result<()> {
        Ok(())
    }

    fn parse_response(&self, buf: &mut ReadBuffer) -> Result<DbParameters> {
        Ok(DbParameters {
            isolation_level: buf.read_i32()?,
            lock_timeout: buf.read_i32()?,
            max_string_length: buf.read_i32()?,
        })
    }
}

/// Read the engine version string
#[derive(Debug, Clone, Copy, Default)]
pub struct GetDbVersionMessage;

impl Message for GetDbVersionMessage {
    const FUNCTION: FunctionCode = FunctionCode::GetDbVersion;
    type Response = String;

    fn encode(&self, _buf: &mut WriteBuffer) -> Result<()> {
        Ok(())
    }

    fn parse_response(&self, buf: &mut ReadBuffer) -> Result<String> {
        buf.read_string_required()
    }
}
