//! Engine RPC messages
//!
//! One request type per callback function. Each knows its function code, how
//! to pack its arguments and how to unpack the success response. Framing,
//! error responses and the exact-consumption check live in the session.

mod close;
mod db_parameter;
mod describe;
mod execute;
mod fetch;
mod invoke;
mod lob_op;
mod next_result;
mod oid;
mod out_result_set;
mod prepare;
mod schema;

pub use close::{CloseReqHandleMessage, EndTransactionMessage};
pub use db_parameter::{DbParameters, GetDbParameterMessage, GetDbVersionMessage};
pub use describe::{parse_column_info, parse_columns, write_column_info, write_columns, FetchBlock};
pub use execute::{ExecuteMessage, ExecuteResponse};
pub use fetch::FetchMessage;
pub use invoke::{InvokeError, InvokeRequest, InvokeResult};
pub use lob_op::LobReadMessage;
pub use next_result::{NextResultMessage, NextResultResponse};
pub use oid::{GetByOidMessage, GetByOidResponse};
pub use out_result_set::{MakeOutResultSetMessage, OutResultSetResponse};
pub use prepare::{PrepareMessage, PrepareResponse};
pub use schema::{GetSchemaInfoMessage, SchemaInfoResponse};

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::constants::FunctionCode;
use crate::error::Result;

/// A callback request and the shape of its success response
pub trait Message: Sync {
    /// Function code sent in front of the arguments
    const FUNCTION: FunctionCode;

    /// Decoded success response
    type Response: Send;

    /// Pack the arguments (without the function code)
    fn encode(&self, buf: &mut WriteBuffer) -> Result<()>;

    /// Unpack the success response body (after the response code)
    fn parse_response(&self, buf: &mut ReadBuffer) -> Result<Self::Response>;
}
