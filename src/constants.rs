//! Engine RPC protocol constants
//!
//! Request codes, callback function codes, database type tags and flag
//! values used on the channel between the engine and the runtime.

use crate::error::Error;

/// Version of the byte layout implemented by this crate
///
/// Each function's argument order and encoding is pinned to this version;
/// changing a layout means bumping it.
pub const PROTOCOL_VERSION: u32 = 1;

/// Size of the frame length prefix
pub const FRAME_HEADER_SIZE: usize = 4;

/// Packed items are aligned to this boundary
pub const ALIGNMENT: usize = 4;

// =============================================================================
// Request Codes
// =============================================================================

/// Top-level request codes exchanged with the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum RequestCode {
    /// Engine asks the runtime to invoke a procedure
    InvokeSp = 0x01,
    /// Runtime returns the invocation result
    Result = 0x02,
    /// Runtime reports an invocation error
    Error = 0x04,
    /// Runtime issues a server-side SQL callback
    InternalJdbc = 0x08,
    /// Engine tears down the invocation
    Destroy = 0x10,
    /// Engine signals the end of a conversation
    End = 0x20,
}

impl TryFrom<i32> for RequestCode {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Error> {
        match value {
            0x01 => Ok(RequestCode::InvokeSp),
            0x02 => Ok(RequestCode::Result),
            0x04 => Ok(RequestCode::Error),
            0x08 => Ok(RequestCode::InternalJdbc),
            0x10 => Ok(RequestCode::Destroy),
            0x20 => Ok(RequestCode::End),
            _ => Err(Error::UnknownFunctionCode(value)),
        }
    }
}

// =============================================================================
// Function Codes
// =============================================================================

/// Callback function codes for server-side SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum FunctionCode {
    /// Commit or roll back the current transaction
    EndTransaction = 1,
    /// Prepare a SQL statement
    Prepare = 2,
    /// Execute a prepared statement
    Execute = 3,
    /// Read session parameters
    GetDbParameter = 4,
    /// Release a statement handle
    CloseReqHandle = 6,
    /// Fetch a block of tuples
    Fetch = 8,
    /// Open a schema information result
    GetSchemaInfo = 9,
    /// Read attributes of an object by OID
    OidGet = 10,
    /// Read the engine version string
    GetDbVersion = 15,
    /// Advance to the next result of a multi-result execute
    NextResult = 19,
    /// Open a result set from a query id returned as an OUT value
    MakeOutRs = 33,
    /// Read a slice of a large object
    LobRead = 37,
}

impl FunctionCode {
    /// Name used in logs and errors
    pub fn name(self) -> &'static str {
        match self {
            FunctionCode::EndTransaction => "end_transaction",
            FunctionCode::Prepare => "prepare",
            FunctionCode::Execute => "execute",
            FunctionCode::GetDbParameter => "get_db_parameter",
            FunctionCode::CloseReqHandle => "close_req_handle",
            FunctionCode::Fetch => "fetch",
            FunctionCode::GetSchemaInfo => "get_schema_info",
            FunctionCode::OidGet => "get_by_oid",
            FunctionCode::GetDbVersion => "get_db_version",
            FunctionCode::NextResult => "next_result",
            FunctionCode::MakeOutRs => "make_out_result_set",
            FunctionCode::LobRead => "lob_read",
        }
    }
}

impl TryFrom<i32> for FunctionCode {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(FunctionCode::EndTransaction),
            2 => Ok(FunctionCode::Prepare),
            3 => Ok(FunctionCode::Execute),
            4 => Ok(FunctionCode::GetDbParameter),
            6 => Ok(FunctionCode::CloseReqHandle),
            8 => Ok(FunctionCode::Fetch),
            9 => Ok(FunctionCode::GetSchemaInfo),
            10 => Ok(FunctionCode::OidGet),
            15 => Ok(FunctionCode::GetDbVersion),
            19 => Ok(FunctionCode::NextResult),
            33 => Ok(FunctionCode::MakeOutRs),
            37 => Ok(FunctionCode::LobRead),
            _ => Err(Error::UnknownFunctionCode(value)),
        }
    }
}

// =============================================================================
// Response Codes
// =============================================================================

/// Response status codes (first int of every response payload)
#[allow(missing_docs)]
pub mod response {
    pub const SUCCESS: i32 = 0;
    pub const ERROR: i32 = 1;
}

// =============================================================================
// Database Types
// =============================================================================

/// Database type tags carried in front of every packed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
#[allow(missing_docs)]
pub enum DbType {
    Null = 0,
    Int = 1,
    Float = 2,
    Double = 3,
    String = 4,
    Object = 5,
    Set = 6,
    Multiset = 7,
    Sequence = 8,
    Time = 10,
    Timestamp = 11,
    Date = 12,
    Monetary = 13,
    Short = 18,
    Numeric = 22,
    Bit = 23,
    VarBit = 24,
    Char = 25,
    ResultSet = 28,
    BigInt = 31,
    Datetime = 32,
    Blob = 33,
    Clob = 34,
}

impl DbType {
    /// Whether values of this type are collections of nested values
    pub fn is_collection(self) -> bool {
        matches!(self, DbType::Set | DbType::Multiset | DbType::Sequence)
    }
}

impl TryFrom<i32> for DbType {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DbType::Null),
            1 => Ok(DbType::Int),
            2 => Ok(DbType::Float),
            3 => Ok(DbType::Double),
            4 => Ok(DbType::String),
            5 => Ok(DbType::Object),
            6 => Ok(DbType::Set),
            7 => Ok(DbType::Multiset),
            8 => Ok(DbType::Sequence),
            10 => Ok(DbType::Time),
            11 => Ok(DbType::Timestamp),
            12 => Ok(DbType::Date),
            13 => Ok(DbType::Monetary),
            18 => Ok(DbType::Short),
            22 => Ok(DbType::Numeric),
            23 => Ok(DbType::Bit),
            24 => Ok(DbType::VarBit),
            25 => Ok(DbType::Char),
            28 => Ok(DbType::ResultSet),
            31 => Ok(DbType::BigInt),
            32 => Ok(DbType::Datetime),
            33 => Ok(DbType::Blob),
            34 => Ok(DbType::Clob),
            _ => Err(Error::UnknownDbType(value)),
        }
    }
}

// =============================================================================
// Parameter Modes
// =============================================================================

/// Direction of a procedure or statement parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ParamMode {
    /// Input only
    #[default]
    In = 1,
    /// Output only
    Out = 2,
    /// Input and output
    InOut = 3,
}

impl ParamMode {
    /// Whether the engine sends a value back for this parameter
    pub fn is_output(self) -> bool {
        matches!(self, ParamMode::Out | ParamMode::InOut)
    }
}

impl TryFrom<i32> for ParamMode {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ParamMode::In),
            2 => Ok(ParamMode::Out),
            3 => Ok(ParamMode::InOut),
            _ => Err(Error::Protocol(format!("invalid parameter mode: {}", value))),
        }
    }
}

// =============================================================================
// Statement Types
// =============================================================================

/// Statement type reported by the engine after prepare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatementType {
    /// INSERT
    Insert,
    /// SELECT
    Select,
    /// UPDATE
    Update,
    /// DELETE
    Delete,
    /// CALL of a method or procedure
    Call,
    /// Anything else, with the raw engine code
    #[default]
    Other,
}

impl StatementType {
    /// Map the engine's statement code
    pub fn from_code(code: i32) -> Self {
        match code {
            stmt_code::INSERT => StatementType::Insert,
            stmt_code::SELECT => StatementType::Select,
            stmt_code::UPDATE => StatementType::Update,
            stmt_code::DELETE => StatementType::Delete,
            stmt_code::CALL => StatementType::Call,
            _ => StatementType::Other,
        }
    }

    /// Whether this statement produces tuples
    pub fn is_query(self) -> bool {
        matches!(self, StatementType::Select | StatementType::Call)
    }
}

/// Raw engine statement codes
#[allow(missing_docs)]
pub mod stmt_code {
    pub const INSERT: i32 = 20;
    pub const SELECT: i32 = 21;
    pub const UPDATE: i32 = 22;
    pub const DELETE: i32 = 23;
    pub const CALL: i32 = 24;
}

// =============================================================================
// Flags
// =============================================================================

/// Prepare flags
#[allow(missing_docs)]
pub mod prepare_flag {
    pub const INCLUDE_OID: i32 = 0x01;
    pub const UPDATABLE: i32 = 0x02;
    pub const HOLDABLE: i32 = 0x08;
    pub const CALL: i32 = 0x40;
}

/// Execute flags
#[allow(missing_docs)]
pub mod exec_flag {
    pub const ASYNC: i32 = 0x01;
    pub const QUERY_ALL: i32 = 0x02;
    pub const QUERY_INFO: i32 = 0x04;
    pub const ONLY_QUERY_PLAN: i32 = 0x08;
    pub const HOLDABLE_RESULT: i32 = 0x20;
}

/// End-of-transaction commands
#[allow(missing_docs)]
pub mod end_tran {
    pub const COMMIT: i32 = 1;
    pub const ROLLBACK: i32 = 2;
}

/// Schema information request types
#[allow(missing_docs)]
pub mod schema_type {
    pub const CLASS: i32 = 1;
    pub const VCLASS: i32 = 2;
    pub const QUERY_SPEC: i32 = 3;
    pub const ATTRIBUTE: i32 = 4;
    pub const CLASS_ATTRIBUTE: i32 = 5;
    pub const METHOD: i32 = 6;
    pub const CLASS_METHOD: i32 = 7;
    pub const METHOD_FILE: i32 = 8;
    pub const SUPERCLASS: i32 = 9;
    pub const SUBCLASS: i32 = 10;
    pub const CONSTRAINT: i32 = 11;
    pub const TRIGGER: i32 = 12;
    pub const CLASS_PRIVILEGE: i32 = 13;
    pub const ATTR_PRIVILEGE: i32 = 14;
    pub const DIRECT_SUPER_CLASS: i32 = 15;
    pub const PRIMARY_KEY: i32 = 16;
    pub const IMPORTED_KEYS: i32 = 17;
    pub const EXPORTED_KEYS: i32 = 18;
    pub const CROSS_REFERENCE: i32 = 19;

    pub const FIRST: i32 = CLASS;
    pub const LAST: i32 = CROSS_REFERENCE;
}

/// Schema information pattern-match flags
#[allow(missing_docs)]
pub mod schema_flag {
    pub const NONE: i32 = 0;
    pub const CLASS_NAME_PATTERN: i32 = 1;
    pub const ATTR_NAME_PATTERN: i32 = 2;
    pub const MAX: i32 = CLASS_NAME_PATTERN | ATTR_NAME_PATTERN;
}

/// Error kinds reported back to the engine for a failed invocation
#[allow(missing_docs)]
pub mod invoke_error {
    pub const INTERNAL: i32 = -1;
    pub const NO_SUCH_CODE: i32 = -2;
    pub const COMMUNICATION: i32 = -3;
    pub const ARGUMENT: i32 = -4;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_type_roundtrip() {
        for tag in [0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 11, 12, 13, 18, 22, 25, 28, 31, 32] {
            let ty = DbType::try_from(tag).unwrap();
            assert_eq!(ty as i32, tag);
        }
    }

    #[test]
    fn test_unknown_db_type() {
        assert!(matches!(DbType::try_from(9), Err(Error::UnknownDbType(9))));
    }

    #[test]
    fn test_request_code_values() {
        assert_eq!(RequestCode::try_from(0x04).unwrap(), RequestCode::Error);
        assert_eq!(RequestCode::try_from(0x20).unwrap(), RequestCode::End);
        assert!(matches!(
            RequestCode::try_from(0x03),
            Err(Error::UnknownFunctionCode(3))
        ));
    }

    #[test]
    fn test_function_code_values() {
        assert_eq!(FunctionCode::Prepare as i32, 2);
        assert_eq!(FunctionCode::NextResult as i32, 19);
        assert_eq!(FunctionCode::try_from(10).unwrap(), FunctionCode::OidGet);
        assert!(FunctionCode::try_from(99).is_err());
    }

    #[test]
    fn test_statement_type_mapping() {
        assert_eq!(StatementType::from_code(21), StatementType::Select);
        assert!(StatementType::from_code(24).is_query());
        assert_eq!(StatementType::from_code(4), StatementType::Other);
    }

    #[test]
    fn test_param_mode() {
        assert!(ParamMode::try_from(3).unwrap().is_output());
        assert!(!ParamMode::In.is_output());
        assert!(ParamMode::try_from(0).is_err());
    }
}
