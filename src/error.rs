//! Error types for the stored procedure runtime
//!
//! This module defines every error that can surface from the runtime, from
//! low-level wire desynchronization up to catalog and class loading faults.

use std::io;
use thiserror::Error;

use crate::statement::HandleState;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the runtime
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// General protocol error
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Response payload was not consumed exactly by the decoder
    #[error("protocol desync on {function}: {detail}")]
    ProtocolDesync { function: &'static str, detail: String },

    /// Unknown request or function code on the wire
    #[error("unknown function code: {0}")]
    UnknownFunctionCode(i32),

    /// Unknown database type tag on the wire
    #[error("unknown database type tag: {0}")]
    UnknownDbType(i32),

    /// Frame length exceeds the configured maximum
    #[error("frame too large: {size} bytes exceeds limit of {limit}")]
    FrameTooLarge { size: usize, limit: usize },

    // =========================================================================
    // Buffer Errors
    // =========================================================================
    /// Buffer underflow - not enough data to read
    #[error("buffer underflow: need {needed} bytes but only {available} available")]
    BufferUnderflow { needed: usize, available: usize },

    /// Buffer overflow - not enough space to write
    #[error("buffer overflow: need {needed} bytes but only {available} available")]
    BufferOverflow { needed: usize, available: usize },

    /// Invalid length field
    #[error("invalid length field: {0}")]
    InvalidLength(i32),

    // =========================================================================
    // Connection Errors
    // =========================================================================
    /// Underlying I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Connection closed unexpectedly
    #[error("connection closed unexpectedly")]
    ConnectionClosed,

    /// Connection timeout
    #[error("connection timeout after {0:?}")]
    ConnectionTimeout(std::time::Duration),

    /// The session hit a fatal error earlier and can no longer be used
    #[error("session is broken and can no longer be used")]
    SessionBroken,

    /// The session was closed by the caller
    #[error("session is closed")]
    SessionClosed,

    // =========================================================================
    // Server Errors
    // =========================================================================
    /// Error reported by the engine in an error response
    #[error("server error ({code}): {message}")]
    Server { code: i32, message: String },

    // =========================================================================
    // Statement Errors
    // =========================================================================
    /// Handle id not known to this session
    #[error("unknown statement handle: {0}")]
    UnknownHandle(i32),

    /// Operation not allowed in the handle's current state
    #[error("cannot {operation} handle {handle} in state {state:?}")]
    InvalidHandleState {
        handle: i32,
        state: HandleState,
        operation: &'static str,
    },

    /// next_result called although the engine reported no further results
    #[error("no more results on handle {0}")]
    NoMoreResults(i32),

    /// Column index outside 1..=count
    #[error("column index {index} out of range (1..={count})")]
    ColumnIndexOutOfRange { index: usize, count: usize },

    /// Invalid argument passed to an operation
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // =========================================================================
    // Value Errors
    // =========================================================================
    /// Projection between incompatible value kinds
    #[error("type mismatch: cannot convert {from} to {to}")]
    TypeMismatch { from: &'static str, to: &'static str },

    /// Compatible kinds, but the value does not fit or parse
    #[error("value conversion error: {0}")]
    ValueConversion(String),

    /// NULL value encountered where not expected
    #[error("unexpected NULL value")]
    UnexpectedNull,

    // =========================================================================
    // Code Errors
    // =========================================================================
    /// No compiled code registered under this name
    #[error("no such compiled code: {0}")]
    NoSuchCompiledCode(String),

    /// Catalog query failed
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Archive or class payload could not be loaded
    #[error("code load error: {0}")]
    CodeLoad(String),

    /// Archive format error
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Stored code is not valid base64
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Procedure signature could not be parsed
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a new server error
    pub fn server(code: i32, message: impl Into<String>) -> Self {
        Error::Server {
            code,
            message: message.into(),
        }
    }

    /// Create a desync error for the named function
    pub fn desync(function: &'static str, detail: impl Into<String>) -> Self {
        Error::ProtocolDesync {
            function,
            detail: detail.into(),
        }
    }

    /// Check if this error leaves the session unusable
    ///
    /// Channel failures and decode mismatches mean the byte stream can no
    /// longer be trusted, so nothing after them may be read.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::ConnectionClosed
                | Error::ConnectionTimeout(_)
                | Error::ProtocolDesync { .. }
                | Error::BufferUnderflow { .. }
                | Error::FrameTooLarge { .. }
                | Error::UnknownDbType(_)
                | Error::Protocol(_)
                | Error::InvalidLength(_)
        )
    }

    /// Check if this is a value projection error, scoped to one value
    pub fn is_value_error(&self) -> bool {
        matches!(
            self,
            Error::TypeMismatch { .. } | Error::ValueConversion(_) | Error::UnexpectedNull
        )
    }

    /// Check if this is a "no such compiled code" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NoSuchCompiledCode(_))
    }

    /// Check if this is a connection-related error
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Error::ConnectionClosed
                | Error::ConnectionTimeout(_)
                | Error::Io(_)
                | Error::SessionBroken
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let err = Error::server(-493, "syntax error");
        assert_eq!(err.to_string(), "server error (-493): syntax error");
    }

    #[test]
    fn test_session_fatal() {
        assert!(Error::desync("fetch", "4 trailing bytes").is_session_fatal());
        assert!(Error::ConnectionClosed.is_session_fatal());
        assert!(Error::BufferUnderflow {
            needed: 4,
            available: 0
        }
        .is_session_fatal());
        assert!(!Error::server(1, "x").is_session_fatal());
        assert!(!Error::UnexpectedNull.is_session_fatal());
        assert!(!Error::UnknownHandle(3).is_session_fatal());
    }

    #[test]
    fn test_value_errors() {
        assert!(Error::TypeMismatch {
            from: "Date",
            to: "i32"
        }
        .is_value_error());
        assert!(Error::UnexpectedNull.is_value_error());
        assert!(!Error::SessionBroken.is_value_error());
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::NoSuchCompiledCode("MY_PROC".into()).is_not_found());
        assert!(!Error::Catalog("x".into()).is_not_found());
    }

    #[test]
    fn test_invalid_state_display() {
        let err = Error::InvalidHandleState {
            handle: 7,
            state: HandleState::Closed,
            operation: "fetch",
        };
        assert_eq!(err.to_string(), "cannot fetch handle 7 in state Closed");
    }
}
