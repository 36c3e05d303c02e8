//! Invocation request and reply frames
//!
//! The engine opens a conversation with an invoke request naming the
//! procedure and carrying its arguments. The runtime answers with either a
//! result frame or an error frame.

use bytes::Bytes;

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::constants::{invoke_error, DbType, RequestCode};
use crate::error::{Error, Result};
use crate::packet::Frame;
use crate::types::{Param, Value};

/// A procedure invocation sent by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeRequest {
    /// Procedure signature, `package.Class.method(argtypes)`
    pub signature: String,
    /// Arguments in declaration order
    pub args: Vec<Param>,
    /// Declared return type
    pub return_type: DbType,
}

impl InvokeRequest {
    /// Decode an invoke frame
    pub fn decode(frame: &Frame) -> Result<Self> {
        if frame.code != RequestCode::InvokeSp as i32 {
            return Err(Error::Protocol(format!(
                "expected invoke request, got code {}",
                frame.code
            )));
        }
        let mut buf = ReadBuffer::new(frame.body.clone());
        let signature = buf.read_string_required()?;
        let count = buf.read_count()?;
        let mut args = Vec::with_capacity(count.min(256));
        for _ in 0..count {
            args.push(Param::decode(&mut buf)?);
        }
        let return_type = DbType::try_from(buf.read_i32()?)?;
        buf.expect_consumed("invoke")?;
        Ok(Self {
            signature,
            args,
            return_type,
        })
    }

    /// Encode as an invoke frame
    pub fn to_frame(&self) -> Result<Frame> {
        let mut buf = WriteBuffer::new();
        buf.write_string(&self.signature)?;
        buf.write_i32(self.args.len() as i32)?;
        for arg in &self.args {
            arg.encode(&mut buf)?;
        }
        buf.write_i32(self.return_type as i32)?;
        Ok(Frame::new(RequestCode::InvokeSp as i32, buf.freeze()))
    }
}

/// Successful outcome of an invocation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InvokeResult {
    /// Return value
    pub value: Value,
    /// Final values of OUT and INOUT arguments, in argument order
    pub out_args: Vec<Value>,
}

impl InvokeResult {
    /// Create a result without OUT arguments
    pub fn new(value: Value) -> Self {
        Self {
            value,
            out_args: Vec::new(),
        }
    }

    /// Encode as a result frame
    pub fn to_frame(&self) -> Result<Frame> {
        let mut buf = WriteBuffer::new();
        self.value.encode(&mut buf)?;
        buf.write_i32(self.out_args.len() as i32)?;
        for value in &self.out_args {
            value.encode(&mut buf)?;
        }
        Ok(Frame::new(RequestCode::Result as i32, buf.freeze()))
    }

    /// Decode a result frame
    pub fn decode(frame: &Frame) -> Result<Self> {
        if frame.code != RequestCode::Result as i32 {
            return Err(Error::Protocol(format!(
                "expected invoke result, got code {}",
                frame.code
            )));
        }
        let mut buf = ReadBuffer::new(frame.body.clone());
        let value = Value::decode(&mut buf)?;
        let count = buf.read_count()?;
        let out_args = (0..count)
            .map(|_| Value::decode(&mut buf))
            .collect::<Result<Vec<_>>>()?;
        buf.expect_consumed("invoke_result")?;
        Ok(Self { value, out_args })
    }
}

/// Failed invocation as reported to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeError {
    /// One of the `invoke_error` kinds
    pub kind: i32,
    /// Human readable message
    pub message: String,
}

impl InvokeError {
    /// Classify a runtime error
    pub fn from_error(err: &Error) -> Self {
        let kind = match err {
            Error::NoSuchCompiledCode(_) | Error::InvalidSignature(_) => invoke_error::NO_SUCH_CODE,
            Error::InvalidArgument(_) | Error::TypeMismatch { .. } | Error::ValueConversion(_) => {
                invoke_error::ARGUMENT
            }
            e if e.is_connection_error() || e.is_session_fatal() => invoke_error::COMMUNICATION,
            _ => invoke_error::INTERNAL,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }

    /// Encode as an error frame
    pub fn to_frame(&self) -> Result<Frame> {
        let mut buf = WriteBuffer::new();
        buf.write_i32(self.kind)?;
        buf.write_string(&self.message)?;
        Ok(Frame::new(RequestCode::Error as i32, buf.freeze()))
    }

    /// Decode an error frame
    pub fn decode(body: Bytes) -> Result<Self> {
        let mut buf = ReadBuffer::new(body);
        let kind = buf.read_i32()?;
        let message = buf.read_string()?.unwrap_or_default();
        buf.expect_consumed("invoke_error")?;
        Ok(Self { kind, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoke_request_decode() {
        let req = InvokeRequest {
            signature: "com.acme.Proc.run(int)".to_string(),
            args: vec![Param::input(7)],
            return_type: DbType::String,
        };
        let frame = req.to_frame().unwrap();
        assert_eq!(InvokeRequest::decode(&frame).unwrap(), req);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let req = InvokeRequest {
            signature: "A.b()".to_string(),
            args: vec![],
            return_type: DbType::Null,
        };
        let frame = req.to_frame().unwrap();
        let mut body = frame.body.to_vec();
        body.extend_from_slice(&[0, 0, 0, 0]);
        let frame = Frame::new(frame.code, Bytes::from(body));
        assert!(matches!(
            InvokeRequest::decode(&frame),
            Err(Error::ProtocolDesync { .. })
        ));
    }

    #[test]
    fn test_error_classification() {
        let missing = InvokeError::from_error(&Error::NoSuchCompiledCode("X".into()));
        assert_eq!(missing.kind, invoke_error::NO_SUCH_CODE);
        assert_eq!(
            InvokeError::from_error(&Error::ConnectionClosed).kind,
            invoke_error::COMMUNICATION
        );
        assert_eq!(
            InvokeError::from_error(&Error::CodeLoad("bad".into())).kind,
            invoke_error::INTERNAL
        );

        let frame = missing.to_frame().unwrap();
        assert_eq!(frame.code, RequestCode::Error as i32);
        assert_eq!(InvokeError::decode(frame.body).unwrap(), missing);
    }
}
