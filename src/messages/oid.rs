//! Get-by-OID message

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::constants::FunctionCode;
use crate::error::Result;
use crate::row::Row;
use crate::statement::{ColumnInfo, HandleId};
use crate::types::{Oid, Value};

use super::describe::parse_columns;
use super::Message;

/// Read attributes of a stored object
///
/// An empty attribute list asks for every attribute.
#[derive(Debug, Clone)]
pub struct GetByOidMessage<'a> {
    oid: &'a Oid,
    attributes: &'a [&'a str],
}

impl<'a> GetByOidMessage<'a> {
    /// Create a new get-by-OID message
    pub fn new(oid: &'a Oid, attributes: &'a [&'a str]) -> Self {
        Self { oid, attributes }
    }
}

/// The object's class, attribute columns and values
#[derive(Debug, Clone, PartialEq)]
pub struct GetByOidResponse {
    /// New statement handle over the single tuple
    pub handle: HandleId,
    /// Class of the object
    pub class_name: String,
    /// One column per attribute
    pub columns: Vec<ColumnInfo>,
    /// The attribute values
    pub row: Row,
}

impl Message for GetByOidMessage<'_> {
    const FUNCTION: FunctionCode = FunctionCode::OidGet;
    type Response = GetByOidResponse;

    fn encode(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.write_oid(self.oid)?;
        buf.write_i32(self.attributes.len() as i32)?;
        for name in self.attributes {
            buf.write_string(name)?;
        }
        Ok(())
    }

    fn parse_response(&self, buf: &mut ReadBuffer) -> Result<GetByOidResponse> {
        let handle = buf.read_i32()?;
        let class_name = buf.read_string()?.unwrap_or_default();
        let columns = parse_columns(buf)?;
        let values = (0..columns.len())
            .map(|_| Value::decode(buf))
            .collect::<Result<Vec<_>>>()?;
        Ok(GetByOidResponse {
            handle,
            class_name,
            row: Row::new(1, Some(self.oid.clone()), values),
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_by_oid_encoding() {
        let oid = Oid::new(7, 1, 0);
        let attrs = ["name"];
        let mut buf = WriteBuffer::new();
        GetByOidMessage::new(&oid, &attrs).encode(&mut buf).unwrap();

        let mut read = ReadBuffer::from_slice(buf.as_slice());
        assert_eq!(read.read_oid().unwrap(), oid);
        assert_eq!(read.read_i32().unwrap(), 1);
        assert_eq!(read.read_string().unwrap().unwrap(), "name");
        assert_eq!(read.remaining(), 0);
    }
}
