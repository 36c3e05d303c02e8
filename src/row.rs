//! Fetched tuples
//!
//! A [`Row`] holds one tuple of a result: its position in the result, the
//! OID of the source object when the engine sends one, and one [`Value`]
//! per column. Column access is 1-based, like the engine's own numbering.
//!
//! # Example
//!
//! ```rust
//! use pl_runtime::{Row, Value};
//!
//! let row = Row::new(1, None, vec![Value::Int(7), Value::from("seven")]);
//! assert_eq!(row.get(1).unwrap().to_i32().unwrap(), 7);
//! assert_eq!(row.get_string(2).unwrap(), "seven");
//! assert!(row.get(3).is_err());
//! ```

use crate::buffer::ReadBuffer;
use crate::error::{Error, Result};
use crate::types::{Oid, Value};

/// A single tuple
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// 1-based position of the tuple in its result
    index: i32,
    /// Source object, when available
    oid: Option<Oid>,
    /// Column values
    values: Vec<Value>,
}

impl Row {
    /// Create a new row
    pub fn new(index: i32, oid: Option<Oid>, values: Vec<Value>) -> Self {
        Self { index, oid, values }
    }

    /// Decode a tuple: int index, OID, then one tagged value per column
    pub fn decode(buf: &mut ReadBuffer, column_count: usize) -> Result<Self> {
        let index = buf.read_i32()?;
        let oid = buf.read_oid()?;
        let oid = if oid.is_null() { None } else { Some(oid) };
        let values = (0..column_count)
            .map(|_| Value::decode(buf))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { index, oid, values })
    }

    /// Position of the tuple in its result
    pub fn index(&self) -> i32 {
        self.index
    }

    /// Source object of the tuple
    pub fn oid(&self) -> Option<&Oid> {
        self.oid.as_ref()
    }

    /// Get the number of columns
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row has no columns
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value by 1-based column index
    pub fn get(&self, index: usize) -> Result<&Value> {
        if index == 0 || index > self.values.len() {
            return Err(Error::ColumnIndexOutOfRange {
                index,
                count: self.values.len(),
            });
        }
        Ok(&self.values[index - 1])
    }

    /// Get the column values
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consume the row and return the values
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Get a column projected to text
    pub fn get_string(&self, index: usize) -> Result<String> {
        self.get(index)?.to_string_value()
    }

    /// Get a column projected to i64
    pub fn get_i64(&self, index: usize) -> Result<i64> {
        self.get(index)?.to_i64()
    }

    /// Check if a column is NULL
    pub fn is_null(&self, index: usize) -> Result<bool> {
        Ok(self.get(index)?.is_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::WriteBuffer;

    #[test]
    fn test_row_get_bounds() {
        let row = Row::new(1, None, vec![Value::Null, Value::Int(5)]);
        assert!(row.is_null(1).unwrap());
        assert_eq!(row.get_i64(2).unwrap(), 5);
        assert!(matches!(
            row.get(0),
            Err(Error::ColumnIndexOutOfRange { index: 0, count: 2 })
        ));
        assert!(row.get(3).is_err());
    }

    #[test]
    fn test_row_decode() {
        let mut buf = WriteBuffer::new();
        buf.write_i32(4).unwrap();
        buf.write_oid(&Oid::new(100, 1, 0)).unwrap();
        Value::Int(9).encode(&mut buf).unwrap();
        Value::from("x").encode(&mut buf).unwrap();

        let mut read = ReadBuffer::from_slice(buf.as_slice());
        let row = Row::decode(&mut read, 2).unwrap();
        assert_eq!(row.index(), 4);
        assert_eq!(row.oid().unwrap().page_id(), 100);
        assert_eq!(row.get_string(2).unwrap(), "x");
        assert_eq!(read.remaining(), 0);
    }

    #[test]
    fn test_row_decode_without_oid() {
        let mut buf = WriteBuffer::new();
        buf.write_i32(1).unwrap();
        buf.write_oid(&Oid::new(0, 0, 0)).unwrap();
        let mut read = ReadBuffer::from_slice(buf.as_slice());
        let row = Row::decode(&mut read, 0).unwrap();
        assert!(row.oid().is_none());
        assert!(row.is_empty());
    }
}
