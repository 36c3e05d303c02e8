//! Column metadata and tuple blocks
//!
//! Shared by every response that describes or carries a result: prepare,
//! execute, next_result, schema info, get-by-OID and out result sets.

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::constants::DbType;
use crate::error::Result;
use crate::row::Row;
use crate::statement::ColumnInfo;

/// Parse a single column description
pub fn parse_column_info(buf: &mut ReadBuffer) -> Result<ColumnInfo> {
    let db_type = DbType::try_from(buf.read_i32()?)?;
    let scale = buf.read_short()?;
    let precision = buf.read_i32()?;
    let name = buf.read_string()?.unwrap_or_default();
    let attr_name = buf.read_string()?.unwrap_or_default();
    let class_name = buf.read_string()?.unwrap_or_default();
    let nullable = buf.read_bool()?;
    let default_value = buf.read_string()?;
    let auto_increment = buf.read_bool()?;
    let unique_key = buf.read_bool()?;
    let primary_key = buf.read_bool()?;
    let foreign_key = buf.read_bool()?;

    Ok(ColumnInfo {
        db_type,
        scale,
        precision,
        name,
        attr_name,
        class_name,
        nullable,
        default_value,
        auto_increment,
        unique_key,
        primary_key,
        foreign_key,
    })
}

/// Parse a counted list of column descriptions
pub fn parse_columns(buf: &mut ReadBuffer) -> Result<Vec<ColumnInfo>> {
    let count = buf.read_count()?;
    (0..count).map(|_| parse_column_info(buf)).collect()
}

/// Write a single column description
pub fn write_column_info(buf: &mut WriteBuffer, column: &ColumnInfo) -> Result<()> {
    buf.write_i32(column.db_type as i32)?;
    buf.write_short(column.scale)?;
    buf.write_i32(column.precision)?;
    buf.write_string(&column.name)?;
    buf.write_string(&column.attr_name)?;
    buf.write_string(&column.class_name)?;
    buf.write_bool(column.nullable)?;
    buf.write_opt_string(column.default_value.as_deref())?;
    buf.write_bool(column.auto_increment)?;
    buf.write_bool(column.unique_key)?;
    buf.write_bool(column.primary_key)?;
    buf.write_bool(column.foreign_key)
}

/// Write a counted list of column descriptions
pub fn write_columns(buf: &mut WriteBuffer, columns: &[ColumnInfo]) -> Result<()> {
    buf.write_i32(columns.len() as i32)?;
    columns.iter().try_for_each(|c| write_column_info(buf, c))
}

/// A block of tuples returned by fetch (or piggybacked on execute)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchBlock {
    /// Tuples in result order
    pub tuples: Vec<Row>,
    /// Whether the engine has no tuples beyond this block
    pub completed: bool,
}

impl FetchBlock {
    /// Parse a block whose tuples have `column_count` values each
    pub fn parse(buf: &mut ReadBuffer, column_count: usize) -> Result<Self> {
        let count = buf.read_count()?;
        let tuples = (0..count)
            .map(|_| Row::decode(buf, column_count))
            .collect::<Result<Vec<_>>>()?;
        let completed = buf.read_bool()?;
        Ok(Self { tuples, completed })
    }

    /// Write the block in the layout [`FetchBlock::parse`] reads
    pub fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.write_i32(self.tuples.len() as i32)?;
        for row in &self.tuples {
            buf.write_i32(row.index())?;
            match row.oid() {
                Some(oid) => buf.write_oid(oid)?,
                None => buf.write_oid(&crate::types::Oid::new(0, 0, 0))?,
            }
            for value in row.values() {
                value.encode(buf)?;
            }
        }
        buf.write_bool(self.completed)
    }

    /// 1-based index of the last tuple, if any
    pub fn last_index(&self) -> Option<i32> {
        self.tuples.last().map(|r| r.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    #[test]
    fn test_column_info_layout() {
        let mut col = ColumnInfo::new("id", DbType::Int);
        col.class_name = "t".to_string();
        col.primary_key = true;
        col.nullable = false;

        let mut buf = WriteBuffer::new();
        write_columns(&mut buf, &[col.clone()]).unwrap();

        let mut read = ReadBuffer::from_slice(buf.as_slice());
        let parsed = parse_columns(&mut read).unwrap();
        assert_eq!(parsed, vec![col]);
        assert!(read.expect_consumed("test").is_ok());
    }

    #[test]
    fn test_fetch_block() {
        let block = FetchBlock {
            tuples: vec![
                Row::new(1, None, vec![Value::Int(1)]),
                Row::new(2, None, vec![Value::Null]),
            ],
            completed: true,
        };
        let mut buf = WriteBuffer::new();
        block.write(&mut buf).unwrap();

        let mut read = ReadBuffer::from_slice(buf.as_slice());
        let parsed = FetchBlock::parse(&mut read, 1).unwrap();
        assert_eq!(parsed, block);
        assert_eq!(parsed.last_index(), Some(2));
    }

    #[test]
    fn test_fetch_block_wrong_column_count_overreads() {
        let block = FetchBlock {
            tuples: vec![Row::new(1, None, vec![Value::Int(1)])],
            completed: false,
        };
        let mut buf = WriteBuffer::new();
        block.write(&mut buf).unwrap();

        let mut read = ReadBuffer::from_slice(buf.as_slice());
        assert!(FetchBlock::parse(&mut read, 2).is_err());
    }
}
