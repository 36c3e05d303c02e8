//! Statement handles
//!
//! A [`StatementHandle`] is the runtime's view of an engine-side statement:
//! its id, the SQL it was prepared from, the fixed column metadata and the
//! cursor state. Handles move through [`HandleState`] as calls succeed; every
//! transition is checked here before anything is put on the wire.

use crate::constants::{DbType, StatementType};
use crate::error::{Error, Result};
use crate::row::Row;
use crate::types::Param;

/// Engine-assigned statement handle id
pub type HandleId = i32;

/// Lifecycle state of a statement handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Prepared, not yet executed
    Created,
    /// Executed; results (if any) can be fetched
    Executed,
    /// At least one fetch has completed
    Fetching,
    /// Moved to a later result of a multi-result execute
    NextResult,
    /// Released; no further calls allowed
    Closed,
}

impl HandleState {
    /// Whether fetch is allowed in this state
    pub fn can_fetch(self) -> bool {
        matches!(
            self,
            HandleState::Executed | HandleState::Fetching | HandleState::NextResult
        )
    }
}

/// Metadata for one result column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    /// Column type
    pub db_type: DbType,
    /// Scale (for NUMERIC)
    pub scale: i16,
    /// Precision
    pub precision: i32,
    /// Column label
    pub name: String,
    /// Underlying attribute name
    pub attr_name: String,
    /// Owning class name
    pub class_name: String,
    /// Whether NULL values are allowed
    pub nullable: bool,
    /// Default value text
    pub default_value: Option<String>,
    /// AUTO_INCREMENT attribute
    pub auto_increment: bool,
    /// Part of a unique key
    pub unique_key: bool,
    /// Part of the primary key
    pub primary_key: bool,
    /// Part of a foreign key
    pub foreign_key: bool,
}

impl ColumnInfo {
    /// Create a new column with minimal info
    pub fn new(name: impl Into<String>, db_type: DbType) -> Self {
        let name = name.into();
        Self {
            db_type,
            scale: 0,
            precision: 0,
            attr_name: name.clone(),
            name,
            class_name: String::new(),
            nullable: true,
            default_value: None,
            auto_increment: false,
            unique_key: false,
            primary_key: false,
            foreign_key: false,
        }
    }
}

/// A statement handle registered with a session
#[derive(Debug, Clone)]
pub struct StatementHandle {
    pub(crate) id: HandleId,
    /// SQL text, absent for handles not opened by prepare
    pub(crate) sql: Option<String>,
    pub(crate) prepare_flags: i32,
    pub(crate) statement_type: StatementType,
    pub(crate) bind_count: usize,
    pub(crate) columns: Vec<ColumnInfo>,
    pub(crate) state: HandleState,
    /// Decided once, at execute
    pub(crate) scrollable: Option<bool>,
    pub(crate) max_field: i32,
    pub(crate) params: Vec<Param>,
    pub(crate) result_count: i32,
    /// 1-based index of the last fetched tuple, 0 before the first fetch
    pub(crate) cursor_position: i32,
    pub(crate) rows: Vec<Row>,
    pub(crate) fetch_completed: bool,
    pub(crate) has_more_results: bool,
    pub(crate) class_name: Option<String>,
}

impl StatementHandle {
    /// A freshly prepared handle
    pub(crate) fn prepared(
        id: HandleId,
        sql: impl Into<String>,
        prepare_flags: i32,
        statement_type: StatementType,
        bind_count: usize,
        columns: Vec<ColumnInfo>,
    ) -> Self {
        Self {
            id,
            sql: Some(sql.into()),
            prepare_flags,
            statement_type,
            bind_count,
            columns,
            state: HandleState::Created,
            scrollable: None,
            max_field: 0,
            params: Vec::new(),
            result_count: 0,
            cursor_position: 0,
            rows: Vec::new(),
            fetch_completed: false,
            has_more_results: false,
            class_name: None,
        }
    }

    /// A handle that already carries a result (schema info, OID, out result set)
    pub(crate) fn with_result(
        id: HandleId,
        statement_type: StatementType,
        result_count: i32,
        columns: Vec<ColumnInfo>,
    ) -> Self {
        Self {
            id,
            sql: None,
            prepare_flags: 0,
            statement_type,
            bind_count: 0,
            columns,
            state: HandleState::Executed,
            scrollable: None,
            max_field: 0,
            params: Vec::new(),
            result_count,
            cursor_position: 0,
            rows: Vec::new(),
            fetch_completed: false,
            has_more_results: false,
            class_name: None,
        }
    }

    /// Get the handle id
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Get the SQL text
    pub fn sql(&self) -> Option<&str> {
        self.sql.as_deref()
    }

    /// Get the prepare flags
    pub fn prepare_flags(&self) -> i32 {
        self.prepare_flags
    }

    /// Get the statement type
    pub fn statement_type(&self) -> StatementType {
        self.statement_type
    }

    /// Number of bind markers reported by prepare
    pub fn bind_count(&self) -> usize {
        self.bind_count
    }

    /// Get the current state
    pub fn state(&self) -> HandleState {
        self.state
    }

    /// Check if the handle is closed
    pub fn is_closed(&self) -> bool {
        self.state == HandleState::Closed
    }

    /// Whether the cursor may move backwards; `None` until executed
    pub fn scrollable(&self) -> Option<bool> {
        self.scrollable
    }

    /// Max field length sent with execute (0 = unbounded)
    pub fn max_field(&self) -> i32 {
        self.max_field
    }

    /// Parameters bound at execute
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Affected-row count or tuple count of the current result
    pub fn result_count(&self) -> i32 {
        self.result_count
    }

    /// 1-based index of the last fetched tuple
    pub fn cursor_position(&self) -> i32 {
        self.cursor_position
    }

    /// Tuples from the most recent fetch
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Whether the engine reported the end of the result
    pub fn fetch_completed(&self) -> bool {
        self.fetch_completed
    }

    /// Whether another result is waiting behind this one
    pub fn has_more_results(&self) -> bool {
        self.has_more_results
    }

    /// Class name of the object, for handles opened by OID
    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    /// Get the column metadata
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get column metadata by 1-based index
    pub fn column(&self, index: usize) -> Result<&ColumnInfo> {
        if index == 0 || index > self.columns.len() {
            return Err(Error::ColumnIndexOutOfRange {
                index,
                count: self.columns.len(),
            });
        }
        Ok(&self.columns[index - 1])
    }

    /// Find a column's 1-based index by name (case-insensitive)
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .map(|i| i + 1)
    }

    // =========================================================================
    // Transition checks
    // =========================================================================

    fn invalid(&self, operation: &'static str) -> Error {
        Error::InvalidHandleState {
            handle: self.id,
            state: self.state,
            operation,
        }
    }

    pub(crate) fn check_execute(&self, param_count: usize) -> Result<()> {
        if self.state != HandleState::Created {
            return Err(self.invalid("execute"));
        }
        if self.sql.is_some() && param_count != self.bind_count {
            return Err(Error::InvalidArgument(format!(
                "handle {} expects {} parameters, got {}",
                self.id, self.bind_count, param_count
            )));
        }
        Ok(())
    }

    pub(crate) fn check_fetch(&self, cursor_index: i32) -> Result<()> {
        if !self.state.can_fetch() {
            return Err(self.invalid("fetch"));
        }
        if cursor_index < 1 {
            return Err(Error::InvalidArgument(format!(
                "cursor index must be 1 or greater, got {}",
                cursor_index
            )));
        }
        if self.scrollable == Some(false) && cursor_index <= self.cursor_position {
            return Err(Error::InvalidArgument(format!(
                "forward-only handle {} is past tuple {}",
                self.id, cursor_index
            )));
        }
        Ok(())
    }

    pub(crate) fn check_next_result(&self) -> Result<()> {
        if !self.state.can_fetch() {
            return Err(self.invalid("next_result"));
        }
        if !self.has_more_results {
            return Err(Error::NoMoreResults(self.id));
        }
        Ok(())
    }

    pub(crate) fn mark_closed(&mut self) {
        self.state = HandleState::Closed;
        self.rows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> StatementHandle {
        StatementHandle::prepared(
            3,
            "SELECT a, b FROM t WHERE c = ?",
            0,
            StatementType::Select,
            1,
            vec![ColumnInfo::new("a", DbType::Int), ColumnInfo::new("b", DbType::String)],
        )
    }

    #[test]
    fn test_column_access_is_one_based() {
        let h = handle();
        assert_eq!(h.column(1).unwrap().name, "a");
        assert_eq!(h.column(2).unwrap().name, "b");
        assert!(matches!(
            h.column(0),
            Err(Error::ColumnIndexOutOfRange { index: 0, count: 2 })
        ));
        assert!(h.column(3).is_err());
        assert_eq!(h.find_column("B"), Some(2));
    }

    #[test]
    fn test_fetch_before_execute_rejected() {
        let h = handle();
        assert!(matches!(
            h.check_fetch(1),
            Err(Error::InvalidHandleState {
                state: HandleState::Created,
                operation: "fetch",
                ..
            })
        ));
    }

    #[test]
    fn test_execute_only_from_created() {
        let mut h = handle();
        assert!(h.check_execute(1).is_ok());
        assert!(matches!(h.check_execute(2), Err(Error::InvalidArgument(_))));
        h.state = HandleState::Executed;
        assert!(h.check_execute(1).is_err());
        h.mark_closed();
        assert!(h.check_execute(1).is_err());
    }

    #[test]
    fn test_forward_only_cannot_rewind() {
        let mut h = handle();
        h.state = HandleState::Fetching;
        h.scrollable = Some(false);
        h.cursor_position = 10;
        assert!(h.check_fetch(5).is_err());
        assert!(h.check_fetch(11).is_ok());

        h.scrollable = Some(true);
        assert!(h.check_fetch(5).is_ok());
        assert!(h.check_fetch(0).is_err());
    }

    #[test]
    fn test_next_result_requires_signal() {
        let mut h = handle();
        h.state = HandleState::Executed;
        assert!(matches!(h.check_next_result(), Err(Error::NoMoreResults(3))));
        h.has_more_results = true;
        assert!(h.check_next_result().is_ok());
    }
}
