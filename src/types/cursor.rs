//! Result set references
//!
//! A procedure can hand a query result back as an OUT value. On the wire
//! this is only the engine's query id; a statement handle for it is opened
//! with [`Session::make_out_result_set`](crate::Session::make_out_result_set).

use crate::error::Result;
use crate::session::Session;
use crate::statement::HandleId;

/// A query result returned as a value
///
/// # Example
///
/// ```ignore
/// let outs = session.execute(handle, exec, &params).await?;
/// if let Ok(Value::ResultSet(rs)) = &outs.out_values[0] {
///     let id = rs.open(&mut session).await?;
///     session.fetch(id, 1, 0, 0).await?;
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultSetRef {
    /// Engine query id
    pub(crate) query_id: i64,
}

impl ResultSetRef {
    /// Create a reference to the given engine query
    pub fn new(query_id: i64) -> Self {
        Self { query_id }
    }

    /// Get the engine query id
    pub fn query_id(&self) -> i64 {
        self.query_id
    }

    /// Open a statement handle over this result
    pub async fn open(&self, session: &mut Session) -> Result<HandleId> {
        session.make_out_result_set(self.query_id).await
    }
}
