//! Engine callback session
//!
//! A [`Session`] owns the channel back to the engine for the duration of one
//! procedure invocation. Every call writes one request frame and awaits the
//! complete response before returning; nothing is pipelined. Responses must
//! be consumed exactly by their decoder. Anything else is a desync, and a
//! desynced (or disconnected) session refuses all further calls.
//!
//! # Example
//!
//! ```rust,no_run
//! use pl_runtime::{Session, SessionConfig, Param};
//!
//! # async fn example() -> pl_runtime::Result<()> {
//! let mut session = Session::connect(SessionConfig::new("localhost", 5500)).await?;
//! let id = session.prepare("SELECT name FROM athlete WHERE code = ?", 0).await?;
//! session.execute(id, 0, false, 0, vec![Param::input(10999)]).await?;
//! for row in session.fetch(id, 1, 0, 0).await? {
//!     println!("{}", row.get_string(1)?);
//! }
//! session.close_statement(id).await?;
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use bytes::Bytes;
use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::catalog::SqlConnection;
use crate::config::{Charset, SessionConfig};
use crate::constants::{response, StatementType};
use crate::error::{Error, Result};
use crate::messages::{
    CloseReqHandleMessage, DbParameters, EndTransactionMessage, ExecuteMessage, FetchMessage,
    GetByOidMessage, GetDbParameterMessage, GetDbVersionMessage, GetSchemaInfoMessage,
    LobReadMessage, MakeOutResultSetMessage, Message, NextResultMessage, NextResultResponse,
    PrepareMessage,
};
use crate::packet::Frame;
use crate::row::Row;
use crate::statement::{HandleId, HandleState, StatementHandle};
use crate::transport::{TcpTransport, Transport};
use crate::types::{Oid, Param, Value};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Ready for calls
    Open,
    /// A fatal error occurred; the channel can no longer be trusted
    Broken,
    /// Closed by the caller
    Closed,
}

/// Outcome of an execute call
#[derive(Debug)]
pub struct ExecuteResult {
    /// Affected rows, or tuple count for queries
    pub result_count: i32,
    /// Statement type of the first result
    pub statement_type: StatementType,
    /// Whether next_result has something to return
    pub has_more_results: bool,
    /// Engine query id of the result
    pub query_id: i64,
    /// OUT/INOUT values in parameter order, each decoded on its own
    pub out_values: Vec<Result<Value>>,
    /// Number of tuples piggybacked on the response
    pub prefetched: usize,
}

/// A session on the engine callback channel
pub struct Session {
    transport: Box<dyn Transport>,
    config: SessionConfig,
    state: SessionState,
    handles: IndexMap<HandleId, StatementHandle>,
    deferred_close: Arc<Mutex<Vec<HandleId>>>,
    write_buf: WriteBuffer,
    /// Set between sending a request and receiving its reply
    in_flight: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("handles", &self.handles.len())
            .finish()
    }
}

impl Session {
    /// Connect to the engine over TCP
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let transport = TcpTransport::connect(&config).await?;
        Ok(Self::new(transport, config))
    }

    /// Create a session over an already-connected transport
    ///
    /// The transport's incoming frame limit is set from `config`.
    pub fn new<T: Transport + 'static>(mut transport: T, config: SessionConfig) -> Self {
        transport.set_max_frame_size(config.max_frame_size);
        let write_buf = WriteBuffer::with_max_capacity(1024, config.max_frame_size);
        Self {
            transport: Box::new(transport),
            config,
            state: SessionState::Open,
            handles: IndexMap::new(),
            deferred_close: Arc::new(Mutex::new(Vec::new())),
            write_buf,
            in_flight: false,
        }
    }

    /// Get the session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Character set of CLOB content
    pub fn charset(&self) -> Charset {
        self.config.charset
    }

    /// Get the session state
    ///
    /// A session whose last call was dropped before its reply arrived
    /// reports `Broken`.
    pub fn state(&self) -> SessionState {
        if self.in_flight && self.state == SessionState::Open {
            SessionState::Broken
        } else {
            self.state
        }
    }

    /// Look up a registered handle
    pub fn handle(&self, id: HandleId) -> Result<&StatementHandle> {
        self.handles.get(&id).ok_or(Error::UnknownHandle(id))
    }

    fn handle_mut(&mut self, id: HandleId) -> Result<&mut StatementHandle> {
        self.handles.get_mut(&id).ok_or(Error::UnknownHandle(id))
    }

    /// Number of handles not yet closed
    pub fn open_handle_count(&self) -> usize {
        self.handles.values().filter(|h| !h.is_closed()).count()
    }

    // =========================================================================
    // Call plumbing
    // =========================================================================

    /// A call future dropped between send and receive leaves its reply
    /// unread on the stream.
    fn check_abandoned(&mut self) {
        if self.in_flight {
            self.in_flight = false;
            let err = Error::desync(
                "call",
                "previous call was cancelled before its reply arrived",
            );
            self.mark_broken("call", &err);
        }
    }

    fn ensure_usable(&mut self) -> Result<()> {
        self.check_abandoned();
        match self.state {
            SessionState::Open => Ok(()),
            SessionState::Broken => Err(Error::SessionBroken),
            SessionState::Closed => Err(Error::SessionClosed),
        }
    }

    fn mark_broken(&mut self, function: &str, err: &Error) {
        if self.state == SessionState::Open {
            tracing::warn!(function = function, error = %err, "Session broken");
            self.state = SessionState::Broken;
        }
    }

    async fn call<M: Message>(&mut self, msg: &M) -> Result<M::Response> {
        self.ensure_usable()?;
        self.flush_deferred_closes().await?;
        let result = self.call_inner(msg).await;
        if let Err(e) = &result {
            if e.is_session_fatal() {
                self.mark_broken(M::FUNCTION.name(), e);
            }
        }
        result
    }

    async fn call_inner<M: Message>(&mut self, msg: &M) -> Result<M::Response> {
        let function = M::FUNCTION;
        self.write_buf.clear();
        msg.encode(&mut self.write_buf)?;
        let frame = Frame::new(
            function as i32,
            Bytes::copy_from_slice(self.write_buf.as_slice()),
        );

        tracing::trace!(function = function.name(), len = frame.payload_len(), "Calling engine");
        self.in_flight = true;
        self.transport.send_frame(&frame).await?;
        let reply = self.transport.receive_frame().await?;
        self.in_flight = false;

        let mut buf = ReadBuffer::new(reply.body);
        let underflow_is_desync = |e: Error| match e {
            Error::BufferUnderflow { needed, available } => Error::desync(
                function.name(),
                format!("response ended early: need {} bytes, {} left", needed, available),
            ),
            other => other,
        };

        match reply.code {
            response::SUCCESS => {
                let parsed = msg.parse_response(&mut buf).map_err(underflow_is_desync)?;
                buf.expect_consumed(function.name())?;
                Ok(parsed)
            }
            response::ERROR => {
                let code = buf.read_i32().map_err(underflow_is_desync)?;
                let message = buf
                    .read_string()
                    .map_err(underflow_is_desync)?
                    .unwrap_or_default();
                buf.expect_consumed(function.name())?;
                tracing::debug!(function = function.name(), code = code, "Engine returned error");
                Err(Error::server(code, message))
            }
            other => Err(Error::desync(
                function.name(),
                format!("unknown response code {}", other),
            )),
        }
    }

    /// Send close requests for handles whose guards were dropped
    async fn flush_deferred_closes(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut *self.deferred_close.lock());
        for id in pending {
            if !self.handles.get(&id).is_some_and(|h| !h.is_closed()) {
                continue;
            }
            match self.call_inner(&CloseReqHandleMessage::new(id)).await {
                Ok(()) => {
                    if let Some(handle) = self.handles.get_mut(&id) {
                        handle.mark_closed();
                    }
                    tracing::trace!(handle = id, "Closed dropped statement handle");
                }
                Err(e) if e.is_session_fatal() => {
                    self.mark_broken(CloseReqHandleMessage::FUNCTION.name(), &e);
                    return Err(e);
                }
                Err(e) => tracing::warn!(handle = id, error = %e, "Deferred close failed"),
            }
        }
        Ok(())
    }

    /// Track a handle the engine just opened
    fn register(&mut self, handle: StatementHandle) -> Result<HandleId> {
        let id = handle.id;
        if self.handles.get(&id).is_some_and(|h| !h.is_closed()) {
            let err = Error::desync(
                "register",
                format!("engine reused handle {} while it is still open", id),
            );
            self.mark_broken("register", &err);
            return Err(err);
        }
        self.handles.insert(id, handle);
        Ok(id)
    }

    // =========================================================================
    // Statement operations
    // =========================================================================

    /// Prepare a statement, returning its handle id
    pub async fn prepare(&mut self, sql: &str, flags: i32) -> Result<HandleId> {
        self.prepare_with_recompile(sql, flags, false).await
    }

    /// Prepare a statement, optionally forcing the engine to recompile it
    pub async fn prepare_with_recompile(
        &mut self,
        sql: &str,
        flags: i32,
        recompile: bool,
    ) -> Result<HandleId> {
        let resp = self
            .call(&PrepareMessage::new(sql, flags).recompile(recompile))
            .await?;
        let id = self.register(StatementHandle::prepared(
            resp.handle,
            sql,
            flags,
            resp.statement_type,
            resp.bind_count,
            resp.columns,
        ))?;
        tracing::debug!(handle = id, statement_type = ?resp.statement_type, "Prepared statement");
        Ok(id)
    }

    /// Execute a prepared handle
    ///
    /// `scrollable` is fixed here for the lifetime of the handle. A
    /// `max_field` of zero or less is sent as 0, meaning no limit.
    pub async fn execute(
        &mut self,
        id: HandleId,
        exec_flags: i32,
        scrollable: bool,
        max_field: i32,
        mut params: Vec<Param>,
    ) -> Result<ExecuteResult> {
        let handle = self.handle(id)?;
        handle.check_execute(params.len())?;
        let column_count = handle.column_count();

        let msg = ExecuteMessage::new(id, exec_flags, max_field, scrollable, &params, column_count);
        let normalized_max_field = msg.max_field();
        let resp = self.call(&msg).await?;

        for (param, value) in params
            .iter_mut()
            .filter(|p| p.mode.is_output())
            .zip(&resp.out_values)
        {
            if let Ok(value) = value {
                param.value = value.clone();
            }
        }

        let handle = self.handle_mut(id)?;
        handle.state = HandleState::Executed;
        handle.scrollable = Some(scrollable);
        handle.max_field = normalized_max_field;
        handle.params = params;
        handle.statement_type = resp.statement_type;
        handle.result_count = resp.result_count;
        handle.has_more_results = resp.has_more_results;
        if let Some(columns) = resp.columns {
            handle.columns = columns;
        }
        handle.cursor_position = 0;
        handle.fetch_completed = false;
        handle.rows.clear();

        let mut prefetched = 0;
        if let Some(block) = resp.fetch {
            if let Some(last) = block.last_index() {
                handle.cursor_position = last;
            }
            handle.fetch_completed = block.completed;
            prefetched = block.tuples.len();
            handle.rows = block.tuples;
        }

        tracing::debug!(handle = id, result_count = resp.result_count, prefetched = prefetched, "Executed statement");
        Ok(ExecuteResult {
            result_count: resp.result_count,
            statement_type: resp.statement_type,
            has_more_results: resp.has_more_results,
            query_id: resp.query_id,
            out_values: resp.out_values,
            prefetched,
        })
    }

    /// Fetch tuples starting at the 1-based `cursor_index`
    ///
    /// A `fetch_size` of zero or less uses the configured default.
    pub async fn fetch(
        &mut self,
        id: HandleId,
        cursor_index: i32,
        fetch_size: i32,
        fetch_flags: i32,
    ) -> Result<&[Row]> {
        let handle = self.handle(id)?;
        handle.check_fetch(cursor_index)?;
        let column_count = handle.column_count();
        let fetch_size = if fetch_size > 0 {
            fetch_size
        } else {
            self.config.fetch_size
        };

        let block = self
            .call(&FetchMessage::new(id, cursor_index, fetch_size, fetch_flags, column_count))
            .await?;

        let handle = self.handle_mut(id)?;
        handle.state = HandleState::Fetching;
        if let Some(last) = block.last_index() {
            handle.cursor_position = last;
        }
        handle.fetch_completed = block.completed;
        handle.rows = block.tuples;
        tracing::trace!(handle = id, rows = handle.rows.len(), completed = handle.fetch_completed, "Fetched tuples");
        Ok(handle.rows.as_slice())
    }

    /// Move a handle to its next result
    pub async fn next_result(&mut self, id: HandleId) -> Result<NextResultResponse> {
        self.handle(id)?.check_next_result()?;
        let resp = self.call(&NextResultMessage::new(id)).await?;

        let handle = self.handle_mut(id)?;
        handle.state = HandleState::NextResult;
        handle.statement_type = resp.statement_type;
        handle.result_count = resp.result_count;
        handle.has_more_results = resp.has_more_results;
        handle.columns = resp.columns.clone();
        handle.cursor_position = 0;
        handle.fetch_completed = false;
        handle.rows.clear();
        Ok(resp)
    }

    /// Read attributes of a stored object into a new handle
    ///
    /// The handle holds the single tuple already fetched.
    pub async fn get_by_oid(&mut self, oid: &Oid, attributes: &[&str]) -> Result<HandleId> {
        let resp = self.call(&GetByOidMessage::new(oid, attributes)).await?;
        let mut handle =
            StatementHandle::with_result(resp.handle, StatementType::Select, 1, resp.columns);
        handle.class_name = Some(resp.class_name);
        handle.rows = vec![resp.row];
        handle.cursor_position = 1;
        handle.fetch_completed = true;
        self.register(handle)
    }

    /// Open a schema information result
    pub async fn get_schema_info(
        &mut self,
        schema_type: i32,
        arg1: Option<&str>,
        arg2: Option<&str>,
        flags: i32,
    ) -> Result<HandleId> {
        let resp = self
            .call(&GetSchemaInfoMessage::new(schema_type, arg1, arg2, flags))
            .await?;
        self.register(StatementHandle::with_result(
            resp.handle,
            StatementType::Select,
            resp.tuple_count,
            resp.columns,
        ))
    }

    /// Open a handle over a result set a procedure returned as a value
    pub async fn make_out_result_set(&mut self, query_id: i64) -> Result<HandleId> {
        let resp = self.call(&MakeOutResultSetMessage::new(query_id)).await?;
        self.register(StatementHandle::with_result(
            resp.handle,
            resp.statement_type,
            resp.tuple_count,
            resp.columns,
        ))
    }

    /// Release a handle
    ///
    /// Closing an already-closed handle is a no-op.
    pub async fn close_statement(&mut self, id: HandleId) -> Result<()> {
        if self.handle(id)?.is_closed() {
            return Ok(());
        }
        self.call(&CloseReqHandleMessage::new(id)).await?;
        self.handle_mut(id)?.mark_closed();
        tracing::trace!(handle = id, "Closed statement handle");
        Ok(())
    }

    /// Wrap a handle so it is closed even if the caller bails out early
    pub fn guard(&self, id: HandleId) -> Result<StatementGuard> {
        self.handle(id)?;
        Ok(StatementGuard {
            id,
            queue: Arc::clone(&self.deferred_close),
            armed: true,
        })
    }

    // =========================================================================
    // Other callbacks
    // =========================================================================

    /// Read up to `length` bytes of a LOB at 0-based `offset`
    pub async fn lob_read(&mut self, locator: &str, offset: i64, length: i32) -> Result<Bytes> {
        self.call(&LobReadMessage::new(locator, offset, length)).await
    }

    /// Commit or roll back the engine transaction
    pub async fn end_transaction(&mut self, commit: bool) -> Result<()> {
        let msg = if commit {
            EndTransactionMessage::commit()
        } else {
            EndTransactionMessage::rollback()
        };
        self.call(&msg).await
    }

    /// Commit the engine transaction
    pub async fn commit(&mut self) -> Result<()> {
        self.end_transaction(true).await
    }

    /// Roll back the engine transaction
    pub async fn rollback(&mut self) -> Result<()> {
        self.end_transaction(false).await
    }

    /// Read the engine version string
    pub async fn get_db_version(&mut self) -> Result<String> {
        self.call(&GetDbVersionMessage).await
    }

    /// Read the current session parameters
    pub async fn get_db_parameter(&mut self) -> Result<DbParameters> {
        self.call(&GetDbParameterMessage).await
    }

    /// Close every open handle, then the channel
    ///
    /// A broken session skips the handle cleanup since nothing more can be
    /// exchanged with the engine.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.check_abandoned();
        if self.state == SessionState::Open {
            if let Err(e) = self.flush_deferred_closes().await {
                tracing::warn!(error = %e, "Failed to flush deferred closes");
            }
            let open: Vec<HandleId> = self
                .handles
                .values()
                .filter(|h| !h.is_closed())
                .map(|h| h.id)
                .collect();
            for id in open {
                if self.state != SessionState::Open {
                    break;
                }
                if let Err(e) = self.close_statement(id).await {
                    tracing::warn!(handle = id, error = %e, "Failed to close handle");
                }
            }
        }
        self.state = SessionState::Closed;
        self.handles.clear();
        self.transport.close().await
    }

    async fn query_rows(&mut self, id: HandleId, params: &[Value]) -> Result<Vec<Row>> {
        let params = params.iter().cloned().map(Param::input).collect();
        let exec = self.execute(id, 0, false, 0, params).await?;
        let handle = self.handle(id)?;
        if !handle.statement_type().is_query() {
            return Ok(Vec::new());
        }

        let expected = usize::try_from(exec.result_count).unwrap_or(0);
        let mut rows = handle.rows().to_vec();
        let mut done = handle.fetch_completed() || rows.len() >= expected;
        while !done {
            let next = self.handle(id)?.cursor_position() + 1;
            let block = self.fetch(id, next, 0, 0).await?;
            if block.is_empty() {
                break;
            }
            rows.extend_from_slice(block);
            done = self.handle(id)?.fetch_completed() || rows.len() >= expected;
        }
        Ok(rows)
    }
}

#[async_trait::async_trait]
impl SqlConnection for Session {
    async fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let id = self.prepare(sql, 0).await?;
        let result = self.query_rows(id, params).await;
        let closed = self.close_statement(id).await;
        let rows = result?;
        closed?;
        Ok(rows)
    }
}

/// Closes its handle when dropped
///
/// Drop cannot talk to the engine, so the id is queued and the close
/// request goes out ahead of the session's next call.
#[derive(Debug)]
pub struct StatementGuard {
    id: HandleId,
    queue: Arc<Mutex<Vec<HandleId>>>,
    armed: bool,
}

impl StatementGuard {
    /// Get the guarded handle id
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Close the handle now
    pub async fn close(mut self, session: &mut Session) -> Result<()> {
        self.armed = false;
        session.close_statement(self.id).await
    }

    /// Stop guarding; the caller becomes responsible for closing
    pub fn release(mut self) -> HandleId {
        self.armed = false;
        self.id
    }
}

impl Drop for StatementGuard {
    fn drop(&mut self) {
        if self.armed {
            self.queue.lock().push(self.id);
        }
    }
}
