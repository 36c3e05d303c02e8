//! LOB (Large Object) handles
//!
//! A LOB value carries only its size and locator. The content is pulled
//! from the engine on first access in chunks of [`LOB_READ_CHUNK`] bytes and
//! then kept with the handle.

use std::fmt;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::sync::OnceCell;

use crate::constants::DbType;
use crate::error::{Error, Result};
use crate::session::Session;

/// Largest slice requested per LOB read
pub const LOB_READ_CHUNK: i32 = 128 * 1024;

/// Upper bound on the capacity reserved from the size the engine reported
const MAX_RESERVE: usize = 16 * 1024 * 1024;

/// Kind of large object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobKind {
    /// Binary large object
    Blob,
    /// Character large object
    Clob,
}

impl LobKind {
    /// Wire type tag for this kind
    pub fn db_type(self) -> DbType {
        match self {
            LobKind::Blob => DbType::Blob,
            LobKind::Clob => DbType::Clob,
        }
    }
}

/// LOB handle - a reference to a large object stored by the engine
#[derive(Clone)]
pub struct Lob {
    kind: LobKind,
    /// Size in bytes
    size: i64,
    /// Engine locator string
    locator: String,
    content: Arc<OnceCell<Bytes>>,
}

impl Lob {
    /// Create a handle from its wire representation
    pub fn new(kind: LobKind, size: i64, locator: impl Into<String>) -> Self {
        Self {
            kind,
            size,
            locator: locator.into(),
            content: Arc::new(OnceCell::new()),
        }
    }

    /// Kind of large object
    pub fn kind(&self) -> LobKind {
        self.kind
    }

    /// Size in bytes
    pub fn size(&self) -> i64 {
        self.size
    }

    /// Engine locator
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Whether the content has already been read
    pub fn is_materialized(&self) -> bool {
        self.content.initialized()
    }

    /// Read the whole content as bytes
    pub async fn read_bytes(&self, session: &mut Session) -> Result<Bytes> {
        let content = self
            .content
            .get_or_try_init(|| async move {
                let total = usize::try_from(self.size).map_err(|_| {
                    Error::ValueConversion(format!("negative LOB size: {}", self.size))
                })?;
                let mut out = BytesMut::with_capacity(total.min(MAX_RESERVE));
                while out.len() < total {
                    let want = (total - out.len()).min(LOB_READ_CHUNK as usize) as i32;
                    let chunk = session
                        .lob_read(&self.locator, out.len() as i64, want)
                        .await?;
                    if chunk.is_empty() {
                        return Err(Error::ValueConversion(format!(
                            "LOB read returned no data at offset {} of {}",
                            out.len(),
                            total
                        )));
                    }
                    out.extend_from_slice(&chunk);
                }
                tracing::trace!(locator = %self.locator, len = out.len(), "Materialized LOB");
                Ok(out.freeze())
            })
            .await?;
        Ok(content.clone())
    }

    /// Read the content of a CLOB as text in the session's character set
    pub async fn read_string(&self, session: &mut Session) -> Result<String> {
        if self.kind != LobKind::Clob {
            return Err(Error::TypeMismatch {
                from: "Blob",
                to: "String",
            });
        }
        let charset = session.charset();
        let bytes = self.read_bytes(session).await?;
        charset.decode(&bytes)
    }
}

impl PartialEq for Lob {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.size == other.size && self.locator == other.locator
    }
}

impl fmt::Debug for Lob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lob")
            .field("kind", &self.kind)
            .field("size", &self.size)
            .field("locator", &self.locator)
            .field("materialized", &self.is_materialized())
            .finish()
    }
}
