//! Compiled code catalog access
//!
//! Procedure code lives in a catalog relation, one row per procedure: the
//! creation timestamp, two flags and the archive as base64 text. The
//! timestamp doubles as the version key for cached classes.
//!
//! Lookups distinguish three outcomes: `Ok(Some(_))` found, `Ok(None)`
//! unknown name, `Err(_)` the lookup itself failed.

use base64::Engine;
use tokio::sync::Mutex;

use crate::code::{CompiledCodeSet, Signature};
use crate::config::{CatalogConfig, CatalogErrorPolicy};
use crate::error::{Error, Result};
use crate::row::Row;
use crate::types::Value;

/// A plain SQL connection to the database
#[async_trait::async_trait]
pub trait SqlConnection: Send {
    /// Run a query and return every row
    async fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;
}

/// Catalog row attributes besides the code itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAttributes {
    /// Creation timestamp
    pub timestamp: String,
    /// Whether the entry point is a static method
    pub is_static: bool,
    /// Whether the code was generated by the system
    pub is_system_generated: bool,
}

/// Reads compiled code from the catalog
pub struct CodeRepository<C> {
    conn: Mutex<C>,
    config: CatalogConfig,
}

impl<C: SqlConnection> CodeRepository<C> {
    /// Create a repository over a connection
    pub fn new(conn: C, config: CatalogConfig) -> Self {
        Self {
            conn: Mutex::new(conn),
            config,
        }
    }

    /// Get the catalog configuration
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Fetch the single row for `name`, applying the error policy
    async fn lookup(&self, columns: &str, name: &str) -> Result<Option<Row>> {
        let sql = format!("SELECT {} FROM {} WHERE name = ?", columns, self.config.table);
        let result = self
            .conn
            .lock()
            .await
            .query(&sql, &[Value::from(name)])
            .await;

        let rows = match result {
            Ok(rows) => rows,
            Err(e) => match self.config.error_policy {
                CatalogErrorPolicy::Propagate => return Err(e),
                CatalogErrorPolicy::TreatAsNotFound => {
                    tracing::warn!(name = name, error = %e, "Catalog lookup failed, treating as not found");
                    return Ok(None);
                }
            },
        };

        let mut rows = rows.into_iter();
        let row = rows.next();
        if rows.next().is_some() {
            return Err(Error::Catalog(format!("more than one catalog row for {}", name)));
        }
        Ok(row)
    }

    /// Creation timestamp of the code stored under `name`
    pub async fn get_code_meta(&self, name: &str) -> Result<Option<String>> {
        let Some(row) = self.lookup("created_time", name).await? else {
            return Ok(None);
        };
        let value = row.get(1)?;
        if value.is_null() {
            return Err(Error::Catalog(format!("catalog row for {} has no timestamp", name)));
        }
        Ok(Some(value.to_string_value()?))
    }

    /// Version key for cached classes; same as [`get_code_meta`](Self::get_code_meta)
    pub async fn get_transaction_key(&self, name: &str) -> Result<Option<String>> {
        self.get_code_meta(name).await
    }

    /// Timestamp and flags of the code stored under `name`
    pub async fn get_code_attributes(&self, name: &str) -> Result<Option<CodeAttributes>> {
        let Some(row) = self
            .lookup("created_time, is_static, is_system_generated", name)
            .await?
        else {
            return Ok(None);
        };
        let flag = |index: usize| -> Result<bool> {
            let value = row.get(index)?;
            Ok(!value.is_null() && value.to_i32()? != 0)
        };
        Ok(Some(CodeAttributes {
            timestamp: row.get_string(1)?,
            is_static: flag(2)?,
            is_system_generated: flag(3)?,
        }))
    }

    /// Decoded archive bytes of the code stored under `name`
    pub async fn get_object_code_bytes(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let Some(row) = self.lookup("ocode", name).await? else {
            return Ok(None);
        };
        let encoded: Vec<u8> = match row.get(1)? {
            Value::String(text) => text.bytes().collect(),
            Value::Bytes(bytes) => bytes.to_vec(),
            Value::Null => {
                return Err(Error::Catalog(format!("catalog row for {} has no code", name)))
            }
            other => {
                return Err(Error::TypeMismatch {
                    from: other.kind_name(),
                    to: "Bytes",
                })
            }
        };
        let cleaned: Vec<u8> = encoded
            .into_iter()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        let decoded = base64::engine::general_purpose::STANDARD.decode(cleaned)?;
        tracing::trace!(name = name, len = decoded.len(), "Decoded object code");
        Ok(Some(decoded))
    }

    /// Load the code set for a signature, tagged with its catalog timestamp
    pub async fn get_object_code(&self, signature: &Signature) -> Result<Option<CompiledCodeSet>> {
        let name = signature.code_name();
        let Some(timestamp) = self.get_code_meta(name).await? else {
            tracing::debug!(name = name, "No compiled code in catalog");
            return Ok(None);
        };
        let Some(bytes) = self.get_object_code_bytes(name).await? else {
            return Ok(None);
        };
        let set = CompiledCodeSet::from_jar(&bytes, signature.class_name(), timestamp)?;
        Ok(Some(set))
    }
}

impl<C> std::fmt::Debug for CodeRepository<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeRepository")
            .field("config", &self.config)
            .finish()
    }
}
