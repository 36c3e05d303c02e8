#![warn(missing_docs)]

//! # pl-runtime
//!
//! Runtime side of an out-of-process stored procedure host. The database
//! engine hands procedure invocations to this process; while a procedure
//! runs it calls back into the engine over the same channel to run SQL.
//!
//! ## Features
//!
//! - **Engine RPC session** - prepare, execute, fetch, next_result,
//!   schema info, get-by-OID, LOB reads and transaction control
//! - **Checked handle lifecycle** - state transitions are validated before
//!   anything is sent
//! - **Strict wire decoding** - every response must be consumed exactly; a
//!   mismatch breaks the session instead of misreading later calls
//! - **Compiled code loading** - procedure archives read from the catalog
//!   and unpacked into a process-wide class cache
//! - **Typed values** - one tagged union with checked projections
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pl_runtime::{Param, Session, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> pl_runtime::Result<()> {
//!     let mut session = Session::connect(SessionConfig::new("localhost", 5500)).await?;
//!
//!     let id = session.prepare("SELECT id, name FROM users WHERE id > ?", 0).await?;
//!     session.execute(id, 0, false, 0, vec![Param::input(10)]).await?;
//!     for row in session.fetch(id, 1, 0, 0).await? {
//!         println!("User {}: {}", row.get_i64(1)?, row.get_string(2)?);
//!     }
//!     session.close_statement(id).await?;
//!
//!     session.close().await
//! }
//! ```
//!
//! ## Resolving Procedure Code
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pl_runtime::{
//!     CatalogConfig, ClassCache, CodeRepository, CodeResolver, Session, SessionConfig,
//!     Signature,
//! };
//!
//! # async fn example() -> pl_runtime::Result<()> {
//! let cache = Arc::new(ClassCache::new());
//! let catalog = Session::connect(SessionConfig::new("localhost", 5500)).await?;
//! let resolver = CodeResolver::new(CodeRepository::new(catalog, CatalogConfig::new()), cache);
//!
//! let sig = Signature::parse("com.acme.Sales.total(int)")?.with_code_name("SALES_TOTAL");
//! let class = resolver.resolve(&sig).await?;
//! println!("{} version {}", class.name, class.version);
//! # Ok(())
//! # }
//! ```
//!
//! ## Data Types
//!
//! | Engine Type | Rust Type |
//! |-------------|-----------|
//! | SHORT, INT, BIGINT | `i16`, `i32`, `i64` |
//! | FLOAT, DOUBLE, MONETARY | `f32`, `f64` |
//! | NUMERIC | [`Numeric`] |
//! | CHAR, STRING | `String` |
//! | BIT, VARBIT | `bytes::Bytes` |
//! | DATE, TIME | `chrono::NaiveDate`, `chrono::NaiveTime` |
//! | TIMESTAMP, DATETIME | `chrono::NaiveDateTime` |
//! | SET, MULTISET, SEQUENCE | [`Collection`] |
//! | OBJECT | [`Oid`] |
//! | BLOB, CLOB | [`Lob`] |
//! | RESULTSET | [`ResultSetRef`] |

pub mod buffer;
pub mod catalog;
pub mod class_cache;
pub mod code;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod messages;
pub mod packet;
pub mod resolver;
pub mod row;
pub mod session;
pub mod statement;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use catalog::{CodeAttributes, CodeRepository, SqlConnection};
pub use class_cache::{ClassCache, MemoryClass};
pub use code::{CompiledCode, CompiledCodeSet, Signature};
pub use config::{CatalogConfig, CatalogErrorPolicy, Charset, SessionConfig};
pub use constants::{DbType, FunctionCode, ParamMode, StatementType};
pub use context::{Invocation, InvocationContext};
pub use error::{Error, Result};
pub use resolver::CodeResolver;
pub use row::Row;
pub use session::{ExecuteResult, Session, SessionState, StatementGuard};
pub use statement::{ColumnInfo, HandleId, HandleState, StatementHandle};
pub use transport::{StreamTransport, TcpTransport, Transport};
pub use types::{Collection, Lob, LobKind, Numeric, Oid, OidHandle, Param, ResultSetRef, Value};
