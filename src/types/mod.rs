//! Value types exchanged with the engine
//!
//! This module provides the tagged [`Value`] union with its typed
//! projections, plus the reference kinds (OID, LOB, result set) that are
//! resolved through a session on demand.

mod cursor;
mod lob;
mod numeric;
mod oid;
mod value;

pub use cursor::ResultSetRef;
pub use lob::{Lob, LobKind, LOB_READ_CHUNK};
pub use numeric::Numeric;
pub use oid::{Oid, OidHandle};
pub use value::{Collection, Param, Value};
