//! Object identifiers
//!
//! An OID names a stored object by page, slot and volume. Dereferencing it
//! costs a round trip, so the attributes are fetched on first use and kept
//! on the instance (and on every clone of it).

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::OnceCell;

use crate::error::{Error, Result};
use crate::session::Session;
use crate::types::Value;

/// Attributes of a dereferenced object
#[derive(Debug, Clone, PartialEq)]
pub struct OidHandle {
    /// Class the object belongs to
    pub class_name: String,
    /// Attribute values keyed by attribute name, in engine order
    pub attributes: IndexMap<String, Value>,
}

impl OidHandle {
    /// Look up an attribute by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

/// A stored object identifier with a lazily resolved handle
#[derive(Clone)]
pub struct Oid {
    page_id: i32,
    slot_id: i16,
    vol_id: i16,
    resolved: Arc<OnceCell<OidHandle>>,
}

impl Oid {
    /// Create an unresolved OID
    pub fn new(page_id: i32, slot_id: i16, vol_id: i16) -> Self {
        Self {
            page_id,
            slot_id,
            vol_id,
            resolved: Arc::new(OnceCell::new()),
        }
    }

    /// Page id
    pub fn page_id(&self) -> i32 {
        self.page_id
    }

    /// Slot id
    pub fn slot_id(&self) -> i16 {
        self.slot_id
    }

    /// Volume id
    pub fn vol_id(&self) -> i16 {
        self.vol_id
    }

    /// The null OID marks "no object"
    pub fn is_null(&self) -> bool {
        self.page_id == -1 || (self.page_id == 0 && self.slot_id == 0 && self.vol_id == 0)
    }

    /// The handle, if it has already been resolved
    pub fn resolved(&self) -> Option<&OidHandle> {
        self.resolved.get()
    }

    /// Dereference the object, reusing the first successful result
    ///
    /// The engine is asked for every attribute; the temporary statement
    /// handle it opens is closed before returning.
    pub async fn resolve(&self, session: &mut Session) -> Result<&OidHandle> {
        if self.is_null() {
            return Err(Error::UnexpectedNull);
        }
        self.resolved
            .get_or_try_init(|| async move {
                let id = session.get_by_oid(self, &[]).await?;
                let handle = session.handle(id)?;
                let class_name = handle.class_name().unwrap_or_default().to_string();
                let values = handle
                    .rows()
                    .first()
                    .map(|row| row.values().to_vec())
                    .unwrap_or_default();
                let attributes = handle
                    .columns()
                    .iter()
                    .map(|c| c.name.clone())
                    .zip(values)
                    .collect();
                session.close_statement(id).await?;
                tracing::trace!(oid = %self, class = %class_name, "Resolved OID");
                Ok(OidHandle {
                    class_name,
                    attributes,
                })
            })
            .await
    }
}

impl PartialEq for Oid {
    fn eq(&self, other: &Self) -> bool {
        self.page_id == other.page_id && self.slot_id == other.slot_id && self.vol_id == other.vol_id
    }
}

impl Eq for Oid {}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Oid")
            .field("page_id", &self.page_id)
            .field("slot_id", &self.slot_id)
            .field("vol_id", &self.vol_id)
            .field("resolved", &self.resolved.initialized())
            .finish()
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}|{}|{}", self.page_id, self.slot_id, self.vol_id)
    }
}

/// Parse the `@page|slot|volume` text form
impl FromStr for Oid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::ValueConversion(format!("invalid OID string: {:?}", s));
        let body = s.trim().strip_prefix('@').ok_or_else(invalid)?;
        let mut parts = body.split('|');
        let page_id = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let slot_id = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let vol_id = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Oid::new(page_id, slot_id, vol_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oid_text_form() {
        let oid = Oid::new(512, 3, 1);
        assert_eq!(oid.to_string(), "@512|3|1");
        let parsed: Oid = "@512|3|1".parse().unwrap();
        assert_eq!(parsed, oid);
    }

    #[test]
    fn test_oid_text_form_invalid() {
        assert!("512|3|1".parse::<Oid>().is_err());
        assert!("@512|3".parse::<Oid>().is_err());
        assert!("@512|3|1|0".parse::<Oid>().is_err());
        assert!("@a|b|c".parse::<Oid>().is_err());
    }

    #[test]
    fn test_null_oid() {
        assert!(Oid::new(0, 0, 0).is_null());
        assert!(Oid::new(-1, 0, 0).is_null());
        assert!(!Oid::new(1, 0, 0).is_null());
    }

    #[test]
    fn test_clone_shares_resolution_slot() {
        let oid = Oid::new(1, 2, 3);
        let copy = oid.clone();
        assert!(Arc::ptr_eq(&oid.resolved, &copy.resolved));
        assert!(oid.resolved().is_none());
    }
}
