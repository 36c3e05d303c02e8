//! Compiled code sets
//!
//! Stored procedures are delivered as JAR archives. A [`CompiledCodeSet`]
//! is the fully materialized content of one archive, tagged with the catalog
//! timestamp it was loaded for.

use std::io::{Cursor, Read};

use bytes::Bytes;
use indexmap::IndexMap;

use crate::error::{Error, Result};

/// Upper bound on the capacity reserved from a declared entry size
const MAX_RESERVE: usize = 16 * 1024 * 1024;

const CLASS_SUFFIX: &str = ".class";

/// One archive entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledCode {
    entry_name: String,
    class_name: String,
    bytes: Bytes,
}

impl CompiledCode {
    /// Create an entry, deriving the class name from the entry path
    pub fn new(entry_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let entry_name = entry_name.into();
        let class_name = match entry_name.strip_suffix(CLASS_SUFFIX) {
            Some(stem) => stem.replace('/', "."),
            None => entry_name.clone(),
        };
        Self {
            entry_name,
            class_name,
            bytes: bytes.into(),
        }
    }

    /// Path of the entry inside the archive, e.g. `a/B.class`
    pub fn entry_name(&self) -> &str {
        &self.entry_name
    }

    /// Binary class name, e.g. `a.B` (the entry path for non-class entries)
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Entry payload
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Whether this entry is a class file
    pub fn is_class(&self) -> bool {
        self.entry_name.ends_with(CLASS_SUFFIX)
    }
}

/// All entries of one archive
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledCodeSet {
    main_class: String,
    codes: IndexMap<String, CompiledCode>,
    timestamp: String,
}

impl CompiledCodeSet {
    /// Create an empty set
    pub fn new(main_class: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            main_class: main_class.into(),
            codes: IndexMap::new(),
            timestamp: timestamp.into(),
        }
    }

    /// Unpack a JAR archive
    ///
    /// Directories are skipped. Each payload is read to its end whatever
    /// size the entry declares; the declared size only sizes the buffer and
    /// must agree with what was read. Any malformed entry fails the whole
    /// load.
    pub fn from_jar(
        data: &[u8],
        main_class: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
        let mut set = Self::new(main_class, timestamp);

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let declared = entry.size();

            let mut bytes = Vec::with_capacity(usize::try_from(declared).unwrap_or(0).min(MAX_RESERVE));
            entry
                .read_to_end(&mut bytes)
                .map_err(|e| Error::CodeLoad(format!("failed to read {}: {}", name, e)))?;
            if bytes.len() as u64 != declared {
                return Err(Error::CodeLoad(format!(
                    "{} declares {} bytes but holds {}",
                    name,
                    declared,
                    bytes.len()
                )));
            }
            set.insert(CompiledCode::new(name, bytes))?;
        }

        tracing::debug!(
            main_class = %set.main_class,
            entries = set.codes.len(),
            timestamp = %set.timestamp,
            "Loaded compiled code set"
        );
        Ok(set)
    }

    /// Add an entry; a second entry with the same path is rejected
    pub fn insert(&mut self, code: CompiledCode) -> Result<()> {
        if self.codes.contains_key(code.entry_name()) {
            return Err(Error::CodeLoad(format!(
                "duplicate archive entry {}",
                code.entry_name()
            )));
        }
        self.codes.insert(code.entry_name.clone(), code);
        Ok(())
    }

    /// Take over the entries of another set, replacing same-named ones
    pub fn merge(&mut self, other: CompiledCodeSet) {
        self.codes.extend(other.codes);
    }

    /// Main class name
    pub fn main_class(&self) -> &str {
        &self.main_class
    }

    /// Catalog timestamp the set was loaded for
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Look up an entry by archive path
    pub fn get(&self, entry_name: &str) -> Option<&CompiledCode> {
        self.codes.get(entry_name)
    }

    /// Look up a class entry by binary class name
    pub fn get_class(&self, class_name: &str) -> Option<&CompiledCode> {
        self.codes
            .values()
            .find(|c| c.is_class() && c.class_name == class_name)
    }

    /// The entry for the main class
    pub fn main_code(&self) -> Option<&CompiledCode> {
        self.get_class(&self.main_class)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Check if the set has no entries
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Iterate entries in archive order
    pub fn iter(&self) -> impl Iterator<Item = &CompiledCode> {
        self.codes.values()
    }

    /// Iterate class entries only
    pub fn classes(&self) -> impl Iterator<Item = &CompiledCode> {
        self.codes.values().filter(|c| c.is_class())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_name_from_entry_path() {
        let code = CompiledCode::new("com/acme/Sales.class", vec![0xca, 0xfe]);
        assert_eq!(code.class_name(), "com.acme.Sales");
        assert!(code.is_class());

        let res = CompiledCode::new("META-INF/MANIFEST.MF", vec![]);
        assert_eq!(res.class_name(), "META-INF/MANIFEST.MF");
        assert!(!res.is_class());
    }

    #[test]
    fn test_duplicate_entry_rejected() {
        let mut set = CompiledCodeSet::new("a.B", "1");
        set.insert(CompiledCode::new("a/B.class", vec![1])).unwrap();
        assert!(matches!(
            set.insert(CompiledCode::new("a/B.class", vec![2])),
            Err(Error::CodeLoad(_))
        ));
    }

    #[test]
    fn test_merge_replaces() {
        let mut set = CompiledCodeSet::new("a.B", "1");
        set.insert(CompiledCode::new("a/B.class", vec![1])).unwrap();
        let mut other = CompiledCodeSet::new("a.B", "1");
        other.insert(CompiledCode::new("a/B.class", vec![2])).unwrap();
        other.insert(CompiledCode::new("a/C.class", vec![3])).unwrap();
        set.merge(other);
        assert_eq!(set.len(), 2);
        assert_eq!(set.main_code().unwrap().bytes().as_ref(), &[2]);
    }

    #[test]
    fn test_garbage_is_not_an_archive() {
        assert!(matches!(
            CompiledCodeSet::from_jar(b"not a zip file", "a.B", "1"),
            Err(Error::Zip(_))
        ));
    }
}
