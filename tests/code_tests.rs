//! Tests for compiled code loading
//!
//! Covers archive unpacking, catalog lookups over a fake SQL connection and
//! resolution into the shared class cache.

use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use base64::Engine;
use parking_lot::Mutex;

use pl_runtime::{
    CatalogConfig, CatalogErrorPolicy, ClassCache, CodeRepository, CodeResolver, CompiledCodeSet,
    Error, Result, Row, Signature, SqlConnection, Value,
};

// =============================================================================
// Archive builder
// =============================================================================

/// Writes stored (uncompressed) entries by hand so entries can carry a data
/// descriptor, i.e. no size in the local header.
struct JarBuilder {
    body: Vec<u8>,
    central: Vec<u8>,
    count: u16,
}

fn le16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn le32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

impl JarBuilder {
    fn new() -> Self {
        Self {
            body: Vec::new(),
            central: Vec::new(),
            count: 0,
        }
    }

    fn entry(mut self, name: &str, data: &[u8], descriptor: bool) -> Self {
        let offset = self.body.len() as u32;
        let crc = crc32fast::hash(data);
        let size = data.len() as u32;
        let flags: u16 = if descriptor { 0x0008 } else { 0 };

        let b = &mut self.body;
        le32(b, 0x0403_4b50);
        le16(b, 20);
        le16(b, flags);
        le16(b, 0); // stored
        le16(b, 0);
        le16(b, 0x21);
        if descriptor {
            le32(b, 0);
            le32(b, 0);
            le32(b, 0);
        } else {
            le32(b, crc);
            le32(b, size);
            le32(b, size);
        }
        le16(b, name.len() as u16);
        le16(b, 0);
        b.extend_from_slice(name.as_bytes());
        b.extend_from_slice(data);
        if descriptor {
            le32(b, 0x0807_4b50);
            le32(b, crc);
            le32(b, size);
            le32(b, size);
        }

        let c = &mut self.central;
        le32(c, 0x0201_4b50);
        le16(c, 20);
        le16(c, 20);
        le16(c, flags);
        le16(c, 0);
        le16(c, 0);
        le16(c, 0x21);
        le32(c, crc);
        le32(c, size);
        le32(c, size);
        le16(c, name.len() as u16);
        le16(c, 0);
        le16(c, 0);
        le16(c, 0);
        le16(c, 0);
        le32(c, 0);
        le32(c, offset);
        c.extend_from_slice(name.as_bytes());

        self.count += 1;
        self
    }

    fn finish(self) -> Vec<u8> {
        let mut out = self.body;
        let cd_offset = out.len() as u32;
        let cd_size = self.central.len() as u32;
        out.extend_from_slice(&self.central);
        le32(&mut out, 0x0605_4b50);
        le16(&mut out, 0);
        le16(&mut out, 0);
        le16(&mut out, self.count);
        le16(&mut out, self.count);
        le32(&mut out, cd_size);
        le32(&mut out, cd_offset);
        le16(&mut out, 0);
        out
    }
}

/// `a/B.class` with its size declared, `a/C.class` behind a data descriptor
fn sample_jar() -> Vec<u8> {
    JarBuilder::new()
        .entry("a/", &[], false)
        .entry("a/B.class", &[0xb0; 120], false)
        .entry("a/C.class", &[0xc0; 340], true)
        .finish()
}

// =============================================================================
// Fake catalog connection
// =============================================================================

#[derive(Clone)]
struct CatalogRow {
    created_time: Value,
    is_static: Value,
    is_system_generated: Value,
    ocode: Value,
}

#[derive(Clone, Default)]
struct FakeCatalog {
    rows: Arc<Mutex<HashMap<String, CatalogRow>>>,
    code_queries: Arc<AtomicUsize>,
    fail: bool,
}

impl FakeCatalog {
    fn with_code(name: &str, created_time: &str, jar: &[u8]) -> Self {
        let catalog = Self::default();
        catalog.set(name, created_time, jar);
        catalog
    }

    fn set(&self, name: &str, created_time: &str, jar: &[u8]) {
        let encoded = base64::engine::general_purpose::STANDARD.encode(jar);
        self.rows.lock().insert(
            name.to_string(),
            CatalogRow {
                created_time: Value::from(created_time),
                is_static: Value::Int(1),
                is_system_generated: Value::Int(0),
                ocode: Value::from(encoded),
            },
        );
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
impl SqlConnection for FakeCatalog {
    async fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        if self.fail {
            return Err(Error::server(-1000, "catalog unavailable"));
        }
        let name = params[0].as_str().expect("name parameter");
        let rows = self.rows.lock();
        let Some(row) = rows.get(name) else {
            return Ok(Vec::new());
        };
        let values = if sql.starts_with("SELECT created_time, is_static, is_system_generated ") {
            vec![
                row.created_time.clone(),
                row.is_static.clone(),
                row.is_system_generated.clone(),
            ]
        } else if sql.starts_with("SELECT created_time ") {
            vec![row.created_time.clone()]
        } else if sql.starts_with("SELECT ocode ") {
            self.code_queries.fetch_add(1, Ordering::SeqCst);
            vec![row.ocode.clone()]
        } else {
            panic!("unexpected catalog query: {}", sql);
        };
        assert!(sql.contains("FROM _db_stored_procedure_code WHERE name = ?"));
        Ok(vec![Row::new(1, None, values)])
    }
}

fn repository(catalog: FakeCatalog) -> CodeRepository<FakeCatalog> {
    CodeRepository::new(catalog, CatalogConfig::new())
}

// =============================================================================
// Tests
// =============================================================================

mod jar_tests {
    use super::*;

    #[test]
    fn test_descriptor_and_declared_sizes() {
        let set = CompiledCodeSet::from_jar(&sample_jar(), "a.B", "1690000000").unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("a/B.class").unwrap().bytes().as_ref(), &[0xb0; 120][..]);
        assert_eq!(set.get("a/C.class").unwrap().bytes().as_ref(), &[0xc0; 340][..]);
        assert_eq!(set.main_code().unwrap().entry_name(), "a/B.class");
        assert_eq!(set.get_class("a.C").unwrap().entry_name(), "a/C.class");
        assert!(set.get("a/").is_none());
    }

    #[test]
    fn test_deflated_archive() {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        writer.add_directory("com/acme/", options).unwrap();
        writer.start_file("com/acme/Sales.class", options).unwrap();
        let class: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        writer.write_all(&class).unwrap();
        writer.start_file("META-INF/MANIFEST.MF", options).unwrap();
        writer.write_all(b"Manifest-Version: 1.0\n").unwrap();
        let jar = writer.finish().unwrap().into_inner();

        let set = CompiledCodeSet::from_jar(&jar, "com.acme.Sales", "2").unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.classes().count(), 1);
        assert_eq!(set.main_code().unwrap().bytes().as_ref(), &class[..]);
    }

    #[test]
    fn test_truncated_archive_fails() {
        let jar = sample_jar();
        let truncated = &jar[..jar.len() - 10];
        assert!(matches!(
            CompiledCodeSet::from_jar(truncated, "a.B", "1"),
            Err(Error::Zip(_))
        ));
    }

    #[test]
    fn test_corrupt_payload_fails() {
        let mut jar = JarBuilder::new()
            .entry("a/B.class", &[0xb0; 120], false)
            .finish();
        // first payload byte sits right after the 30-byte header and the name
        jar[30 + "a/B.class".len()] ^= 0xff;
        assert!(matches!(
            CompiledCodeSet::from_jar(&jar, "a.B", "1"),
            Err(Error::CodeLoad(_))
        ));
    }
}

mod catalog_tests {
    use super::*;

    #[tokio::test]
    async fn test_get_object_code() {
        let repo = repository(FakeCatalog::with_code("MY_PROC", "1690000000", &sample_jar()));
        let sig = Signature::parse("a.B.foo()").unwrap().with_code_name("MY_PROC");

        let set = repo.get_object_code(&sig).await.unwrap().unwrap();
        assert_eq!(set.main_class(), "a.B");
        assert_eq!(set.timestamp(), "1690000000");
        let names: Vec<_> = set.iter().map(|c| c.entry_name()).collect();
        assert_eq!(names, ["a/B.class", "a/C.class"]);
    }

    #[tokio::test]
    async fn test_unknown_name_is_not_found() {
        let repo = repository(FakeCatalog::default());
        let sig = Signature::parse("a.B.foo()").unwrap();
        assert!(repo.get_object_code(&sig).await.unwrap().is_none());
        assert!(repo.get_code_meta("a.B").await.unwrap().is_none());
        assert!(repo.get_object_code_bytes("a.B").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_meta_and_attributes() {
        let repo = repository(FakeCatalog::with_code("MY_PROC", "1690000000", &sample_jar()));
        assert_eq!(
            repo.get_transaction_key("MY_PROC").await.unwrap().as_deref(),
            Some("1690000000")
        );
        let attrs = repo.get_code_attributes("MY_PROC").await.unwrap().unwrap();
        assert_eq!(attrs.timestamp, "1690000000");
        assert!(attrs.is_static);
        assert!(!attrs.is_system_generated);
        assert_eq!(
            repo.get_object_code_bytes("MY_PROC").await.unwrap().unwrap(),
            sample_jar()
        );
    }

    #[tokio::test]
    async fn test_newer_timestamp_is_picked_up() {
        let catalog = FakeCatalog::with_code("MY_PROC", "1690000000", &sample_jar());
        let repo = repository(catalog.clone());
        let sig = Signature::parse("a.B.foo()").unwrap().with_code_name("MY_PROC");

        let first = repo.get_object_code(&sig).await.unwrap().unwrap();
        catalog.set("MY_PROC", "1690000500", &sample_jar());
        let second = repo.get_object_code(&sig).await.unwrap().unwrap();
        assert_eq!(first.timestamp(), "1690000000");
        assert_eq!(second.timestamp(), "1690000500");
    }

    #[tokio::test]
    async fn test_query_failure_propagates_by_default() {
        let repo = repository(FakeCatalog::failing());
        assert!(matches!(
            repo.get_code_meta("MY_PROC").await,
            Err(Error::Server { code: -1000, .. })
        ));
    }

    #[tokio::test]
    async fn test_query_failure_as_not_found_when_configured() {
        let repo = CodeRepository::new(
            FakeCatalog::failing(),
            CatalogConfig::new().error_policy(CatalogErrorPolicy::TreatAsNotFound),
        );
        let sig = Signature::parse("a.B.foo()").unwrap();
        assert!(repo.get_object_code(&sig).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bad_base64_is_an_error() {
        let catalog = FakeCatalog::default();
        catalog.rows.lock().insert(
            "BROKEN".to_string(),
            CatalogRow {
                created_time: Value::from("1"),
                is_static: Value::Int(0),
                is_system_generated: Value::Int(0),
                ocode: Value::from("not*base64"),
            },
        );
        let repo = repository(catalog);
        assert!(matches!(
            repo.get_object_code_bytes("BROKEN").await,
            Err(Error::Base64(_))
        ));
    }
}

mod resolver_tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_caches_every_class() {
        let catalog = FakeCatalog::with_code("MY_PROC", "1690000000", &sample_jar());
        let cache = Arc::new(ClassCache::new());
        let resolver = CodeResolver::new(repository(catalog.clone()), Arc::clone(&cache));
        let sig = Signature::parse("a.B.foo()").unwrap().with_code_name("MY_PROC");

        let class = resolver.resolve(&sig).await.unwrap();
        assert_eq!(class.name, "a.B");
        assert_eq!(class.version, "1690000000");
        assert_eq!(class.bytes.len(), 120);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_by_class_name("a.C").unwrap().main_class, "a.B");

        // same version: served from the cache
        resolver.resolve(&sig).await.unwrap();
        assert_eq!(catalog.code_queries.load(Ordering::SeqCst), 1);

        // newer version: reloaded and replaced
        catalog.set("MY_PROC", "1690000500", &sample_jar());
        let class = resolver.resolve(&sig).await.unwrap();
        assert_eq!(class.version, "1690000500");
        assert_eq!(cache.get_by_class_name("a.C").unwrap().version, "1690000500");
        assert_eq!(catalog.code_queries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reload_evicts_classes_dropped_from_archive() {
        let catalog = FakeCatalog::with_code("MY_PROC", "1", &sample_jar());
        let cache = Arc::new(ClassCache::new());
        let resolver = CodeResolver::new(repository(catalog.clone()), Arc::clone(&cache));
        let sig = Signature::parse("a.B.foo()").unwrap().with_code_name("MY_PROC");
        resolver.resolve(&sig).await.unwrap();
        assert_eq!(cache.get_by_class_name("a.C").unwrap().version, "1");

        let v2 = JarBuilder::new()
            .entry("a/B.class", &[0xb2; 64], false)
            .finish();
        catalog.set("MY_PROC", "2", &v2);
        let class = resolver.resolve(&sig).await.unwrap();
        assert_eq!(class.version, "2");
        assert_eq!(class.bytes.as_ref(), &[0xb2; 64][..]);
        assert!(cache.get_by_class_name("a.C").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_code() {
        let resolver = CodeResolver::new(repository(FakeCatalog::default()), Arc::new(ClassCache::new()));
        let sig = Signature::parse("a.B.foo()").unwrap();
        let err = resolver.resolve(&sig).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_missing_main_class_caches_nothing() {
        let catalog = FakeCatalog::with_code("MY_PROC", "1", &sample_jar());
        let cache = Arc::new(ClassCache::new());
        let resolver = CodeResolver::new(repository(catalog), Arc::clone(&cache));
        let sig = Signature::parse("a.Missing.foo()").unwrap().with_code_name("MY_PROC");

        assert!(matches!(
            resolver.resolve(&sig).await,
            Err(Error::CodeLoad(_))
        ));
        assert!(cache.is_empty());
    }
}
