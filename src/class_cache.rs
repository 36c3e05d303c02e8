//! Process-wide cache of loaded classes
//!
//! One [`ClassCache`] is created at startup and shared as an `Arc` by every
//! invocation. Loading a newer version of a code set replaces that set's
//! entries and evicts the classes the new version no longer contains.
//! Nothing else is evicted.

use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;

/// A class held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryClass {
    /// Binary class name
    pub name: String,
    /// Class file bytes
    pub bytes: Bytes,
    /// Catalog timestamp of the code set the class came from
    pub version: String,
    /// Main class of that code set
    pub main_class: String,
}

impl MemoryClass {
    /// Create a new cache entry
    pub fn new(
        name: impl Into<String>,
        bytes: impl Into<Bytes>,
        version: impl Into<String>,
        main_class: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            version: version.into(),
            main_class: main_class.into(),
        }
    }
}

/// Concurrent class-name to class map
#[derive(Debug, Default)]
pub struct ClassCache {
    classes: DashMap<String, Arc<MemoryClass>>,
}

impl ClassCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a class by name
    pub fn get_by_class_name(&self, name: &str) -> Option<Arc<MemoryClass>> {
        self.classes.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Insert or replace a class, returning the previous entry
    pub fn put(&self, class: MemoryClass) -> Option<Arc<MemoryClass>> {
        let class = Arc::new(class);
        let previous = self.classes.insert(class.name.clone(), Arc::clone(&class));
        if let Some(old) = &previous {
            tracing::trace!(class = %class.name, from = %old.version, to = %class.version, "Replaced cached class");
        }
        previous
    }

    /// Publish one loaded code set
    ///
    /// Helper classes go in first, then entries an older version of the same
    /// set left behind are evicted, and the main class goes in last. A caller
    /// that finds the new main class therefore also finds its siblings.
    pub fn replace_set(&self, main: MemoryClass, siblings: Vec<MemoryClass>) -> Arc<MemoryClass> {
        for class in siblings {
            self.put(class);
        }

        let mut evicted = 0usize;
        self.classes.retain(|_, class| {
            let keep = class.main_class != main.main_class || class.version == main.version;
            if !keep {
                evicted += 1;
            }
            keep
        });
        if evicted > 0 {
            tracing::debug!(
                main_class = %main.main_class,
                version = %main.version,
                evicted = evicted,
                "Evicted stale classes"
            );
        }

        let main = Arc::new(main);
        self.classes.insert(main.name.clone(), Arc::clone(&main));
        main
    }

    /// Remove a class
    pub fn remove(&self, name: &str) -> Option<Arc<MemoryClass>> {
        self.classes.remove(name).map(|(_, class)| class)
    }

    /// Number of cached classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.classes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_overwrites() {
        let cache = ClassCache::new();
        assert!(cache.put(MemoryClass::new("a.B", vec![1], "1", "a.B")).is_none());
        let old = cache.put(MemoryClass::new("a.B", vec![2], "2", "a.B")).unwrap();
        assert_eq!(old.version, "1");
        assert_eq!(cache.get_by_class_name("a.B").unwrap().version, "2");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = ClassCache::new();
        cache.put(MemoryClass::new("a.B", vec![], "1", "a.B"));
        cache.put(MemoryClass::new("a.C", vec![], "1", "a.B"));
        assert!(cache.remove("a.B").is_some());
        assert!(cache.get_by_class_name("a.B").is_none());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_replace_set_evicts_stale_siblings() {
        let cache = ClassCache::new();
        cache.replace_set(
            MemoryClass::new("a.B", vec![1], "1", "a.B"),
            vec![MemoryClass::new("a.C", vec![1], "1", "a.B")],
        );
        cache.put(MemoryClass::new("x.Y", vec![9], "1", "x.Y"));
        assert_eq!(cache.len(), 3);

        let main = cache.replace_set(MemoryClass::new("a.B", vec![2], "2", "a.B"), vec![]);
        assert_eq!(main.version, "2");
        assert!(cache.get_by_class_name("a.C").is_none());
        // other sets are untouched
        assert_eq!(cache.get_by_class_name("x.Y").unwrap().version, "1");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_concurrent_puts() {
        let cache = Arc::new(ClassCache::new());
        let threads: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        cache.put(MemoryClass::new(format!("c{}", i), vec![], t.to_string(), "m"));
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(cache.len(), 100);
    }
}
