//! Signature to class resolution
//!
//! Checks the catalog timestamp on every resolve and only reloads the
//! archive when the cached classes belong to a different version.

use std::sync::Arc;

use crate::catalog::{CodeRepository, SqlConnection};
use crate::class_cache::{ClassCache, MemoryClass};
use crate::code::Signature;
use crate::error::{Error, Result};

/// Resolves signatures against the catalog and the shared class cache
#[derive(Debug)]
pub struct CodeResolver<C> {
    repository: CodeRepository<C>,
    cache: Arc<ClassCache>,
}

impl<C: SqlConnection> CodeResolver<C> {
    /// Create a resolver
    pub fn new(repository: CodeRepository<C>, cache: Arc<ClassCache>) -> Self {
        Self { repository, cache }
    }

    /// Get the shared class cache
    pub fn cache(&self) -> &Arc<ClassCache> {
        &self.cache
    }

    /// Get the catalog repository
    pub fn repository(&self) -> &CodeRepository<C> {
        &self.repository
    }

    /// Resolve the main class of a signature, loading it if stale
    pub async fn resolve(&self, signature: &Signature) -> Result<Arc<MemoryClass>> {
        let name = signature.code_name();
        let version = self
            .repository
            .get_transaction_key(name)
            .await?
            .ok_or_else(|| Error::NoSuchCompiledCode(name.to_string()))?;

        if let Some(class) = self.cache.get_by_class_name(signature.class_name()) {
            if class.version == version {
                tracing::trace!(class = %class.name, version = %version, "Class cache hit");
                return Ok(class);
            }
        }

        let set = self
            .repository
            .get_object_code(signature)
            .await?
            .ok_or_else(|| Error::NoSuchCompiledCode(name.to_string()))?;
        if set.main_code().is_none() {
            return Err(Error::CodeLoad(format!(
                "archive for {} does not contain {}",
                name,
                signature.class_name()
            )));
        }

        let mut main = None;
        let mut siblings = Vec::with_capacity(set.len().saturating_sub(1));
        for code in set.classes() {
            let class = MemoryClass::new(
                code.class_name(),
                code.bytes().clone(),
                set.timestamp(),
                set.main_class(),
            );
            if code.class_name() == set.main_class() {
                main = Some(class);
            } else {
                siblings.push(class);
            }
        }
        let main = main.ok_or_else(|| {
            Error::CodeLoad(format!("archive for {} has no class {}", name, set.main_class()))
        })?;

        let count = siblings.len() + 1;
        let main = self.cache.replace_set(main, siblings);
        tracing::debug!(name = name, version = %set.timestamp(), classes = count, "Loaded classes");
        Ok(main)
    }
}
