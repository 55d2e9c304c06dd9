//! Element Factory
//!
//! Turns a node's type name into a live element:
//! 1. Registered builder (one map lookup under a read lock)
//! 2. Dynamic resolution through a [`TypeResolver`], trying the name as
//!    written when qualified, else each search prefix and then the bare name
//!
//! A resolved builder is cached under the requested name and becomes a
//! registered builder. Every failure is remembered per name and returned
//! again, without resolving or constructing, until [`ElementFactory::clear`].

pub mod catalog;

pub use catalog::{BuildFn, Constructor, ContextFn, TypeCatalog, TypeDescriptor, TypeResolver};

use crate::config::DEFAULT_SEARCH_PREFIXES;
use crate::element::{BuildContext, Element};
use crate::error::{BoxError, FactoryError};
use crate::tree::Attributes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Type-name to element registry with positive and negative caching
pub struct ElementFactory {
    builders: RwLock<HashMap<String, Arc<BuildFn>>>,
    failures: RwLock<HashMap<String, FactoryError>>,
    resolver: Arc<dyn TypeResolver>,
    search_prefixes: Vec<String>,
    resolutions: AtomicU64,
}

impl ElementFactory {
    /// Factory resolving through `resolver` with the default search prefixes
    pub fn new(resolver: Arc<dyn TypeResolver>) -> Self {
        Self::with_prefixes(
            resolver,
            DEFAULT_SEARCH_PREFIXES.iter().map(|p| p.to_string()).collect(),
        )
    }

    pub fn with_prefixes(resolver: Arc<dyn TypeResolver>, search_prefixes: Vec<String>) -> Self {
        ElementFactory {
            builders: RwLock::new(HashMap::new()),
            failures: RwLock::new(HashMap::new()),
            resolver,
            search_prefixes,
            resolutions: AtomicU64::new(0),
        }
    }

    /// Register a builder under `type_name`, replacing any cached outcome
    pub fn register<F>(&self, type_name: impl Into<String>, builder: F)
    where
        F: Fn(&BuildContext, &Attributes) -> Result<Box<dyn Element>, BoxError> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        self.failures.write().remove(&type_name);
        self.builders.write().insert(type_name, Arc::new(builder));
    }

    /// Build an element for `type_name`
    pub fn create(
        &self,
        type_name: &str,
        ctx: &BuildContext,
        attributes: &Attributes,
    ) -> Result<Box<dyn Element>, FactoryError> {
        if let Some(err) = self.failures.read().get(type_name) {
            return Err(err.clone());
        }

        let cached = self.builders.read().get(type_name).cloned();
        let builder = match cached {
            Some(builder) => builder,
            None => {
                let resolved = self.resolve(type_name).map_err(|e| self.remember(type_name, e))?;
                // A racing resolver may have won; keep the first
                let mut builders = self.builders.write();
                Arc::clone(builders.entry(type_name.to_string()).or_insert(resolved))
            }
        };

        builder(ctx, attributes).map_err(|cause| {
            self.remember(
                type_name,
                FactoryError::ConstructionFailed {
                    type_name: type_name.to_string(),
                    cause: Arc::from(cause),
                },
            )
        })
    }

    /// Resolve without constructing; the outcome is cached like `create`'s
    pub fn preload(&self, type_name: &str) -> Result<(), FactoryError> {
        if let Some(err) = self.failures.read().get(type_name) {
            return Err(err.clone());
        }
        if self.builders.read().contains_key(type_name) {
            return Ok(());
        }
        let resolved = self.resolve(type_name).map_err(|e| self.remember(type_name, e))?;
        self.builders
            .write()
            .entry(type_name.to_string())
            .or_insert(resolved);
        Ok(())
    }

    /// Whether `type_name` has a cached builder
    pub fn is_cached(&self, type_name: &str) -> bool {
        self.builders.read().contains_key(type_name)
    }

    /// Whether `type_name` has a cached failure
    pub fn is_failed(&self, type_name: &str) -> bool {
        self.failures.read().contains_key(type_name)
    }

    /// Names with a cached builder, sorted
    pub fn cached_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.builders.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Dynamic resolutions performed so far
    pub fn resolutions(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    /// Forget every cached builder and failure, registered builders included
    pub fn clear(&self) {
        self.builders.write().clear();
        self.failures.write().clear();
    }

    /// Qualified names tried for `type_name`, in order
    pub fn candidates(&self, type_name: &str) -> Vec<String> {
        if type_name.contains('.') {
            return vec![type_name.to_string()];
        }
        self.search_prefixes
            .iter()
            .map(|prefix| format!("{}{}", prefix, type_name))
            .chain(std::iter::once(type_name.to_string()))
            .collect()
    }

    fn resolve(&self, type_name: &str) -> Result<Arc<BuildFn>, FactoryError> {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        let descriptor = self
            .candidates(type_name)
            .iter()
            .find_map(|name| self.resolver.resolve(name))
            .ok_or_else(|| FactoryError::TypeNotFound(type_name.to_string()))?;

        descriptor
            .select_builder()
            .ok_or_else(|| FactoryError::NoUsableConstructor(descriptor.name().to_string()))
    }

    fn remember(&self, type_name: &str, err: FactoryError) -> FactoryError {
        self.failures
            .write()
            .insert(type_name.to_string(), err.clone());
        err
    }
}

impl fmt::Debug for ElementFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementFactory")
            .field("cached", &self.builders.read().len())
            .field("failed", &self.failures.read().len())
            .field("search_prefixes", &self.search_prefixes)
            .finish()
    }
}
