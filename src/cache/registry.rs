//! Process-scoped registry of shared caches.
//!
//! Every component type that adopts the runtime cache gets its own shared map.
//! [`CacheRegistry`] keeps those maps under a namespace (usually the
//! component's type name) so that one registry, created at startup and passed
//! explicitly, owns all process-wide cache state.

use std::any::{type_name, Any};
use std::collections::BTreeMap;

use parking_lot::Mutex;

use super::entry::CacheStats;
use super::shared::SharedCache;
use crate::types::config::CacheConfig;
use crate::{RuntimeCacheError, RuntimeCacheResult};

/// Type-erased view of a [`SharedCache`].
trait ErasedCache: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn invalidate_all(&self);
    fn stats(&self) -> CacheStats;
}

impl<V: Send + Sync + 'static> ErasedCache for SharedCache<V> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn invalidate_all(&self) {
        SharedCache::invalidate_all(self);
    }

    fn stats(&self) -> CacheStats {
        SharedCache::stats(self)
    }
}

struct Namespace {
    cache: Box<dyn ErasedCache>,
    value_type: &'static str,
}

/// Owner of all process-wide caches, one per namespace.
pub struct CacheRegistry {
    namespaces: Mutex<BTreeMap<String, Namespace>>,
    config: CacheConfig,
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("namespaces", &self.namespaces())
            .field("config", &self.config)
            .finish()
    }
}

impl CacheRegistry {
    /// Creates an empty registry with default cache settings.
    pub fn new() -> Self {
        Self::from_config(&CacheConfig::default())
    }

    /// Creates an empty registry whose caches use `config`.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            namespaces: Mutex::new(BTreeMap::new()),
            config: config.clone(),
        }
    }

    /// Returns the shared cache of `namespace`, creating it on first use.
    ///
    /// Fails with [`RuntimeCacheError::TypeMismatch`] if the namespace already
    /// holds values of another type.
    pub fn shared<V: Send + Sync + 'static>(&self, namespace: &str) -> RuntimeCacheResult<SharedCache<V>> {
        let mut namespaces = self.namespaces.lock();

        if let Some(existing) = namespaces.get(namespace) {
            return existing
                .cache
                .as_any()
                .downcast_ref::<SharedCache<V>>()
                .cloned()
                .ok_or_else(|| RuntimeCacheError::TypeMismatch {
                    namespace: namespace.to_string(),
                    existing: existing.value_type,
                    requested: type_name::<V>(),
                });
        }

        let cache = SharedCache::from_config(&self.config);
        tracing::debug!(
            namespace = %namespace,
            value_type = type_name::<V>(),
            "shared cache namespace created"
        );
        namespaces.insert(
            namespace.to_string(),
            Namespace {
                cache: Box::new(cache.clone()),
                value_type: type_name::<V>(),
            },
        );
        Ok(cache)
    }

    /// Returns the shared cache of the component type `T`.
    pub fn shared_for<T: ?Sized, V: Send + Sync + 'static>(&self) -> RuntimeCacheResult<SharedCache<V>> {
        self.shared(type_name::<T>())
    }

    /// Names of existing namespaces, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        self.namespaces.lock().keys().cloned().collect()
    }

    /// Statistics per namespace.
    pub fn stats(&self) -> BTreeMap<String, CacheStats> {
        self.namespaces
            .lock()
            .iter()
            .map(|(name, ns)| (name.clone(), ns.cache.stats()))
            .collect()
    }

    /// Clears the entries of one namespace. The namespace itself stays.
    pub fn invalidate_namespace(&self, namespace: &str) {
        if let Some(ns) = self.namespaces.lock().get(namespace) {
            ns.cache.invalidate_all();
        }
    }

    /// Clears the entries of every namespace.
    pub fn invalidate_all(&self) {
        for ns in self.namespaces.lock().values() {
            ns.cache.invalidate_all();
        }
    }
}
