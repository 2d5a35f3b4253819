//! Cache owned by a single object.
//!
//! An [`InstanceCache`] is embedded by value in the type that uses it. It is
//! created empty with its owner and dropped with it; two owners never see each
//! other's entries. All mutation goes through `&mut self`, so no locking is
//! involved.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::convert::Infallible;

use chrono::{DateTime, Utc};

use super::entry::{CacheStats, CachedValue, Counters};
use super::key::{CacheKey, KeyEncoding};
use crate::types::config::CacheConfig;

/// Per-instance get-or-compute cache.
#[derive(Debug)]
pub struct InstanceCache<V> {
    entries: HashMap<String, CachedValue<V>>,
    encoding: KeyEncoding,
    counters: Counters,
}

impl<V> Default for InstanceCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> InstanceCache<V> {
    /// Creates an empty cache with the default key encoding.
    pub fn new() -> Self {
        Self::with_encoding(KeyEncoding::default())
    }

    /// Creates an empty cache using `encoding` for its keys.
    pub fn with_encoding(encoding: KeyEncoding) -> Self {
        Self {
            entries: HashMap::new(),
            encoding,
            counters: Counters::new(true),
        }
    }

    /// Creates an empty cache from configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            encoding: config.key_encoding,
            counters: Counters::new(config.track_stats),
        }
    }

    /// Key encoding in use.
    pub fn encoding(&self) -> KeyEncoding {
        self.encoding
    }

    /// Normalizes a key the way this cache does.
    pub fn normalize<K: CacheKey + ?Sized>(&self, key: &K) -> String {
        self.encoding.normalize(key)
    }

    /// Returns the cached value, running `producer` on a miss.
    ///
    /// If `producer` fails, its error is returned as is and nothing is stored,
    /// so the next call runs a producer again.
    pub fn get_or_try_compute_ref<K, F, E>(&mut self, key: &K, producer: F) -> Result<&V, E>
    where
        K: CacheKey + ?Sized,
        F: FnOnce() -> Result<V, E>,
    {
        let key = self.encoding.normalize(key);
        match self.entries.entry(key) {
            Entry::Occupied(entry) => {
                self.counters.hit();
                tracing::trace!(key = %entry.key(), "instance cache hit");
                Ok(&entry.into_mut().value)
            }
            Entry::Vacant(entry) => {
                self.counters.miss();
                tracing::debug!(key = %entry.key(), "instance cache miss");
                match producer() {
                    Ok(value) => Ok(&entry.insert(CachedValue::new(value)).value),
                    Err(e) => {
                        self.counters.failure();
                        tracing::debug!(key = %entry.key(), "producer failed, nothing cached");
                        Err(e)
                    }
                }
            }
        }
    }

    /// Infallible form of [`get_or_try_compute_ref`](Self::get_or_try_compute_ref).
    pub fn get_or_compute_ref<K, F>(&mut self, key: &K, producer: F) -> &V
    where
        K: CacheKey + ?Sized,
        F: FnOnce() -> V,
    {
        match self.get_or_try_compute_ref(key, || Ok::<V, Infallible>(producer())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Returns the stored value if present. Does not touch statistics.
    pub fn get<K: CacheKey + ?Sized>(&self, key: &K) -> Option<&V> {
        self.entries
            .get(&self.encoding.normalize(key))
            .map(|c| &c.value)
    }

    /// Checks whether a value is stored under `key`.
    pub fn contains<K: CacheKey + ?Sized>(&self, key: &K) -> bool {
        self.entries.contains_key(&self.encoding.normalize(key))
    }

    /// When the value under `key` was stored.
    pub fn cached_at<K: CacheKey + ?Sized>(&self, key: &K) -> Option<DateTime<Utc>> {
        self.entries
            .get(&self.encoding.normalize(key))
            .map(|c| c.cached_at)
    }

    /// Removes the entry under `key`. Returns whether one was present.
    pub fn invalidate<K: CacheKey + ?Sized>(&mut self, key: &K) -> bool {
        let key = self.encoding.normalize(key);
        let removed = self.entries.remove(&key).is_some();
        tracing::debug!(key = %key, removed, "instance cache invalidate");
        removed
    }

    /// Removes every entry.
    pub fn invalidate_all(&mut self) {
        tracing::debug!(entries = self.entries.len(), "instance cache cleared");
        self.entries.clear();
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Normalized keys of stored entries, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.entries.len())
    }

    /// Hit path for an already normalized key.
    pub(crate) fn lookup_normalized(&self, key: &str) -> Option<&V> {
        let cached = self.entries.get(key)?;
        self.counters.hit();
        tracing::trace!(key = %key, "instance cache hit");
        Some(&cached.value)
    }

    /// Miss path for an already normalized key: records the producer outcome.
    pub(crate) fn complete<E>(&mut self, key: String, result: Result<V, E>) -> Result<&V, E> {
        self.counters.miss();
        match result {
            Ok(value) => {
                tracing::debug!(key = %key, "instance cache miss, value stored");
                let slot = match self.entries.entry(key) {
                    Entry::Occupied(mut entry) => {
                        entry.insert(CachedValue::new(value));
                        entry.into_mut()
                    }
                    Entry::Vacant(entry) => entry.insert(CachedValue::new(value)),
                };
                Ok(&slot.value)
            }
            Err(e) => {
                self.counters.failure();
                tracing::debug!(key = %key, "producer failed, nothing cached");
                Err(e)
            }
        }
    }
}

impl<V: Clone> InstanceCache<V> {
    /// Returns a clone of the cached value, running `producer` on a miss.
    pub fn get_or_compute<K, F>(&mut self, key: &K, producer: F) -> V
    where
        K: CacheKey + ?Sized,
        F: FnOnce() -> V,
    {
        self.get_or_compute_ref(key, producer).clone()
    }

    /// Fallible form of [`get_or_compute`](Self::get_or_compute).
    pub fn get_or_try_compute<K, F, E>(&mut self, key: &K, producer: F) -> Result<V, E>
    where
        K: CacheKey + ?Sized,
        F: FnOnce() -> Result<V, E>,
    {
        self.get_or_try_compute_ref(key, producer).cloned()
    }
}
