//! Cache shared by every holder of the same handle.
//!
//! A [`SharedCache`] is a cheap-to-clone handle to one map that lives as long
//! as any handle does; creating it at startup and passing it down gives it
//! process lifetime. Each key owns its own slot lock: the map lock is only held
//! to find or create a slot. Hits share the slot's read lock and the producer
//! runs under its write lock alone. Concurrent first accesses to one key
//! therefore run the producer once, while producers for other keys proceed in
//! parallel.
//!
//! A producer must not ask the same cache for its own key; that call would wait
//! on the slot it is filling.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};

use super::entry::{CacheStats, CachedValue, Counters};
use super::key::{CacheKey, KeyEncoding};
use crate::types::config::CacheConfig;

/// An empty slot is either being filled or about to be filled by a waiting
/// caller. Slots emptied by a failed or panicking producer are pruned.
type Slot<V> = Arc<RwLock<Option<CachedValue<V>>>>;

struct Inner<V> {
    slots: Mutex<HashMap<String, Slot<V>>>,
    encoding: KeyEncoding,
    counters: Counters,
}

/// Process-wide get-or-compute cache handle.
pub struct SharedCache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for SharedCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Default for SharedCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for SharedCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCache")
            .field("encoding", &self.inner.encoding)
            .field("len", &self.len())
            .finish()
    }
}

impl<V> SharedCache<V> {
    /// Creates an empty cache with the default key encoding.
    pub fn new() -> Self {
        Self::with_encoding(KeyEncoding::default())
    }

    /// Creates an empty cache using `encoding` for its keys.
    pub fn with_encoding(encoding: KeyEncoding) -> Self {
        Self::build(encoding, true)
    }

    /// Creates an empty cache from configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::build(config.key_encoding, config.track_stats)
    }

    fn build(encoding: KeyEncoding, track_stats: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(HashMap::new()),
                encoding,
                counters: Counters::new(track_stats),
            }),
        }
    }

    /// Key encoding in use.
    pub fn encoding(&self) -> KeyEncoding {
        self.inner.encoding
    }

    /// Whether both handles point at the same map.
    pub fn same_cache(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn slot(&self, key: &str) -> Slot<V> {
        let mut slots = self.inner.slots.lock();
        Arc::clone(slots.entry(key.to_string()).or_default())
    }

    /// Drops an empty slot left by a failed producer, unless another caller
    /// holds it.
    ///
    /// Handles are only cloned under the map lock, so with that lock held a
    /// strong count of two means the map and the failing caller are the only
    /// holders.
    fn prune(&self, key: &str, slot: &Slot<V>) {
        let mut slots = self.inner.slots.lock();
        let still_ours = slots.get(key).is_some_and(|s| Arc::ptr_eq(s, slot));
        let unshared = Arc::strong_count(slot) == 2;
        let empty = slot.try_read().is_some_and(|guard| guard.is_none());
        if still_ours && unshared && empty {
            slots.remove(key);
        }
    }

    /// Removes the entry under `key`. Returns whether a value was stored.
    ///
    /// A value still being computed is not counted as stored; the caller
    /// computing it receives it, but it is not kept.
    pub fn invalidate<K: CacheKey + ?Sized>(&self, key: &K) -> bool {
        let key = self.inner.encoding.normalize(key);
        let removed = self.inner.slots.lock().remove(&key);
        let was_present = removed.as_ref().is_some_and(filled);
        tracing::debug!(key = %key, removed = was_present, "shared cache invalidate");
        was_present
    }

    /// Removes every entry.
    pub fn invalidate_all(&self) {
        let mut slots = self.inner.slots.lock();
        tracing::debug!(slots = slots.len(), "shared cache cleared");
        slots.clear();
    }

    /// Checks whether a finished value is stored under `key`.
    pub fn contains<K: CacheKey + ?Sized>(&self, key: &K) -> bool {
        let key = self.inner.encoding.normalize(key);
        self.inner
            .slots
            .lock()
            .get(&key)
            .is_some_and(|slot| filled(slot))
    }

    /// When the value under `key` was stored.
    pub fn cached_at<K: CacheKey + ?Sized>(&self, key: &K) -> Option<DateTime<Utc>> {
        let key = self.inner.encoding.normalize(key);
        let slots = self.inner.slots.lock();
        let guard = slots.get(&key)?.try_read()?;
        guard.as_ref().map(|c| c.cached_at)
    }

    /// Number of finished entries.
    pub fn len(&self) -> usize {
        self.inner.slots.lock().values().filter(|s| filled(s)).count()
    }

    /// Whether no finished entry is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Normalized keys of finished entries, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .inner
            .slots
            .lock()
            .iter()
            .filter(|(_, slot)| filled(slot))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.inner.counters.snapshot(self.len())
    }
}

impl<V: Clone> SharedCache<V> {
    /// Returns the cached value, running `producer` on a miss.
    ///
    /// If `producer` fails, its error is returned as is and nothing is stored,
    /// so the next call runs a producer again. A producer panic unwinds to the
    /// caller and leaves the slot empty as well.
    pub fn get_or_try_compute<K, F, E>(&self, key: &K, producer: F) -> Result<V, E>
    where
        K: CacheKey + ?Sized,
        F: FnOnce() -> Result<V, E>,
    {
        let key = self.inner.encoding.normalize(key);
        let slot = self.slot(&key);

        if let Some(value) = self.hit(&key, slot.read().as_ref()) {
            return Ok(value);
        }

        // Declared before the write guard so it runs after the guard is
        // released, including on unwind.
        let mut cleanup = PruneEmptySlot {
            cache: self,
            key: &key,
            slot: &slot,
            armed: true,
        };
        let mut guard = slot.write();

        // Another caller may have filled the slot between the two locks.
        if let Some(value) = self.hit(&key, guard.as_ref()) {
            cleanup.armed = false;
            return Ok(value);
        }

        self.inner.counters.miss();
        tracing::debug!(key = %key, "shared cache miss");
        match producer() {
            Ok(value) => {
                *guard = Some(CachedValue::new(value.clone()));
                cleanup.armed = false;
                Ok(value)
            }
            Err(e) => {
                drop(guard);
                self.inner.counters.failure();
                tracing::debug!(key = %key, "producer failed, nothing cached");
                Err(e)
            }
        }
    }

    fn hit(&self, key: &str, cached: Option<&CachedValue<V>>) -> Option<V> {
        let cached = cached?;
        self.inner.counters.hit();
        tracing::trace!(key = %key, "shared cache hit");
        Some(cached.value.clone())
    }

    /// Infallible form of [`get_or_try_compute`](Self::get_or_try_compute).
    pub fn get_or_compute<K, F>(&self, key: &K, producer: F) -> V
    where
        K: CacheKey + ?Sized,
        F: FnOnce() -> V,
    {
        match self.get_or_try_compute(key, || Ok::<V, Infallible>(producer())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Returns the stored value without computing. Waits for an in-flight
    /// producer of the same key. Does not touch statistics.
    pub fn peek<K: CacheKey + ?Sized>(&self, key: &K) -> Option<V> {
        let key = self.inner.encoding.normalize(key);
        let slot = Arc::clone(self.inner.slots.lock().get(&key)?);
        let guard = slot.read();
        guard.as_ref().map(|c| c.value.clone())
    }
}

/// Prunes the slot on drop unless disarmed, so a failed or panicking producer
/// leaves no empty slot behind.
struct PruneEmptySlot<'a, V> {
    cache: &'a SharedCache<V>,
    key: &'a str,
    slot: &'a Slot<V>,
    armed: bool,
}

impl<V> Drop for PruneEmptySlot<'_, V> {
    fn drop(&mut self) {
        if self.armed {
            self.cache.prune(self.key, self.slot);
        }
    }
}

/// A slot counts as filled when it holds a value and nobody is filling it.
/// Readers cloning a hit do not hide the value.
fn filled<V>(slot: &Slot<V>) -> bool {
    slot.try_read().is_some_and(|guard| guard.is_some())
}
