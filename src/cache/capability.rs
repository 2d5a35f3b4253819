//! Runtime caching as a capability of any type.
//!
//! A type embeds an [`InstanceCache`], holds a [`SharedCache`] handle, and
//! implements the three accessors of [`RuntimeCached`]. In return it gets the
//! get-or-compute and invalidation operations on both scopes.
//!
//! Producers receive `&Self`, so they can read the owner's state while the
//! instance cache is being filled.
//!
//! ```
//! use rtcache::{InstanceCache, RuntimeCached, SharedCache};
//!
//! struct Catalog {
//!     prefix: String,
//!     cache: InstanceCache<String>,
//!     shared: SharedCache<String>,
//! }
//!
//! impl RuntimeCached for Catalog {
//!     type Value = String;
//!
//!     fn instance_cache(&self) -> &InstanceCache<String> {
//!         &self.cache
//!     }
//!
//!     fn instance_cache_mut(&mut self) -> &mut InstanceCache<String> {
//!         &mut self.cache
//!     }
//!
//!     fn shared_cache(&self) -> &SharedCache<String> {
//!         &self.shared
//!     }
//! }
//!
//! let mut catalog = Catalog {
//!     prefix: "item".into(),
//!     cache: InstanceCache::new(),
//!     shared: SharedCache::new(),
//! };
//! let label = catalog.cached(&("label", 7), |c| format!("{}-7", c.prefix));
//! assert_eq!(label, "item-7");
//! ```

use super::instance::InstanceCache;
use super::key::CacheKey;
use super::shared::SharedCache;

/// Process-wide and per-instance get-or-compute for the implementing type.
pub trait RuntimeCached {
    /// Type of cached values.
    type Value: Clone;

    /// The instance's own cache.
    fn instance_cache(&self) -> &InstanceCache<Self::Value>;

    /// Mutable access to the instance's own cache.
    fn instance_cache_mut(&mut self) -> &mut InstanceCache<Self::Value>;

    /// The cache shared with every other holder of the same handle.
    fn shared_cache(&self) -> &SharedCache<Self::Value>;

    /// Shared get-or-compute.
    fn shared_cached<K, F>(&self, key: &K, producer: F) -> Self::Value
    where
        K: CacheKey + ?Sized,
        F: FnOnce(&Self) -> Self::Value,
    {
        self.shared_cache().get_or_compute(key, || producer(self))
    }

    /// Shared get-or-compute with a fallible producer.
    fn shared_try_cached<K, F, E>(&self, key: &K, producer: F) -> Result<Self::Value, E>
    where
        K: CacheKey + ?Sized,
        F: FnOnce(&Self) -> Result<Self::Value, E>,
    {
        self.shared_cache().get_or_try_compute(key, || producer(self))
    }

    /// Removes `key` from the shared cache.
    fn invalidate_shared<K: CacheKey + ?Sized>(&self, key: &K) -> bool {
        self.shared_cache().invalidate(key)
    }

    /// Instance get-or-compute.
    fn cached<K, F>(&mut self, key: &K, producer: F) -> Self::Value
    where
        K: CacheKey + ?Sized,
        F: FnOnce(&Self) -> Self::Value,
    {
        let key = self.instance_cache().normalize(key);
        if let Some(value) = self.instance_cache().lookup_normalized(&key) {
            return value.clone();
        }
        let value = producer(&*self);
        match self.instance_cache_mut().complete(key, Ok::<_, std::convert::Infallible>(value)) {
            Ok(value) => value.clone(),
            Err(never) => match never {},
        }
    }

    /// Instance get-or-compute with a fallible producer.
    fn try_cached<K, F, E>(&mut self, key: &K, producer: F) -> Result<Self::Value, E>
    where
        K: CacheKey + ?Sized,
        F: FnOnce(&Self) -> Result<Self::Value, E>,
    {
        let key = self.instance_cache().normalize(key);
        if let Some(value) = self.instance_cache().lookup_normalized(&key) {
            return Ok(value.clone());
        }
        let result = producer(&*self);
        self.instance_cache_mut().complete(key, result).cloned()
    }

    /// Removes `key` from the instance cache.
    fn invalidate_cached<K: CacheKey + ?Sized>(&mut self, key: &K) -> bool {
        self.instance_cache_mut().invalidate(key)
    }

    /// Clears the instance cache.
    fn invalidate_all_cached(&mut self) {
        self.instance_cache_mut().invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Repo {
        base: u64,
        loads: Cell<u32>,
        cache: InstanceCache<u64>,
        shared: SharedCache<u64>,
    }

    impl Repo {
        fn new(base: u64, shared: &SharedCache<u64>) -> Self {
            Self {
                base,
                loads: Cell::new(0),
                cache: InstanceCache::new(),
                shared: shared.clone(),
            }
        }

        fn load(&self, id: u64) -> u64 {
            self.loads.set(self.loads.get() + 1);
            self.base + id
        }
    }

    impl RuntimeCached for Repo {
        type Value = u64;

        fn instance_cache(&self) -> &InstanceCache<u64> {
            &self.cache
        }

        fn instance_cache_mut(&mut self) -> &mut InstanceCache<u64> {
            &mut self.cache
        }

        fn shared_cache(&self) -> &SharedCache<u64> {
            &self.shared
        }
    }

    #[test]
    fn test_instance_scope_uses_owner_state() {
        let shared = SharedCache::new();
        let mut repo = Repo::new(100, &shared);

        assert_eq!(repo.cached(&("row", 1), |r| r.load(1)), 101);
        assert_eq!(repo.cached(&("row", 1), |r| r.load(1)), 101);
        assert_eq!(repo.loads.get(), 1);
    }

    #[test]
    fn test_instance_scope_is_per_object() {
        let shared = SharedCache::new();
        let mut a = Repo::new(100, &shared);
        let mut b = Repo::new(200, &shared);

        assert_eq!(a.cached("k", |r| r.load(0)), 100);
        assert_eq!(b.cached("k", |r| r.load(0)), 200);
        assert_eq!(a.loads.get(), 1);
        assert_eq!(b.loads.get(), 1);
    }

    #[test]
    fn test_shared_scope_crosses_objects() {
        let shared = SharedCache::new();
        let a = Repo::new(100, &shared);
        let b = Repo::new(200, &shared);

        assert_eq!(a.shared_cached("k", |r| r.load(0)), 100);
        assert_eq!(b.shared_cached("k", |r| r.load(0)), 100);
        assert_eq!(b.loads.get(), 0);

        // Outside of any object.
        assert_eq!(shared.get_or_compute("k", || 0), 100);

        assert!(b.invalidate_shared("k"));
        assert_eq!(b.shared_cached("k", |r| r.load(0)), 200);
    }

    #[test]
    fn test_instance_and_shared_are_separate() {
        let shared = SharedCache::new();
        let mut repo = Repo::new(1, &shared);

        repo.cached("k", |_| 10);
        assert_eq!(repo.shared_cached("k", |_| 20), 20);
        assert_eq!(repo.cached("k", |_| 30), 10);
    }

    #[test]
    fn test_invalidate_and_invalidate_all() {
        let shared = SharedCache::new();
        let mut repo = Repo::new(0, &shared);

        repo.cached("a", |_| 1);
        repo.cached("b", |_| 2);

        assert!(repo.invalidate_cached("a"));
        assert!(!repo.invalidate_cached("a"));
        assert_eq!(repo.cached("a", |_| 3), 3);

        repo.invalidate_all_cached();
        assert!(repo.instance_cache().is_empty());
        assert_eq!(repo.cached("b", |_| 4), 4);
    }

    #[test]
    fn test_try_cached_failure_is_retried() {
        let shared = SharedCache::new();
        let mut repo = Repo::new(0, &shared);

        let failed: Result<u64, String> = repo.try_cached("k", |_| Err("offline".into()));
        assert_eq!(failed, Err("offline".to_string()));
        assert!(!repo.instance_cache().contains("k"));

        let ok: Result<u64, String> = repo.try_cached("k", |r| Ok(r.load(5)));
        assert_eq!(ok, Ok(5));

        let shared_failed: Result<u64, &str> = repo.shared_try_cached("s", |_| Err("offline"));
        assert!(shared_failed.is_err());
        assert!(!shared.contains("s"));
    }
}
