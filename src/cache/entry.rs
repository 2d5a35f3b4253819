//! Cached values and hit/miss bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// A value stored in a cache slot.
#[derive(Debug, Clone)]
pub struct CachedValue<V> {
    /// The producer's result.
    pub value: V,

    /// When the producer finished.
    pub cached_at: DateTime<Utc>,
}

impl<V> CachedValue<V> {
    /// Wraps a freshly computed value.
    pub fn new(value: V) -> Self {
        Self {
            value,
            cached_at: Utc::now(),
        }
    }

    /// Time since the value was stored.
    pub fn age(&self) -> Duration {
        Utc::now()
            .signed_duration_since(self.cached_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    /// Number of stored entries.
    pub size: usize,

    /// Lookups answered from the cache.
    pub hits: u64,

    /// Lookups that ran the producer.
    pub misses: u64,

    /// Producer runs that failed (a subset of `misses`).
    pub failures: u64,
}

impl CacheStats {
    /// Calculates the hit rate.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Atomic counters behind [`CacheStats`]. Disabled counters stay at zero.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    enabled: bool,
    hits: AtomicU64,
    misses: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub(crate) fn hit(&self) {
        if self.enabled {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn miss(&self) {
        if self.enabled {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn failure(&self) {
        if self.enabled {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn snapshot(&self, size: usize) -> CacheStats {
        CacheStats {
            size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}
