//! # rtcache
//!
//! Runtime memoization: cache the result of an expensive computation under a
//! key for as long as the process (shared scope) or the owning object
//! (instance scope) lives.
//!
//! ## Modules
//!
//! - [`cache`] - Key normalization, shared and instance caches, registry
//! - [`cli`] - Command line interface (feature `cli`)
//! - [`types`] - Configuration and errors
//!
//! ```
//! use rtcache::SharedCache;
//!
//! let cache = SharedCache::new();
//! assert_eq!(cache.get_or_compute("x", || 42), 42);
//! assert_eq!(cache.get_or_compute("x", || 99), 42);
//! cache.invalidate("x");
//! assert_eq!(cache.get_or_compute("x", || 99), 99);
//! ```

pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod types;

pub use cache::{
    normalize_key, CacheKey, CacheRegistry, CacheStats, InstanceCache, KeyEncoding, KeySegment,
    RuntimeCached, SharedCache,
};
pub use types::config::Config;
pub use types::errors::{RuntimeCacheError, RuntimeCacheResult};
