//! Runtime get-or-compute caches.
//!
//! Two scopes share one key normalization:
//!
//! - [`SharedCache`]: one map for every holder of the handle, thread-safe.
//! - [`InstanceCache`]: one map per owning object, behind `&mut self`.
//!
//! Entries live until invalidated or until the cache is dropped. There is no
//! eviction, expiry or size bound.

mod capability;
mod entry;
mod instance;
mod key;
mod registry;
mod shared;

pub use capability::RuntimeCached;
pub use entry::{CacheStats, CachedValue};
pub use instance::InstanceCache;
pub use key::{normalize_key, CacheKey, KeyEncoding, KeySegment, SEPARATOR};
pub use registry::CacheRegistry;
pub use shared::SharedCache;
