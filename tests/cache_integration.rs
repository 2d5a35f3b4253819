//! Integration tests for the runtime caches.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use rtcache::{CacheRegistry, InstanceCache, KeyEncoding, RuntimeCached, SharedCache};

#[test]
fn test_documented_scenario() {
    for cache in [SharedCache::new(), SharedCache::with_encoding(KeyEncoding::Joined)] {
        let calls = AtomicUsize::new(0);
        let first = cache.get_or_compute("x", || {
            calls.fetch_add(1, Ordering::SeqCst);
            42
        });
        assert_eq!(first, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(cache.get_or_compute("x", || 99), 42);
        cache.invalidate("x");
        assert_eq!(cache.get_or_compute("x", || 99), 99);
    }

    let mut cache = InstanceCache::new();
    assert_eq!(cache.get_or_compute("x", || 42), 42);
    assert_eq!(cache.get_or_compute("x", || 99), 42);
    cache.invalidate("x");
    assert_eq!(cache.get_or_compute("x", || 99), 99);
}

#[test]
fn test_concurrent_first_access_runs_producer_once() {
    let cache: SharedCache<u64> = SharedCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.get_or_compute(&("expensive", 1), || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(20));
                    7
                })
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 7);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats().misses, 1);
    assert_eq!(cache.stats().hits, threads as u64 - 1);
}

#[test]
fn test_distinct_keys_compute_in_parallel() {
    let cache: SharedCache<usize> = SharedCache::new();
    let barrier = Arc::new(Barrier::new(2));

    // Each producer waits for the other one, which only works if neither
    // blocks the whole cache.
    let handles: Vec<_> = (0..2)
        .map(|i| {
            let cache = cache.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                cache.get_or_compute(&i, || {
                    barrier.wait();
                    i * 10
                })
            })
        })
        .collect();

    let results: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results, vec![0, 10]);
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_failed_producer_retried_across_threads() {
    let cache: SharedCache<String> = SharedCache::new();

    let worker = cache.clone();
    let failed = thread::spawn(move || {
        worker.get_or_try_compute("cfg", || Err::<String, _>(std::io::Error::other("disk")))
    })
    .join()
    .unwrap();
    assert!(failed.is_err());
    assert!(!cache.contains("cfg"));

    let loaded: Result<String, std::io::Error> =
        cache.get_or_try_compute("cfg", || Ok("loaded".to_string()));
    assert_eq!(loaded.unwrap(), "loaded");
}

struct PriceService {
    currency: &'static str,
    fetches: usize,
    cache: InstanceCache<String>,
    shared: SharedCache<String>,
}

impl PriceService {
    fn new(currency: &'static str, registry: &CacheRegistry) -> Self {
        Self {
            currency,
            fetches: 0,
            cache: InstanceCache::new(),
            shared: registry
                .shared_for::<PriceService, String>()
                .expect("namespace holds strings"),
        }
    }

    fn price(&mut self, sku: &str) -> String {
        let before = self.instance_cache().len();
        let price = self.cached(&["price", sku], |s| format!("{} {}", s.currency, sku.len()));
        if self.instance_cache().len() > before {
            self.fetches += 1;
        }
        price
    }

    fn rates_version(&self) -> String {
        self.shared_cached("rates", |s| format!("rates@{}", s.currency))
    }
}

impl RuntimeCached for PriceService {
    type Value = String;

    fn instance_cache(&self) -> &InstanceCache<String> {
        &self.cache
    }

    fn instance_cache_mut(&mut self) -> &mut InstanceCache<String> {
        &mut self.cache
    }

    fn shared_cache(&self) -> &SharedCache<String> {
        &self.shared
    }
}

#[test]
fn test_component_with_registry() {
    let registry = CacheRegistry::new();
    let mut eur = PriceService::new("EUR", &registry);
    let mut usd = PriceService::new("USD", &registry);

    assert_eq!(eur.price("abc"), "EUR 3");
    assert_eq!(eur.price("abc"), "EUR 3");
    assert_eq!(usd.price("abc"), "USD 3");
    assert_eq!(eur.fetches, 1);
    assert_eq!(usd.fetches, 1);

    // The first service to ask fills the shared entry for both.
    assert_eq!(usd.rates_version(), "rates@USD");
    assert_eq!(eur.rates_version(), "rates@USD");

    registry.invalidate_all();
    assert_eq!(eur.rates_version(), "rates@EUR");

    eur.invalidate_all_cached();
    assert_eq!(eur.price("abc"), "EUR 3");
    assert_eq!(eur.fetches, 2);
    assert_eq!(usd.instance_cache().len(), 1);
}

#[test]
fn test_registry_shared_across_threads() {
    let registry = Arc::new(CacheRegistry::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let calls = Arc::clone(&calls);
            thread::spawn(move || {
                let cache = registry.shared::<u32>("counters").unwrap();
                cache.get_or_compute("total", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    5
                })
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 5);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(registry.namespaces(), vec!["counters".to_string()]);
}
