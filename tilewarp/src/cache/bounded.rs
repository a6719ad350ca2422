//! Fixed-capacity LRU cache with a disposal hook.

use lru::LruCache;
use std::num::NonZeroUsize;

/// Callback invoked with every entry the cache evicts.
pub type DisposeFn<V> = Box<dyn FnMut(String, V) + Send>;

/// Hit/miss/eviction counters for a [`BoundedCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate as a fraction in `[0, 1]`.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

/// Fixed-capacity cache keyed by URL with strict least-recently-used eviction.
///
/// `get` and `add` both promote the key to most-recently-used. Adding beyond
/// capacity evicts the least-recently-used entry and hands it to the disposal
/// hook exactly once. Re-adding an existing key replaces its value in place.
/// There is no TTL.
pub struct BoundedCache<V> {
    entries: LruCache<String, V>,
    on_dispose: Option<DisposeFn<V>>,
    stats: CacheStats,
}

impl<V> BoundedCache<V> {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(cap),
            on_dispose: None,
            stats: CacheStats::default(),
        }
    }

    /// Create a cache that calls `on_dispose` for each evicted entry.
    pub fn with_disposal(capacity: usize, on_dispose: impl FnMut(String, V) + Send + 'static) -> Self {
        let mut cache = Self::new(capacity);
        cache.on_dispose = Some(Box::new(on_dispose));
        cache
    }

    /// Look up `key`, promoting it to most-recently-used on a hit.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        match self.entries.get(key) {
            Some(value) => {
                self.stats.hits += 1;
                Some(value)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Insert or replace `key`, promoting it to most-recently-used.
    pub fn add(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = value;
            return;
        }

        if let Some((evicted_key, evicted)) = self.entries.push(key, value) {
            self.dispose(evicted_key, evicted);
        }
    }

    /// Remove `key` and hand its value back to the caller.
    ///
    /// Ownership moves to the caller, so the disposal hook is not invoked.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.pop(key)
    }

    /// Check membership without touching recency.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Evict every entry, least-recently-used first.
    pub fn clear(&mut self) {
        while let Some((key, value)) = self.entries.pop_lru() {
            self.dispose(key, value);
        }
    }

    fn dispose(&mut self, key: String, value: V) {
        self.stats.evictions += 1;
        tracing::trace!(key = %key, "cache eviction");
        if let Some(hook) = self.on_dispose.as_mut() {
            hook(key, value);
        }
    }
}

impl<V: Clone> BoundedCache<V> {
    /// Look up `key` and return an independent copy of the cached value.
    ///
    /// The cached original stays in place so concurrent callers each own a
    /// separately disposable copy.
    pub fn get_cloned(&mut self, key: &str) -> Option<V> {
        self.get(key).cloned()
    }
}

impl<V> std::fmt::Debug for BoundedCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("stats", &self.stats)
            .finish()
    }
}
