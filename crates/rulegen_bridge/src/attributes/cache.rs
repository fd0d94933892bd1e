//! Bounded least-recently-used caches.
//!
//! [`LruCache`] is a plain single-owner cache. [`LockedLruCache`] wraps it in a
//! mutex so worker threads can share one instance. [`StringCaches`] bundles the
//! two caches used while writing engine results back to the host.
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::attributes::names;

/// Default capacity of the shared string caches.
pub const DEFAULT_CAPACITY: usize = 1 << 12;

/// Hit/miss/eviction counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Least-recently-used cache with a fixed capacity.
#[derive(Debug)]
pub struct LruCache<K, V> {
    capacity: usize,
    entries: HashMap<K, (V, u64)>,
    order: BTreeMap<u64, K>,
    tick: u64,
    stats: CacheStats,
}

impl<K: Hash + Eq + Clone, V: Clone> LruCache<K, V> {
    /// Creates a cache holding at most `capacity` entries (minimum one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: BTreeMap::new(),
            tick: 0,
            stats: CacheStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Looks up `key` and marks it most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let tick = self.next_tick();
        match self.entries.get_mut(key) {
            Some((value, used)) => {
                if let Some(k) = self.order.remove(used) {
                    self.order.insert(tick, k);
                }
                *used = tick;
                self.stats.hits += 1;
                Some(value.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Inserts or refreshes `key`, evicting the least recently used entry when full.
    pub fn insert(&mut self, key: K, value: V) {
        let tick = self.next_tick();
        if let Some((old, used)) = self.entries.get_mut(&key) {
            *old = value;
            if let Some(k) = self.order.remove(used) {
                self.order.insert(tick, k);
            }
            *used = tick;
            return;
        }
        while self.entries.len() >= self.capacity {
            self.evict_lru();
        }
        self.order.insert(tick, key.clone());
        self.entries.insert(key, (value, tick));
    }

    fn evict_lru(&mut self) {
        if let Some((_, key)) = self.order.pop_first() {
            self.entries.remove(&key);
            self.stats.evictions += 1;
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// [`LruCache`] behind a mutex, shareable across threads.
#[derive(Debug)]
pub struct LockedLruCache<K, V> {
    inner: Mutex<LruCache<K, V>>,
}

impl<K: Hash + Eq + Clone, V: Clone> LockedLruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().get(key)
    }

    pub fn insert(&self, key: K, value: V) {
        self.inner.lock().insert(key, value);
    }

    /// Returns the cached value or computes, stores and returns it.
    ///
    /// The value is computed without holding the lock.
    pub fn get_or_insert_with<Q>(&self, key: &Q, make: impl FnOnce() -> V) -> V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        if let Some(v) = self.get(key) {
            return v;
        }
        let value = make();
        self.insert(key.to_owned(), value.clone());
        value
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats()
    }
}

/// Shared caches for converting rule keys to host names and interning string values.
#[derive(Debug)]
pub struct StringCaches {
    host_names: LockedLruCache<String, Arc<str>>,
    values: LockedLruCache<String, Arc<str>>,
}

impl Default for StringCaches {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl StringCaches {
    pub fn new(capacity: usize) -> Self {
        Self {
            host_names: LockedLruCache::new(capacity),
            values: LockedLruCache::new(capacity),
        }
    }

    /// Host attribute name for a rule key, see [`names::to_host_name`].
    pub fn host_name(&self, rule_key: &str) -> Arc<str> {
        self.host_names
            .get_or_insert_with(rule_key, || Arc::from(names::to_host_name(rule_key)))
    }

    /// Interned host string for an engine string value.
    pub fn host_string(&self, value: &str) -> Arc<str> {
        self.values.get_or_insert_with(value, || Arc::from(value))
    }

    pub fn host_name_stats(&self) -> CacheStats {
        self.host_names.stats()
    }

    pub fn value_stats(&self) -> CacheStats {
        self.values.stats()
    }
}
