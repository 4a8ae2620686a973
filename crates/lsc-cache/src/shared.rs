//! Thread-safe handle around an eviction cache

use crate::cache::EvictionCache;
use crate::config::CacheConfig;
use crate::stats::CacheStats;
use parking_lot::Mutex;
use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

/// Cloneable handle that serializes access to one [`EvictionCache`].
///
/// Every call takes the lock for the duration of that call only. Values are
/// cloned out of the cache, so no reference outlives the lock.
pub struct SharedCache<K: Hash + Eq, V> {
    inner: Arc<Mutex<EvictionCache<K, V>>>,
}

impl<K: Hash + Eq, V> Clone for SharedCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: Hash + Eq + Clone, V: Clone> SharedCache<K, V> {
    /// Create a shared cache with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        Self::from_cache(EvictionCache::new(config))
    }

    /// Share an existing cache
    pub fn from_cache(cache: EvictionCache<K, V>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    /// Get a clone of a live value, recording the access
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().get(key).cloned()
    }

    /// Insert or replace an entry
    pub fn put(&self, key: K, value: V, ttl: Option<Duration>) {
        self.inner.lock().put(key, value, ttl);
    }

    /// Return the cached value, or compute, store and return it.
    ///
    /// `f` runs without the lock held, so it may use this cache. If another
    /// caller stored the key in the meantime, that value wins and is returned.
    pub fn get_or_insert_with<F>(&self, key: K, ttl: Option<Duration>, f: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.inner.lock().get(&key) {
            return value.clone();
        }

        let value = f();

        let mut cache = self.inner.lock();
        if let Some(existing) = cache.peek(&key) {
            return existing.clone();
        }
        cache.put(key, value.clone(), ttl);
        value
    }

    /// Remove an entry. Returns true if it was present.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().remove(key)
    }

    /// Check for a live entry without recording an access
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().contains_key(key)
    }

    /// Clear all entries
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Remove every expired entry and return how many were dropped
    pub fn clear_expired(&self) -> usize {
        self.inner.lock().clear_expired()
    }

    /// Snapshot of live keys in eviction order
    pub fn keys(&self) -> Vec<K> {
        self.inner.lock().keys().into_iter().cloned().collect()
    }

    /// Number of stored entries, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Check if the next new key will evict an entry
    pub fn is_full(&self) -> bool {
        self.inner.lock().is_full()
    }

    /// Snapshot of the cache counters
    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats()
    }

    /// Run a closure with exclusive access to the underlying cache
    pub fn with<R>(&self, f: impl FnOnce(&mut EvictionCache<K, V>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvictionPolicy;
    use std::thread;

    #[test]
    fn test_concurrent_access() {
        let cache: SharedCache<String, usize> = SharedCache::new(CacheConfig::default());
        let mut handles = vec![];

        for i in 0..10 {
            let cache = cache.clone();
            handles.push(thread::spawn(move || {
                let key = format!("user:{}", i);
                cache.put(key.clone(), i, None);
                cache.get(&key)
            }));
        }

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), Some(i));
        }

        assert_eq!(cache.len(), 10);
        assert_eq!(cache.stats().hits, 10);
    }

    #[test]
    fn test_get_or_insert_with() {
        let cache: SharedCache<String, String> =
            SharedCache::new(CacheConfig::new(2, EvictionPolicy::Fifo));

        let first = cache.get_or_insert_with("k".to_string(), None, || "computed".to_string());
        let second = cache.get_or_insert_with("k".to_string(), None, || "again".to_string());

        assert_eq!(first, "computed");
        assert_eq!(second, "computed");
        assert!(cache.contains_key("k"));
    }

    #[test]
    fn test_get_or_insert_with_closure_may_use_the_cache() {
        let cache: SharedCache<String, usize> =
            SharedCache::new(CacheConfig::new(4, EvictionPolicy::Lru));
        cache.put("base".to_string(), 40, None);

        let handle = cache.clone();
        let value = cache.get_or_insert_with("derived".to_string(), None, || {
            handle.get("base").unwrap_or(0) + handle.len()
        });

        assert_eq!(value, 41);
        assert_eq!(cache.get("derived"), Some(41));
    }

    #[test]
    fn test_get_or_insert_with_keeps_value_stored_meanwhile() {
        let cache: SharedCache<&'static str, i32> =
            SharedCache::new(CacheConfig::new(4, EvictionPolicy::Lru));

        let handle = cache.clone();
        let value = cache.get_or_insert_with("k", None, || {
            handle.put("k", 1, None);
            2
        });

        assert_eq!(value, 1);
        assert_eq!(cache.get(&"k"), Some(1));
    }

    #[test]
    fn test_with_exposes_cache() {
        let cache: SharedCache<&'static str, i32> =
            SharedCache::new(CacheConfig::new(1, EvictionPolicy::Lru));
        cache.put("a", 1, None);
        cache.put("b", 2, None);

        let policy = cache.with(|inner| inner.policy());
        assert_eq!(policy, EvictionPolicy::Lru);
        assert_eq!(cache.keys(), vec!["b"]);
        assert!(cache.is_full());
        assert!(cache.remove("b"));
        assert!(cache.is_empty());
    }
}
