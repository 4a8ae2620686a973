//! Fixed-capacity cache with a pluggable eviction policy

use crate::config::{CacheConfig, EvictionPolicy};
use crate::policy::PolicyTracker;
use crate::stats::CacheStats;
use ahash::AHashMap;
use std::borrow::Borrow;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tracing::debug;

/// Entry stored in the cache
#[derive(Debug, Clone)]
pub struct CacheEntry<K, V> {
    key: K,
    value: V,
    created_at: Instant,
    ttl: Option<Duration>,
    access_count: u64,
    last_accessed_at: Instant,
}

impl<K, V> CacheEntry<K, V> {
    fn new(key: K, value: V, ttl: Option<Duration>) -> Self {
        let now = Instant::now();
        Self {
            key,
            value,
            created_at: now,
            ttl,
            access_count: 0,
            last_accessed_at: now,
        }
    }

    /// The key this entry is stored under
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The cached value
    pub fn value(&self) -> &V {
        &self.value
    }

    /// When the entry was inserted
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Time-to-live, `None` for entries that never expire
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Number of successful `get` calls since insertion
    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    /// When the entry was last read through `get`
    pub fn last_accessed_at(&self) -> Instant {
        self.last_accessed_at
    }

    /// `created_at + ttl`, or `None` for entries that never expire
    pub fn expires_at(&self) -> Option<Instant> {
        self.ttl.and_then(|ttl| self.created_at.checked_add(ttl))
    }

    /// Check if this entry has outlived its TTL
    pub fn is_expired(&self) -> bool {
        self.expires_at()
            .map(|at| Instant::now() > at)
            .unwrap_or(false)
    }

    /// Get the age of this entry
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    fn touch(&mut self) {
        self.access_count += 1;
        self.last_accessed_at = Instant::now();
    }
}

/// Key/value cache bounded by entry count.
///
/// Absence, expiry and eviction are all reported through ordinary return
/// values. Expired entries are dropped lazily on `get` or by
/// [`clear_expired`](Self::clear_expired); nothing runs in the background.
///
/// The cache is single-owner: mutation takes `&mut self`. Wrap it in
/// [`SharedCache`](crate::SharedCache) to share it between tasks.
pub struct EvictionCache<K: Hash + Eq, V> {
    entries: AHashMap<K, CacheEntry<K, V>>,
    tracker: PolicyTracker<K>,
    config: CacheConfig,
    stats: CacheStats,
}

impl<K: Hash + Eq + Clone, V> EvictionCache<K, V> {
    /// Create a cache with the given configuration. A `max_size` of zero is
    /// raised to one.
    pub fn new(mut config: CacheConfig) -> Self {
        config.max_size = config.max_size.max(1);
        Self {
            entries: AHashMap::with_capacity(config.max_size),
            tracker: PolicyTracker::new(config.policy),
            config,
            stats: CacheStats::new(),
        }
    }

    /// Create a cache with default configuration
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    /// Shorthand for a cache with the given capacity and policy
    pub fn with_policy(max_size: usize, policy: EvictionPolicy) -> Self {
        Self::new(CacheConfig::new(max_size, policy))
    }

    /// Get a live entry's value, recording the access.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.take(key);
            self.stats.record_expiration();
            self.stats.record_miss();
            debug!(policy = %self.config.policy, "dropped expired cache entry on read");
            return None;
        }

        let entry = self.entries.get_mut(key)?;
        let frequency = entry.access_count;
        entry.touch();
        self.tracker.on_access(&entry.key, frequency);
        self.stats.record_hit();
        Some(&entry.value)
    }

    /// Insert or replace an entry.
    ///
    /// `ttl = None` falls back to the configured default TTL. Replacing a key
    /// is remove-then-insert, so the entry starts over as brand new. At most
    /// one entry is evicted, and only when a new key would exceed capacity.
    pub fn put(&mut self, key: K, value: V, ttl: Option<Duration>) {
        let ttl = ttl.or(self.config.default_ttl);

        if self.take(&key).is_none() && self.entries.len() >= self.config.max_size {
            self.evict_one();
        }

        self.tracker.on_insert(key.clone());
        self.entries
            .insert(key.clone(), CacheEntry::new(key, value, ttl));
        self.stats.record_insertion();
    }

    /// Remove an entry. Returns true if it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.take(key).is_some()
    }

    /// Clear all entries from the cache
    pub fn clear(&mut self) {
        self.entries.clear();
        self.tracker.clear();
    }

    /// Check for a live entry without recording an access
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    /// Read a live entry without recording an access
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| &entry.value)
    }

    /// Remove every expired entry and return how many were dropped
    pub fn clear_expired(&mut self) -> usize {
        let expired: Vec<K> = self
            .entries
            .values()
            .filter(|entry| entry.is_expired())
            .map(|entry| entry.key.clone())
            .collect();

        for key in &expired {
            self.take(key);
            self.stats.record_expiration();
        }

        if !expired.is_empty() {
            debug!(count = expired.len(), "cleared expired cache entries");
        }
        expired.len()
    }

    /// Live keys in eviction order: the next victim comes first.
    ///
    /// LRU lists least recently used first, FIFO oldest insertion first, LFU
    /// lowest frequency first (earliest to reach that frequency first).
    pub fn keys(&self) -> Vec<&K> {
        self.tracker
            .ordered_keys()
            .into_iter()
            .filter(|key| self.contains_key(*key))
            .collect()
    }

    /// Live entries in the same order as [`keys`](Self::keys)
    pub fn entries(&self) -> Vec<&CacheEntry<K, V>> {
        self.tracker
            .ordered_keys()
            .into_iter()
            .filter_map(|key| self.entries.get(key))
            .filter(|entry| !entry.is_expired())
            .collect()
    }

    /// Number of stored entries, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if the next new key will evict an entry
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.config.max_size
    }

    /// Get the eviction policy
    pub fn policy(&self) -> EvictionPolicy {
        self.config.policy
    }

    /// Get the cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Snapshot of the cache counters
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Reset hit/miss counters without touching entries
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    fn take<Q>(&mut self, key: &Q) -> Option<CacheEntry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let entry = self.entries.remove(key)?;
        self.tracker.on_remove(&entry.key, entry.access_count);
        Some(entry)
    }

    fn evict_one(&mut self) {
        let Some(victim) = self.tracker.victim() else {
            return;
        };
        if let Some(entry) = self.entries.remove(&victim) {
            self.stats.record_eviction();
            debug!(
                policy = %self.config.policy,
                access_count = entry.access_count,
                age_ms = entry.age().as_millis() as u64,
                "evicted cache entry"
            );
        }
        debug_assert_eq!(self.tracker.len(), self.entries.len());
    }
}

impl<K: Hash + Eq, V> std::fmt::Debug for EvictionCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvictionCache")
            .field("policy", &self.config.policy)
            .field("max_size", &self.config.max_size)
            .field("default_ttl", &self.config.default_ttl)
            .field("current_entries", &self.entries.len())
            .field("stats", &self.stats)
            .finish()
    }
}
