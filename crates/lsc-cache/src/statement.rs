//! Prepared-statement reuse cache
//!
//! Statements are kept in an insertion-ordered map used as an LRU surrogate:
//! a valid hit moves the statement to the back, and when the cache is full
//! the statement at the front is dropped regardless of how often it was used.
//! Validity is bounded by age and by idle time, so a statement goes stale
//! purely by time passing.

use crate::config::StatementCacheConfig;
use ahash::RandomState;
use lru::LruCache;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::debug;

/// Cached representation of one SQL statement
#[derive(Debug, Clone)]
pub struct CachedStatement {
    sql: String,
    created_at: Instant,
    last_used_at: Option<Instant>,
    use_count: u64,
}

impl CachedStatement {
    fn new(sql: &str) -> Self {
        Self {
            sql: sql.to_string(),
            created_at: Instant::now(),
            last_used_at: None,
            use_count: 1,
        }
    }

    /// The statement text
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// When the statement was prepared
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// When the statement was last reused; `None` until the first cache hit
    pub fn last_used_at(&self) -> Option<Instant> {
        self.last_used_at
    }

    /// Number of times the statement was handed out
    pub fn use_count(&self) -> u64 {
        self.use_count
    }

    /// Time since the statement was prepared
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Time since last use, or since creation if never reused
    pub fn idle_time(&self) -> Duration {
        self.last_used_at.unwrap_or(self.created_at).elapsed()
    }

    /// Valid iff `age <= max_age` and `idle <= max_idle_time`
    pub fn is_valid(&self, config: &StatementCacheConfig) -> bool {
        self.age() <= config.max_age && self.idle_time() <= config.max_idle_time
    }

    fn mark_used(&mut self) {
        self.use_count += 1;
        self.last_used_at = Some(Instant::now());
    }
}

/// Snapshot of statement cache health
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementCacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Sum of `use_count` over cached statements
    pub total_uses: u64,
    pub hit_rate: f64,
    /// Age of the oldest cached statement in milliseconds
    pub oldest_age_ms: Option<u64>,
}

/// Bounded LRU cache of prepared statements keyed by SQL text.
///
/// Statements past `max_age` or idle longer than `max_idle_time` are stale:
/// lookups treat them as misses and `cleanup` removes them.
pub struct PreparedStatementCache {
    statements: LruCache<String, CachedStatement, RandomState>,
    config: StatementCacheConfig,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl PreparedStatementCache {
    /// Create a statement cache. A `max_size` of zero is raised to one.
    pub fn new(mut config: StatementCacheConfig) -> Self {
        config.max_size = config.max_size.max(1);
        Self {
            statements: LruCache::unbounded_with_hasher(RandomState::new()),
            config,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Create a statement cache with default configuration
    pub fn with_defaults() -> Self {
        Self::new(StatementCacheConfig::default())
    }

    /// Return the cached statement for `sql`, creating it on a miss.
    ///
    /// A valid hit moves the statement to the back and bumps its use count.
    /// An invalid statement is dropped and replaced by a fresh one.
    pub fn get_or_create(&mut self, sql: &str) -> &CachedStatement {
        let valid = self
            .statements
            .peek(sql)
            .map(|stmt| stmt.is_valid(&self.config));

        match valid {
            Some(true) => self.hits += 1,
            Some(false) => {
                self.statements.pop(sql);
                self.misses += 1;
                debug!(sql, "recreating stale prepared statement");
                self.make_room();
            }
            None => {
                self.misses += 1;
                self.make_room();
            }
        }

        // a hit is promoted to the back, a miss is inserted there
        let stmt = self
            .statements
            .get_or_insert_mut(sql.to_string(), || CachedStatement::new(sql));
        if valid == Some(true) {
            stmt.mark_used();
        }
        stmt
    }

    /// True if a valid statement is cached. Does not reorder.
    pub fn contains(&self, sql: &str) -> bool {
        self.statements
            .peek(sql)
            .map(|stmt| stmt.is_valid(&self.config))
            .unwrap_or(false)
    }

    /// Read a cached statement without touching it, valid or not
    pub fn peek(&self, sql: &str) -> Option<&CachedStatement> {
        self.statements.peek(sql)
    }

    /// Remove a statement. Returns true if it was cached.
    pub fn remove(&mut self, sql: &str) -> bool {
        self.statements.pop(sql).is_some()
    }

    /// Drop every statement. Counters are kept.
    pub fn clear(&mut self) {
        self.statements.clear();
    }

    /// Drop every statement that is no longer valid
    pub fn cleanup(&mut self) -> usize {
        let stale: Vec<String> = self
            .statements
            .iter()
            .filter(|(_, stmt)| !stmt.is_valid(&self.config))
            .map(|(sql, _)| sql.clone())
            .collect();

        for sql in &stale {
            self.statements.pop(sql);
        }

        if !stale.is_empty() {
            debug!(count = stale.len(), "removed stale prepared statements");
        }
        stale.len()
    }

    /// Snapshot of cache health
    pub fn stats(&self) -> StatementCacheStats {
        let total = self.hits + self.misses;
        StatementCacheStats {
            size: self.statements.len(),
            max_size: self.config.max_size,
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            total_uses: self.statements.iter().map(|(_, s)| s.use_count).sum(),
            hit_rate: if total == 0 {
                0.0
            } else {
                self.hits as f64 / total as f64
            },
            oldest_age_ms: self
                .statements
                .iter()
                .map(|(_, s)| s.age().as_millis() as u64)
                .max(),
        }
    }

    /// Statements ordered by use count, most used first. Ties keep cache
    /// order, front first.
    pub fn most_used(&self, limit: usize) -> Vec<&CachedStatement> {
        let mut statements: Vec<&CachedStatement> = self.iter().collect();
        statements.sort_by(|a, b| b.use_count.cmp(&a.use_count));
        statements.truncate(limit);
        statements
    }

    /// Statements from front (next to be evicted) to back
    pub fn iter(&self) -> impl Iterator<Item = &CachedStatement> {
        self.statements.iter().rev().map(|(_, stmt)| stmt)
    }

    /// Number of cached statements, stale ones included
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Get the cache configuration
    pub fn config(&self) -> &StatementCacheConfig {
        &self.config
    }

    fn make_room(&mut self) {
        if self.statements.len() >= self.config.max_size {
            if let Some((evicted, _)) = self.statements.pop_lru() {
                self.evictions += 1;
                debug!(sql = %evicted, "evicted prepared statement");
            }
        }
    }
}

impl Default for PreparedStatementCache {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for PreparedStatementCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedStatementCache")
            .field("max_size", &self.config.max_size)
            .field("max_age", &self.config.max_age)
            .field("max_idle_time", &self.config.max_idle_time)
            .field("current_statements", &self.statements.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn cache(max_size: usize) -> PreparedStatementCache {
        PreparedStatementCache::new(StatementCacheConfig::default().with_max_size(max_size))
    }

    fn order(cache: &PreparedStatementCache) -> Vec<&str> {
        cache.iter().map(|s| s.sql()).collect()
    }

    #[test]
    fn test_get_or_create_reuses() {
        let mut cache = cache(10);

        let first = cache.get_or_create("SELECT * FROM users").clone();
        assert_eq!(first.use_count(), 1);
        assert!(first.last_used_at().is_none());

        let second = cache.get_or_create("SELECT * FROM users").clone();
        assert_eq!(second.use_count(), 2);
        assert_eq!(second.created_at(), first.created_at());
        assert!(second.last_used_at().is_some());

        let third = cache.get_or_create("SELECT * FROM users");
        assert_eq!(third.use_count(), 3);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().hits, 2);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_hit_moves_to_back() {
        let mut cache = cache(10);
        cache.get_or_create("SELECT 1");
        cache.get_or_create("SELECT 2");
        cache.get_or_create("SELECT 3");
        cache.get_or_create("SELECT 1");

        assert_eq!(order(&cache), vec!["SELECT 2", "SELECT 3", "SELECT 1"]);
    }

    #[test]
    fn test_evicts_front_regardless_of_use() {
        let mut cache = cache(2);
        cache.get_or_create("SELECT 1");
        for _ in 0..5 {
            cache.get_or_create("SELECT 1");
        }
        cache.get_or_create("SELECT 2");
        cache.get_or_create("SELECT 3");

        assert!(!cache.contains("SELECT 1"));
        assert_eq!(order(&cache), vec!["SELECT 2", "SELECT 3"]);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_idle_statement_is_recreated() {
        let config = StatementCacheConfig::default().with_max_idle_time(Duration::from_millis(50));
        let mut cache = PreparedStatementCache::new(config);

        let created = cache.get_or_create("SELECT 1").created_at();
        thread::sleep(Duration::from_millis(100));

        assert!(!cache.contains("SELECT 1"));
        let stmt = cache.get_or_create("SELECT 1");
        assert_eq!(stmt.use_count(), 1);
        assert!(stmt.created_at() > created);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_aged_statement_is_recreated() {
        let config = StatementCacheConfig::default().with_max_age(Duration::from_millis(50));
        let mut cache = PreparedStatementCache::new(config);

        cache.get_or_create("SELECT 1");
        cache.get_or_create("SELECT 1");
        thread::sleep(Duration::from_millis(100));

        assert_eq!(cache.get_or_create("SELECT 1").use_count(), 1);
    }

    #[test]
    fn test_cleanup_sweeps_invalid() {
        let config = StatementCacheConfig::default().with_max_age(Duration::from_millis(50));
        let mut cache = PreparedStatementCache::new(config);

        cache.get_or_create("SELECT 1");
        cache.get_or_create("SELECT 2");
        thread::sleep(Duration::from_millis(100));
        cache.get_or_create("SELECT 3");

        assert_eq!(cache.cleanup(), 2);
        assert_eq!(order(&cache), vec!["SELECT 3"]);
        assert_eq!(cache.cleanup(), 0);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cache = cache(10);
        cache.get_or_create("SELECT 1");
        cache.get_or_create("SELECT 2");

        assert!(cache.remove("SELECT 1"));
        assert!(!cache.remove("SELECT 1"));
        assert!(cache.peek("SELECT 2").is_some());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_most_used() {
        let mut cache = cache(10);
        for _ in 0..3 {
            cache.get_or_create("SELECT a");
        }
        cache.get_or_create("SELECT b");
        for _ in 0..2 {
            cache.get_or_create("SELECT c");
        }

        let top: Vec<&str> = cache.most_used(2).iter().map(|s| s.sql()).collect();
        assert_eq!(top, vec!["SELECT a", "SELECT c"]);
        assert_eq!(cache.most_used(10).len(), 3);
    }

    #[test]
    fn test_stats() {
        let mut cache = cache(10);
        cache.get_or_create("SELECT 1");
        cache.get_or_create("SELECT 1");
        cache.get_or_create("SELECT 2");

        let stats = cache.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.max_size, 10);
        assert_eq!(stats.total_uses, 3);
        assert!((stats.hit_rate - 1.0 / 3.0).abs() < 1e-9);
        assert!(stats.oldest_age_ms.is_some());
    }
}
