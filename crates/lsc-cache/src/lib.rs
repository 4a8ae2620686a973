//! In-process caches for the lsc query subsystem
//!
//! This crate provides two independent caches:
//!
//! - [`EvictionCache`]: fixed-capacity key/value store with a pluggable
//!   eviction policy (LRU, LFU or FIFO) and optional per-entry TTL
//! - [`PreparedStatementCache`]: bounded reuse cache for SQL statements whose
//!   entries go stale after a maximum age or idle time
//!
//! Both are single-owner structures with no internal locking and no
//! background work. Expiry is checked lazily on access and by explicit sweeps
//! ([`EvictionCache::clear_expired`], [`PreparedStatementCache::cleanup`]).
//! [`SharedCache`] wraps an eviction cache in a mutex for hosts that share
//! one instance between threads.
//!
//! # Example
//!
//! ```
//! use lsc_cache::{EvictionCache, EvictionPolicy};
//!
//! let mut cache = EvictionCache::with_policy(2, EvictionPolicy::Lru);
//! cache.put("a", 1, None);
//! cache.put("b", 2, None);
//! cache.get(&"a");
//! cache.put("c", 3, None);
//!
//! assert!(cache.contains_key(&"a"));
//! assert!(!cache.contains_key(&"b"));
//! ```

pub mod cache;
pub mod config;
mod order;
mod policy;
pub mod shared;
pub mod statement;
pub mod stats;

pub use cache::{CacheEntry, EvictionCache};
pub use config::{CacheConfig, EvictionPolicy, StatementCacheConfig};
pub use shared::SharedCache;
pub use statement::{CachedStatement, PreparedStatementCache, StatementCacheStats};
pub use stats::CacheStats;
