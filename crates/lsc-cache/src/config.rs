//! Cache configuration options

use lsc_core::duration::{millis, option_millis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Strategy that picks the victim when the cache is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Least recently used
    #[default]
    Lru,
    /// Least frequently used
    Lfu,
    /// First in, first out
    Fifo,
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionPolicy::Lru => write!(f, "LRU"),
            EvictionPolicy::Lfu => write!(f, "LFU"),
            EvictionPolicy::Fifo => write!(f, "FIFO"),
        }
    }
}

/// Configuration for the eviction cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries in the cache
    pub max_size: usize,
    /// Eviction policy, fixed for the lifetime of a cache
    pub policy: EvictionPolicy,
    /// TTL applied when `put` is called without one. `None` never expires.
    #[serde(with = "option_millis")]
    pub default_ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            policy: EvictionPolicy::Lru,
            default_ttl: None,
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with custom settings
    pub fn new(max_size: usize, policy: EvictionPolicy) -> Self {
        Self {
            max_size,
            policy,
            default_ttl: None,
        }
    }

    /// Set the maximum number of entries
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the eviction policy
    pub fn with_policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the TTL used by `put` calls that do not pass one
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }
}

/// Configuration for the prepared-statement cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementCacheConfig {
    /// Maximum number of cached statements
    pub max_size: usize,
    /// Statements older than this are recreated
    #[serde(with = "millis")]
    pub max_age: Duration,
    /// Statements unused for longer than this are recreated
    #[serde(with = "millis")]
    pub max_idle_time: Duration,
}

impl Default for StatementCacheConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            max_age: Duration::from_secs(60 * 60),
            max_idle_time: Duration::from_secs(10 * 60),
        }
    }
}

impl StatementCacheConfig {
    /// Set the maximum number of cached statements
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the age after which a statement is stale
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Set the idle time after which a statement is stale
    pub fn with_max_idle_time(mut self, max_idle_time: Duration) -> Self {
        self.max_idle_time = max_idle_time;
        self
    }
}
