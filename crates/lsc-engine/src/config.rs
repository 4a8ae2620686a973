//! Engine configuration, loadable from and savable to JSON.

use lsc_cache::{CacheConfig, StatementCacheConfig};
use lsc_core::{QueryError, Result, DEFAULT_SPACE};
use lsc_optimizer::OptimizerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for every component the engine wires together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Result cache
    pub cache: CacheConfig,
    pub statements: StatementCacheConfig,
    pub optimizer: OptimizerConfig,
    /// Space used by [`Engine::query`](crate::Engine::query)
    pub default_space: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            statements: StatementCacheConfig::default(),
            optimizer: OptimizerConfig::default(),
            default_space: DEFAULT_SPACE.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject settings no component can run with
    pub fn validate(&self) -> Result<()> {
        if self.default_space.trim().is_empty() {
            return Err(QueryError::Config("default_space must not be empty".into()));
        }
        if self.cache.max_size == 0 {
            return Err(QueryError::Config("cache.max_size must be at least 1".into()));
        }
        if self.statements.max_size == 0 {
            return Err(QueryError::Config(
                "statements.max_size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Set the result cache configuration
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Set the statement cache configuration
    pub fn with_statements(mut self, statements: StatementCacheConfig) -> Self {
        self.statements = statements;
        self
    }

    /// Set the optimizer configuration
    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Set the space used by `Engine::query`
    pub fn with_default_space(mut self, space: impl Into<String>) -> Self {
        self.default_space = space.into();
        self
    }
}
