//! Engine facade that puts the caches and the optimizer in front of a backend.

use crate::config::EngineConfig;
use crate::instrumented::InstrumentedBackend;
use lsc_cache::{CacheStats, PreparedStatementCache, SharedCache, StatementCacheStats};
use lsc_core::{ExecutionBackend, Record, SchemaRegistry};
use lsc_optimizer::{QueryAnalysis, QueryOptimizer, QueryStats};
use lsc_query::{ExecuteError, QueryBuilder};
use std::sync::Arc;
use tracing::debug;

/// Builder entry point with statement caching, execution statistics and an
/// optional result cache around one backend
pub struct Engine<B: ExecutionBackend, S: SchemaRegistry> {
    backend: Arc<InstrumentedBackend<B, S>>,
    results: SharedCache<String, Vec<Record>>,
    config: EngineConfig,
}

impl<B: ExecutionBackend, S: SchemaRegistry> Engine<B, S> {
    /// Create an engine with default configuration
    pub fn new(backend: B, schema: S) -> Self {
        Self::with_config(backend, schema, EngineConfig::default())
    }

    /// Create an engine with the given configuration
    pub fn with_config(backend: B, schema: S, config: EngineConfig) -> Self {
        let optimizer = QueryOptimizer::with_config(schema, config.optimizer.clone());
        Self::with_optimizer(backend, optimizer, config)
    }

    /// Use a preconfigured optimizer. Its own config wins over `config.optimizer`.
    pub fn with_optimizer(backend: B, optimizer: QueryOptimizer<S>, config: EngineConfig) -> Self {
        let statements = PreparedStatementCache::new(config.statements.clone());
        Self {
            backend: Arc::new(InstrumentedBackend::from_parts(
                backend, statements, optimizer,
            )),
            results: SharedCache::new(config.cache.clone()),
            config,
        }
    }

    /// Builder for `table` in the configured default space
    pub fn query(&self, table: &str) -> QueryBuilder<InstrumentedBackend<B, S>> {
        self.query_in(&self.config.default_space, table)
    }

    /// Builder for `table` in `space`
    pub fn query_in(&self, space: &str, table: &str) -> QueryBuilder<InstrumentedBackend<B, S>> {
        QueryBuilder::new(Arc::clone(&self.backend), table).in_space(space)
    }

    /// Run the builder's SELECT, answering repeated identical queries from
    /// the result cache
    pub async fn get_cached(
        &self,
        builder: &QueryBuilder<InstrumentedBackend<B, S>>,
    ) -> Result<Vec<Record>, ExecuteError<B::Error>> {
        let compiled = builder.to_select_sql()?;
        let key = format!("{}|{}|{:?}", builder.space(), compiled.sql, compiled.args);

        if let Some(rows) = self.results.get(&key) {
            debug!(sql = %compiled.sql, "result cache hit");
            return Ok(rows);
        }

        let rows = builder.get().await?;
        self.results.put(key, rows.clone(), None);
        Ok(rows)
    }

    /// Drop every cached result
    pub fn invalidate_results(&self) {
        self.results.clear();
    }

    /// Counters of the result cache
    pub fn result_cache_stats(&self) -> CacheStats {
        self.results.stats()
    }

    /// Analyze `sql` against the engine's schema registry
    pub fn analyze(&self, sql: &str) -> QueryAnalysis {
        self.backend.analyze(sql)
    }

    /// Executed statements whose average time exceeds the slow threshold
    pub fn slow_queries(&self) -> Vec<QueryStats> {
        self.backend.slow_queries()
    }

    /// Health of the prepared-statement cache
    pub fn statement_stats(&self) -> StatementCacheStats {
        self.backend.statement_stats()
    }

    /// Drop stale statements, returning how many were removed
    pub fn cleanup_statements(&self) -> usize {
        self.backend.cleanup_statements()
    }

    /// The instrumented backend shared by every builder
    pub fn backend(&self) -> &Arc<InstrumentedBackend<B, S>> {
        &self.backend
    }

    /// Get the engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
