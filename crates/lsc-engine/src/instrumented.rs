//! Execution backend wrapper that feeds the statement cache and optimizer

use async_trait::async_trait;
use lsc_cache::{PreparedStatementCache, StatementCacheConfig, StatementCacheStats};
use lsc_core::{ExecutionBackend, Record, SchemaRegistry, Value};
use lsc_optimizer::{OptimizerConfig, QueryAnalysis, QueryOptimizer, QueryStats};
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Wraps a backend so every statement is registered in a
/// [`PreparedStatementCache`] and timed into a [`QueryOptimizer`].
///
/// Results, including errors, pass through untouched. Locks are taken only
/// around the bookkeeping, never across the backend call.
pub struct InstrumentedBackend<B, S: SchemaRegistry> {
    inner: B,
    statements: Mutex<PreparedStatementCache>,
    optimizer: Mutex<QueryOptimizer<S>>,
}

impl<B: ExecutionBackend, S: SchemaRegistry> InstrumentedBackend<B, S> {
    /// Wrap `inner` with default cache and optimizer settings
    pub fn new(inner: B, schema: S) -> Self {
        Self::with_config(
            inner,
            schema,
            StatementCacheConfig::default(),
            OptimizerConfig::default(),
        )
    }

    /// Wrap `inner` with the given cache and optimizer settings
    pub fn with_config(
        inner: B,
        schema: S,
        statements: StatementCacheConfig,
        optimizer: OptimizerConfig,
    ) -> Self {
        Self::from_parts(
            inner,
            PreparedStatementCache::new(statements),
            QueryOptimizer::with_config(schema, optimizer),
        )
    }

    /// Build around an already configured optimizer, e.g. one with a custom hook
    pub fn from_parts(
        inner: B,
        statements: PreparedStatementCache,
        optimizer: QueryOptimizer<S>,
    ) -> Self {
        Self {
            inner,
            statements: Mutex::new(statements),
            optimizer: Mutex::new(optimizer),
        }
    }

    /// The wrapped backend
    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Analyze `sql` with the optimizer's schema
    pub fn analyze(&self, sql: &str) -> QueryAnalysis {
        self.optimizer.lock().analyze_query(sql)
    }

    /// Timings recorded for exactly `sql`
    pub fn query_stats(&self, sql: &str) -> Option<QueryStats> {
        self.optimizer.lock().query_stats(sql).cloned()
    }

    /// Statements above the slow threshold, slowest first
    pub fn slow_queries(&self) -> Vec<QueryStats> {
        self.optimizer
            .lock()
            .slow_queries()
            .into_iter()
            .cloned()
            .collect()
    }

    /// The `limit` most executed statements
    pub fn frequent_queries(&self, limit: usize) -> Vec<QueryStats> {
        self.optimizer
            .lock()
            .frequent_queries(limit)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Forget all recorded timings
    pub fn clear_stats(&self) {
        self.optimizer.lock().clear_stats();
    }

    /// Health of the prepared-statement cache
    pub fn statement_stats(&self) -> StatementCacheStats {
        self.statements.lock().stats()
    }

    /// Drop stale statements, returning how many were removed
    pub fn cleanup_statements(&self) -> usize {
        self.statements.lock().cleanup()
    }

    /// Run `f` with exclusive access to the optimizer
    pub fn with_optimizer<R>(&self, f: impl FnOnce(&mut QueryOptimizer<S>) -> R) -> R {
        f(&mut self.optimizer.lock())
    }

    fn prepare(&self, sql: &str) {
        let mut statements = self.statements.lock();
        let statement = statements.get_or_create(sql);
        debug!(sql, uses = statement.use_count(), "statement prepared");
    }

    fn finish(&self, sql: &str, elapsed: Duration) {
        self.optimizer.lock().record_query_execution(sql, elapsed);
    }
}

#[async_trait]
impl<B, S> ExecutionBackend for InstrumentedBackend<B, S>
where
    B: ExecutionBackend,
    S: SchemaRegistry,
{
    type Error = B::Error;

    async fn query(&self, sql: &str, args: &[Value], space: &str) -> Result<Vec<Record>, B::Error> {
        self.prepare(sql);
        let started = Instant::now();
        let result = self.inner.query(sql, args, space).await;
        self.finish(sql, started.elapsed());
        result
    }

    async fn update(&self, sql: &str, args: &[Value], space: &str) -> Result<u64, B::Error> {
        self.prepare(sql);
        let started = Instant::now();
        let result = self.inner.update(sql, args, space).await;
        self.finish(sql, started.elapsed());
        result
    }

    async fn delete(&self, sql: &str, args: &[Value], space: &str) -> Result<u64, B::Error> {
        self.prepare(sql);
        let started = Instant::now();
        let result = self.inner.delete(sql, args, space).await;
        self.finish(sql, started.elapsed());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsc_core::{InMemorySchemaRegistry, TableSchema};

    #[derive(Debug, thiserror::Error)]
    #[error("backend offline")]
    struct Offline;

    struct SlowBackend {
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl ExecutionBackend for SlowBackend {
        type Error = Offline;

        async fn query(&self, _: &str, _: &[Value], _: &str) -> Result<Vec<Record>, Offline> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(Offline);
            }
            Ok(vec![Record::from([("n".to_string(), Value::from(1))])])
        }

        async fn update(&self, _: &str, _: &[Value], _: &str) -> Result<u64, Offline> {
            Ok(3)
        }

        async fn delete(&self, _: &str, _: &[Value], _: &str) -> Result<u64, Offline> {
            Err(Offline)
        }
    }

    fn instrumented(fail: bool) -> InstrumentedBackend<SlowBackend, InMemorySchemaRegistry> {
        let schema = InMemorySchemaRegistry::new()
            .with_table(TableSchema::new("users", vec!["id".into(), "name".into()]));
        InstrumentedBackend::new(
            SlowBackend {
                delay: Duration::from_millis(5),
                fail,
            },
            schema,
        )
    }

    #[tokio::test]
    async fn test_query_is_cached_and_timed() {
        let backend = instrumented(false);
        let sql = "SELECT * FROM users WHERE id = ?";

        let rows = backend.query(sql, &[Value::from(1)], "default").await.unwrap();
        assert_eq!(rows.len(), 1);
        backend.query(sql, &[Value::from(2)], "default").await.unwrap();

        let stats = backend.query_stats(sql).unwrap();
        assert_eq!(stats.execution_count(), 2);
        assert!(stats.min_time().unwrap() >= Duration::from_millis(5));

        let statements = backend.statement_stats();
        assert_eq!(statements.size, 1);
        assert_eq!(statements.hits, 1);
        assert_eq!(statements.misses, 1);
    }

    #[tokio::test]
    async fn test_failures_are_recorded_and_returned() {
        let backend = instrumented(true);
        let err = backend.query("SELECT 1", &[], "default").await.unwrap_err();
        assert_eq!(err.to_string(), "backend offline");
        assert_eq!(backend.query_stats("SELECT 1").unwrap().execution_count(), 1);

        assert!(backend.delete("DELETE FROM users", &[], "default").await.is_err());
        assert_eq!(
            backend
                .query_stats("DELETE FROM users")
                .unwrap()
                .execution_count(),
            1
        );
    }

    #[tokio::test]
    async fn test_update_passes_through() {
        let backend = instrumented(false);
        let n = backend
            .update("UPDATE users SET name = ?", &[Value::from("x")], "default")
            .await
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(backend.frequent_queries(5).len(), 1);

        backend.clear_stats();
        assert!(backend.frequent_queries(5).is_empty());
    }

    #[test]
    fn test_analyze_uses_schema() {
        let backend = instrumented(false);
        let analysis = backend.analyze("SELECT id FROM users WHERE name = ?");
        assert_eq!(analysis.missing_indexes, vec!["name".to_string()]);
    }
}
