//! Query optimizer that analyzes statements and keeps per-statement timings.

use crate::analysis::{self, QueryAnalysis};
use crate::config::OptimizerConfig;
use crate::hook::{AutoOptimizeHook, LoggingHook};
use crate::stats::QueryStats;
use ahash::{AHashMap, AHashSet};
use lsc_core::SchemaRegistry;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Heuristic analyzer plus execution statistics, keyed by exact SQL text.
///
/// Analysis is pure. The tracker is single-owner; wrap the optimizer in a
/// mutex to share it.
pub struct QueryOptimizer<S: SchemaRegistry> {
    schema: S,
    config: OptimizerConfig,
    stats: AHashMap<String, QueryStats>,
    /// Statements the hook already fired for
    optimized: AHashSet<String>,
    hook: Box<dyn AutoOptimizeHook>,
}

impl<S: SchemaRegistry> QueryOptimizer<S> {
    /// Create an optimizer with default configuration and the logging hook
    pub fn new(schema: S) -> Self {
        Self::with_config(schema, OptimizerConfig::default())
    }

    /// Create an optimizer with the given configuration
    pub fn with_config(schema: S, config: OptimizerConfig) -> Self {
        Self {
            schema,
            config,
            stats: AHashMap::new(),
            optimized: AHashSet::new(),
            hook: Box::new(LoggingHook),
        }
    }

    /// Replace the auto-optimize hook
    pub fn with_hook(mut self, hook: impl AutoOptimizeHook + 'static) -> Self {
        self.hook = Box::new(hook);
        self
    }

    /// Get the optimizer configuration
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Get the schema registry
    pub fn schema(&self) -> &S {
        &self.schema
    }

    /// Score `sql`, flag full scans and list unindexed fields of its target table
    pub fn analyze_query(&self, sql: &str) -> QueryAnalysis {
        let findings = analysis::findings(sql);
        let complexity_score: u32 = findings.iter().map(|f| f.score).sum();
        let mut suggestions: Vec<String> = findings.into_iter().map(|f| f.suggestion).collect();

        let missing_indexes = match analysis::target_table(sql) {
            Some(table) => {
                let missing = self.detect_missing_indexes(sql, table);
                suggestions.extend(
                    missing
                        .iter()
                        .map(|field| format!("Consider adding an index on {}.{}", table, field)),
                );
                missing
            }
            None => vec![],
        };

        QueryAnalysis {
            sql: sql.to_string(),
            estimated_time_ms: analysis::estimated_time_ms(complexity_score),
            has_full_table_scan: analysis::detect_full_table_scan(sql),
            missing_indexes,
            suggestions,
            complexity_score,
        }
    }

    /// Unindexed fields of `table` used in WHERE, ORDER BY or JOIN ON.
    /// Unknown tables report nothing.
    pub fn detect_missing_indexes(&self, sql: &str, table: &str) -> Vec<String> {
        match self.schema.table_schema(table) {
            Some(schema) => analysis::missing_indexes(sql, &schema),
            None => vec![],
        }
    }

    /// Check if `sql` is a SELECT with neither WHERE nor LIMIT
    pub fn detect_full_table_scan(&self, sql: &str) -> bool {
        analysis::detect_full_table_scan(sql)
    }

    /// Estimated milliseconds for `sql`, derived from its complexity score
    pub fn estimate_execution_time(&self, sql: &str) -> u64 {
        analysis::estimated_time_ms(analysis::complexity_score(sql))
    }

    /// Record one execution of `sql`, invoking the hook when the statement
    /// first qualifies as persistently slow
    pub fn record_query_execution(&mut self, sql: &str, elapsed: Duration) {
        let stats = self
            .stats
            .entry(sql.to_string())
            .or_insert_with(|| QueryStats::new(sql));
        stats.record(elapsed);

        if !self.config.enable_auto_optimize
            || stats.execution_count() < self.config.auto_optimize_threshold
            || stats.average_time() <= self.config.slow_query_threshold
            || self.optimized.contains(sql)
        {
            return;
        }

        let stats = stats.clone();
        debug!(sql, executions = stats.execution_count(), "auto-optimizing statement");
        let analysis = self.analyze_query(sql);
        self.hook.on_slow_query(&stats, &analysis);
        self.optimized.insert(sql.to_string());
    }

    /// Timings recorded for exactly `sql`
    pub fn query_stats(&self, sql: &str) -> Option<&QueryStats> {
        self.stats.get(sql)
    }

    /// Every tracked statement, ordered by SQL text
    pub fn all_query_stats(&self) -> Vec<&QueryStats> {
        let mut all: Vec<&QueryStats> = self.stats.values().collect();
        all.sort_by(|a, b| a.sql().cmp(b.sql()));
        all
    }

    /// Statements whose average exceeds the slow threshold, slowest first
    pub fn slow_queries(&self) -> Vec<&QueryStats> {
        let mut slow: Vec<&QueryStats> = self
            .stats
            .values()
            .filter(|s| s.average_time() > self.config.slow_query_threshold)
            .collect();
        slow.sort_by(|a, b| {
            b.average_time()
                .cmp(&a.average_time())
                .then_with(|| a.sql().cmp(b.sql()))
        });
        slow
    }

    /// The `limit` most executed statements, most executed first
    pub fn frequent_queries(&self, limit: usize) -> Vec<&QueryStats> {
        let mut frequent: Vec<&QueryStats> = self.stats.values().collect();
        frequent.sort_by(|a, b| {
            b.execution_count()
                .cmp(&a.execution_count())
                .then_with(|| a.sql().cmp(b.sql()))
        });
        frequent.truncate(limit);
        frequent
    }

    /// Forget all timings. The hook may fire again for every statement.
    pub fn clear_stats(&mut self) {
        self.stats.clear();
        self.optimized.clear();
    }
}

impl<S: SchemaRegistry> fmt::Debug for QueryOptimizer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptimizer")
            .field("config", &self.config)
            .field("tracked", &self.stats.len())
            .finish()
    }
}
