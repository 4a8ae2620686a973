//! Extension point for statements that stay slow

use crate::analysis::QueryAnalysis;
use crate::stats::QueryStats;
use tracing::warn;

/// Invoked once per statement when it has run at least
/// `auto_optimize_threshold` times with an average above
/// `slow_query_threshold`. Fires again only after the stats are cleared.
pub trait AutoOptimizeHook: Send + Sync {
    fn on_slow_query(&self, stats: &QueryStats, analysis: &QueryAnalysis);
}

/// Default hook: report the statement and its suggestions
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHook;

impl AutoOptimizeHook for LoggingHook {
    fn on_slow_query(&self, stats: &QueryStats, analysis: &QueryAnalysis) {
        warn!(
            sql = %stats.sql(),
            executions = stats.execution_count(),
            avg_ms = stats.average_time().as_millis() as u64,
            score = analysis.complexity_score,
            missing_indexes = ?analysis.missing_indexes,
            "slow query"
        );
        for suggestion in &analysis.suggestions {
            warn!(sql = %stats.sql(), "{}", suggestion);
        }
    }
}

impl<F> AutoOptimizeHook for F
where
    F: Fn(&QueryStats, &QueryAnalysis) + Send + Sync,
{
    fn on_slow_query(&self, stats: &QueryStats, analysis: &QueryAnalysis) {
        self(stats, analysis)
    }
}
