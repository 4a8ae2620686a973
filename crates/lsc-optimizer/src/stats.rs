//! Per-statement execution statistics

use lsc_core::duration::{millis, option_millis};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Accumulated timings for one exact SQL text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStats {
    sql: String,
    execution_count: u64,
    #[serde(with = "millis")]
    total_time: Duration,
    #[serde(with = "option_millis")]
    min_time: Option<Duration>,
    #[serde(with = "option_millis")]
    max_time: Option<Duration>,
    last_executed: Option<SystemTime>,
}

impl QueryStats {
    /// Create empty stats for `sql`
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            execution_count: 0,
            total_time: Duration::ZERO,
            min_time: None,
            max_time: None,
            last_executed: None,
        }
    }

    /// Fold one execution into the totals
    pub(crate) fn record(&mut self, elapsed: Duration) {
        self.execution_count = self.execution_count.saturating_add(1);
        self.total_time = self.total_time.saturating_add(elapsed);
        self.min_time = Some(self.min_time.map_or(elapsed, |min| min.min(elapsed)));
        self.max_time = Some(self.max_time.map_or(elapsed, |max| max.max(elapsed)));
        self.last_executed = Some(SystemTime::now());
    }

    /// The exact statement text
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of recorded executions
    pub fn execution_count(&self) -> u64 {
        self.execution_count
    }

    /// Sum of all execution times, saturating at `Duration::MAX`
    pub fn total_time(&self) -> Duration {
        self.total_time
    }

    /// Fastest execution, `None` before the first
    pub fn min_time(&self) -> Option<Duration> {
        self.min_time
    }

    /// Slowest execution, `None` before the first
    pub fn max_time(&self) -> Option<Duration> {
        self.max_time
    }

    /// Wall-clock time of the latest execution
    pub fn last_executed(&self) -> Option<SystemTime> {
        self.last_executed
    }

    /// Mean execution time, zero before the first execution
    pub fn average_time(&self) -> Duration {
        if self.execution_count == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total_time.as_nanos() / u128::from(self.execution_count);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}
