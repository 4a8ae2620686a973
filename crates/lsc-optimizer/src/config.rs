//! Optimizer configuration

use lsc_core::duration::millis;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Average execution time above which a statement counts as slow
    #[serde(with = "millis")]
    pub slow_query_threshold: Duration,
    /// Executions required before a slow statement reaches the hook
    pub auto_optimize_threshold: u64,
    pub enable_auto_optimize: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            slow_query_threshold: Duration::from_millis(100),
            auto_optimize_threshold: 10,
            enable_auto_optimize: true,
        }
    }
}

impl OptimizerConfig {
    /// Set the average time above which a statement is slow
    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = threshold;
        self
    }

    /// Set the executions required before the hook may fire
    pub fn with_auto_optimize_threshold(mut self, executions: u64) -> Self {
        self.auto_optimize_threshold = executions;
        self
    }

    /// Enable or disable the auto-optimize hook
    pub fn with_auto_optimize(mut self, enabled: bool) -> Self {
        self.enable_auto_optimize = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OptimizerConfig::default();
        assert_eq!(config.slow_query_threshold, Duration::from_millis(100));
        assert_eq!(config.auto_optimize_threshold, 10);
        assert!(config.enable_auto_optimize);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: OptimizerConfig =
            serde_json::from_str(r#"{"slow_query_threshold": 250}"#).unwrap();
        assert_eq!(config.slow_query_threshold, Duration::from_millis(250));
        assert_eq!(config.auto_optimize_threshold, 10);
    }
}
