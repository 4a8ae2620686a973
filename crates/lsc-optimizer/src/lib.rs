//! Heuristic query analysis and execution statistics
//!
//! [`QueryOptimizer::analyze_query`] scores SQL text with a fixed set of
//! pattern rules and checks the referenced columns against the declared
//! indexes of a [`SchemaRegistry`](lsc_core::SchemaRegistry). The stats
//! tracker records per-statement timings and hands persistently slow
//! statements to an [`AutoOptimizeHook`].

pub mod analysis;
pub mod config;
pub mod hook;
pub mod optimizer;
pub mod stats;

pub use analysis::QueryAnalysis;
pub use config::OptimizerConfig;
pub use hook::{AutoOptimizeHook, LoggingHook};
pub use optimizer::QueryOptimizer;
pub use stats::QueryStats;
