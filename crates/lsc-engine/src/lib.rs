//! Wiring for the lsc query subsystem
//!
//! [`Engine`] hands out [`QueryBuilder`](lsc_query::QueryBuilder)s bound to an
//! [`InstrumentedBackend`], which registers every statement in a prepared
//! statement cache and feeds its timings to the optimizer. The engine also
//! keeps an optional result cache keyed by compiled SQL and arguments.

pub mod config;
pub mod engine;
pub mod instrumented;

pub use config::EngineConfig;
pub use engine::Engine;
pub use instrumented::InstrumentedBackend;
