//! Core types shared by the lsc query subsystem
//!
//! - [`Value`] / [`Record`]: the closed scalar model exchanged with the backend
//! - [`QueryError`]: compile-time and configuration errors
//! - [`ExecutionBackend`] and [`SchemaRegistry`]: the two collaborator contracts

pub mod backend;
pub mod duration;
pub mod error;
pub mod schema;
pub mod value;

pub use backend::{ExecutionBackend, DEFAULT_SPACE};
pub use error::{QueryError, Result};
pub use schema::{InMemorySchemaRegistry, IndexDefinition, SchemaRegistry, TableSchema};
pub use value::{Record, Value};
