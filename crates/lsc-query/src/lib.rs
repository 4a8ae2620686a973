//! Condition compiler and fluent query builder
//!
//! [`QueryBuilder`] turns chained calls into parameterized SQL and delegates
//! execution to an [`ExecutionBackend`](lsc_core::ExecutionBackend). The
//! WHERE clause is built from a [`QueryCondition`] tree; both share the
//! [`ConditionBuilder`] methods.
//!
//! ```
//! use lsc_query::prelude::*;
//!
//! let condition = QueryCondition::new()
//!     .where_equal("status", "active")
//!     .or_condition(|c| c.where_greater_than("age", 18).where_not_null("email"));
//!
//! let compiled = condition.compile().unwrap();
//! assert_eq!(compiled.sql, "status = ? OR (age > ? AND email IS NOT NULL)");
//! assert_eq!(compiled.args.len(), 2);
//! ```

pub mod builder;
pub mod condition;
pub mod error;
pub mod operator;

pub use builder::{CompiledQuery, Join, JoinType, QueryBuilder, SortOrder};
pub use condition::{
    CompiledCondition, ConditionBuilder, ConditionClause, CustomPredicate, QueryCondition,
};
pub use error::ExecuteError;
pub use operator::{Operand, Operator};

pub mod prelude {
    pub use crate::builder::{QueryBuilder, SortOrder};
    pub use crate::condition::{ConditionBuilder, QueryCondition};
    pub use crate::error::ExecuteError;
    pub use crate::operator::Operator;
    pub use lsc_core::{ExecutionBackend, Record, Value};
}
