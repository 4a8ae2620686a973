//! Comparison operators understood by the condition compiler

use lsc_core::{QueryError, Value};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Like,
    NotLike,
    IsNull,
    IsNotNull,
    Between,
}

impl Operator {
    /// SQL spelling of the operator
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
            Operator::Between => "BETWEEN",
        }
    }

    /// IS NULL / IS NOT NULL take no operand
    pub fn is_unary(&self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        let op = match normalized.to_ascii_uppercase().as_str() {
            "=" | "==" => Operator::Equal,
            "!=" | "<>" => Operator::NotEqual,
            ">" => Operator::GreaterThan,
            ">=" => Operator::GreaterThanOrEqual,
            "<" => Operator::LessThan,
            "<=" => Operator::LessThanOrEqual,
            "LIKE" => Operator::Like,
            "NOT LIKE" => Operator::NotLike,
            "IS NULL" => Operator::IsNull,
            "IS NOT NULL" => Operator::IsNotNull,
            "BETWEEN" => Operator::Between,
            _ => {
                return Err(QueryError::invalid_argument(format!(
                    "unknown operator '{}'",
                    s
                )))
            }
        };
        Ok(op)
    }
}

/// Right-hand side of a `Where` clause
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Operand {
    /// No value, used by IS NULL / IS NOT NULL
    #[default]
    None,
    Value(Value),
    /// Inclusive `(low, high)` pair, used by BETWEEN
    Range(Value, Value),
}

impl Operand {
    /// Single-value operand
    pub fn value(value: impl Into<Value>) -> Self {
        Operand::Value(value.into())
    }

    /// `(low, high)` operand for BETWEEN
    pub fn range(low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Operand::Range(low.into(), high.into())
    }
}
