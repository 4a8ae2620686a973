//! Boolean condition trees and their compilation to parameterized SQL
//!
//! A [`QueryCondition`] is an ordered list of [`ConditionClause`]s. Order is
//! significant: `Or` and `And` tokens join the predicates around them left to
//! right, two adjacent predicates are joined with `AND`, and `Nested` groups
//! are the only way to express precedence.
//!
//! Compilation produces the SQL text and the positional argument list in a
//! single traversal, so every `?` placeholder has exactly one argument at the
//! same position.

use crate::operator::{Operand, Operator};
use lsc_core::{QueryError, Record, Result, Value};
use std::fmt;
use std::sync::Arc;

/// In-memory predicate over a result row. Has no SQL form.
#[derive(Clone)]
pub struct CustomPredicate {
    label: String,
    predicate: Arc<dyn Fn(&Record) -> bool + Send + Sync>,
}

impl CustomPredicate {
    /// Wrap `predicate` under a label used in error messages
    pub fn new<F>(label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Get the label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Evaluate the predicate against a row already fetched from the backend
    pub fn matches(&self, record: &Record) -> bool {
        (self.predicate)(record)
    }
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomPredicate")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum ConditionClause {
    Where {
        field: String,
        op: Operator,
        operand: Operand,
    },
    WhereIn {
        field: String,
        values: Vec<Value>,
        negated: bool,
    },
    Custom(CustomPredicate),
    Or,
    And,
    Nested(QueryCondition),
}

impl ConditionClause {
    /// Check if this is an `Or` / `And` token rather than a predicate
    pub fn is_operator(&self) -> bool {
        matches!(self, ConditionClause::Or | ConditionClause::And)
    }
}

/// SQL text plus the arguments bound to its placeholders, in order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledCondition {
    pub sql: String,
    pub args: Vec<Value>,
    placeholders: usize,
}

impl CompiledCondition {
    /// True when no predicate was written
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Number of placeholders the compiler emitted. A `?` inside a field
    /// name is not counted.
    pub fn placeholder_count(&self) -> usize {
        self.placeholders
    }

    fn bind(&mut self, value: Value) {
        self.sql.push('?');
        self.args.push(value);
        self.placeholders += 1;
    }

    fn append(&mut self, other: CompiledCondition) {
        self.sql.push_str(&other.sql);
        self.args.extend(other.args);
        self.placeholders += other.placeholders;
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryCondition {
    clauses: Vec<ConditionClause>,
}

impl QueryCondition {
    /// Create an empty condition
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the clauses in insertion order
    pub fn clauses(&self) -> &[ConditionClause] {
        &self.clauses
    }

    /// Number of top-level clauses, operator tokens included
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Append a clause
    pub fn push(&mut self, clause: ConditionClause) {
        self.clauses.push(clause);
    }

    /// Compile to SQL text and aligned arguments.
    ///
    /// Fails with [`QueryError::Unsupported`] if any clause, at any depth, is
    /// a custom predicate, and with [`QueryError::InvalidArgument`] for
    /// operand/operator combinations that have no SQL form.
    pub fn compile(&self) -> Result<CompiledCondition> {
        let mut compiled = CompiledCondition::default();
        compile_clauses(&self.clauses, "", &mut compiled)?;
        debug_assert_eq!(compiled.placeholder_count(), compiled.args.len());
        Ok(compiled)
    }

    /// Compile and keep only the SQL text
    pub fn to_sql(&self) -> Result<String> {
        self.compile().map(|c| c.sql)
    }

    /// Compile and keep only the arguments
    pub fn arguments(&self) -> Result<Vec<Value>> {
        self.compile().map(|c| c.args)
    }

    /// Custom predicates at any depth, for post-query filtering
    pub fn custom_predicates(&self) -> Vec<&CustomPredicate> {
        let mut found = Vec::new();
        collect_custom(&self.clauses, &mut found);
        found
    }
}

/// Fluent clause construction shared by [`QueryCondition`] and the query builder
pub trait ConditionBuilder: Sized {
    fn push_clause(self, clause: ConditionClause) -> Self;

    /// Generic `field op value` predicate
    fn where_(self, field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        let operand = if op.is_unary() {
            Operand::None
        } else {
            Operand::Value(value.into())
        };
        self.push_clause(ConditionClause::Where {
            field: field.into(),
            op,
            operand,
        })
    }

    fn where_equal(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_(field, Operator::Equal, value)
    }

    fn where_not_equal(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_(field, Operator::NotEqual, value)
    }

    fn where_greater_than(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_(field, Operator::GreaterThan, value)
    }

    fn where_greater_than_or_equal(
        self,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.where_(field, Operator::GreaterThanOrEqual, value)
    }

    fn where_less_than(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_(field, Operator::LessThan, value)
    }

    fn where_less_than_or_equal(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_(field, Operator::LessThanOrEqual, value)
    }

    fn where_like(self, field: impl Into<String>, pattern: impl Into<Value>) -> Self {
        self.where_(field, Operator::Like, pattern)
    }

    fn where_not_like(self, field: impl Into<String>, pattern: impl Into<Value>) -> Self {
        self.where_(field, Operator::NotLike, pattern)
    }

    fn where_in<I, V>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_clause(ConditionClause::WhereIn {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        })
    }

    fn where_not_in<I, V>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_clause(ConditionClause::WhereIn {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        })
    }

    fn where_null(self, field: impl Into<String>) -> Self {
        self.push_clause(ConditionClause::Where {
            field: field.into(),
            op: Operator::IsNull,
            operand: Operand::None,
        })
    }

    fn where_not_null(self, field: impl Into<String>) -> Self {
        self.push_clause(ConditionClause::Where {
            field: field.into(),
            op: Operator::IsNotNull,
            operand: Operand::None,
        })
    }

    fn where_between(
        self,
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        self.push_clause(ConditionClause::Where {
            field: field.into(),
            op: Operator::Between,
            operand: Operand::range(low, high),
        })
    }

    /// In-memory predicate. Compiling a condition that holds one fails; apply
    /// it to fetched rows with [`CustomPredicate::matches`] instead.
    fn where_custom<F>(self, label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.push_clause(ConditionClause::Custom(CustomPredicate::new(label, predicate)))
    }

    fn or(self) -> Self {
        self.push_clause(ConditionClause::Or)
    }

    fn and(self) -> Self {
        self.push_clause(ConditionClause::And)
    }

    /// Parenthesized group, joined to what precedes it by `AND` unless an
    /// explicit operator was pushed
    fn condition<F>(self, build: F) -> Self
    where
        F: FnOnce(QueryCondition) -> QueryCondition,
    {
        self.push_clause(ConditionClause::Nested(build(QueryCondition::new())))
    }

    /// Parenthesized group joined to what precedes it by `OR`
    fn or_condition<F>(self, build: F) -> Self
    where
        F: FnOnce(QueryCondition) -> QueryCondition,
    {
        self.or()
            .push_clause(ConditionClause::Nested(build(QueryCondition::new())))
    }
}

impl ConditionBuilder for QueryCondition {
    fn push_clause(mut self, clause: ConditionClause) -> Self {
        self.clauses.push(clause);
        self
    }
}

/// Append the compiled form of `clauses` to `out`.
///
/// An operator token is only written between two predicates: leading,
/// trailing and repeated tokens collapse, the last one before a predicate
/// wins. `path` locates the group in the whole tree for error messages.
/// Returns whether anything was written.
fn compile_clauses(
    clauses: &[ConditionClause],
    path: &str,
    out: &mut CompiledCondition,
) -> Result<bool> {
    let mut written = false;
    let mut pending: Option<&'static str> = None;

    for (position, clause) in clauses.iter().enumerate() {
        match clause {
            ConditionClause::Or => pending = Some(" OR "),
            ConditionClause::And => pending = Some(" AND "),
            predicate => {
                let location = if path.is_empty() {
                    position.to_string()
                } else {
                    format!("{}.{}", path, position)
                };
                let mut fragment = CompiledCondition::default();
                if !compile_predicate(predicate, &location, &mut fragment)? {
                    continue;
                }
                if written {
                    out.sql.push_str(pending.unwrap_or(" AND "));
                }
                out.append(fragment);
                pending = None;
                written = true;
            }
        }
    }

    Ok(written)
}

fn compile_predicate(
    clause: &ConditionClause,
    location: &str,
    out: &mut CompiledCondition,
) -> Result<bool> {
    match clause {
        ConditionClause::Where { field, op, operand } => {
            check_field(field)?;
            match (op, operand) {
                (Operator::IsNull | Operator::IsNotNull, Operand::Range(..)) => {
                    return Err(QueryError::invalid_argument(format!(
                        "{} on '{}' takes no value",
                        op, field
                    )));
                }
                (Operator::IsNull | Operator::IsNotNull, _) => {
                    out.sql.push_str(&format!("{} {}", field, op));
                }
                (Operator::Between, Operand::Range(low, high)) => {
                    out.sql.push_str(&format!("{} BETWEEN ", field));
                    out.bind(low.clone());
                    out.sql.push_str(" AND ");
                    out.bind(high.clone());
                }
                (Operator::Between, _) => {
                    return Err(QueryError::invalid_argument(format!(
                        "BETWEEN on '{}' needs a (low, high) pair",
                        field
                    )));
                }
                (_, Operand::Value(value)) => {
                    out.sql.push_str(&format!("{} {} ", field, op));
                    out.bind(value.clone());
                }
                (_, Operand::None | Operand::Range(..)) => {
                    return Err(QueryError::invalid_argument(format!(
                        "{} on '{}' needs exactly one value",
                        op, field
                    )));
                }
            }
            Ok(true)
        }
        ConditionClause::WhereIn {
            field,
            values,
            negated,
        } => {
            check_field(field)?;
            let keyword = if *negated { "NOT IN" } else { "IN" };
            if values.is_empty() {
                return Err(QueryError::invalid_argument(format!(
                    "{} on '{}' needs at least one value",
                    keyword, field
                )));
            }
            out.sql.push_str(&format!("{} {} (", field, keyword));
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    out.sql.push_str(", ");
                }
                out.bind(value.clone());
            }
            out.sql.push(')');
            Ok(true)
        }
        ConditionClause::Custom(predicate) => Err(QueryError::unsupported(format!(
            "custom predicate '{}' at clause {} has no SQL form; filter the fetched rows instead",
            predicate.label(),
            location
        ))),
        ConditionClause::Nested(group) => {
            let mut inner = CompiledCondition::default();
            if !compile_clauses(group.clauses(), location, &mut inner)? {
                return Ok(false);
            }
            out.sql.push('(');
            out.append(inner);
            out.sql.push(')');
            Ok(true)
        }
        ConditionClause::Or | ConditionClause::And => Ok(false),
    }
}

fn check_field(field: &str) -> Result<()> {
    if field.trim().is_empty() {
        return Err(QueryError::invalid_argument("empty field name"));
    }
    Ok(())
}

fn collect_custom<'a>(clauses: &'a [ConditionClause], found: &mut Vec<&'a CustomPredicate>) {
    for clause in clauses {
        match clause {
            ConditionClause::Custom(predicate) => found.push(predicate),
            ConditionClause::Nested(group) => collect_custom(group.clauses(), found),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(condition: QueryCondition) -> CompiledCondition {
        condition.compile().unwrap()
    }

    #[test]
    fn test_single_predicate() {
        let c = compile(QueryCondition::new().where_equal("name", "alice"));
        assert_eq!(c.sql, "name = ?");
        assert_eq!(c.args, vec![Value::from("alice")]);
    }

    #[test]
    fn test_implicit_and() {
        let c = compile(
            QueryCondition::new()
                .where_equal("status", "active")
                .where_greater_than("age", 18),
        );
        assert_eq!(c.sql, "status = ? AND age > ?");
        assert_eq!(c.args, vec![Value::from("active"), Value::from(18)]);
    }

    #[test]
    fn test_explicit_or() {
        let c = compile(
            QueryCondition::new()
                .where_equal("role", "admin")
                .or()
                .where_equal("role", "owner"),
        );
        assert_eq!(c.sql, "role = ? OR role = ?");
        assert_eq!(c.args.len(), 2);
    }

    #[test]
    fn test_null_checks_take_no_arguments() {
        let c = compile(
            QueryCondition::new()
                .where_null("deleted_at")
                .where_not_null("email")
                .where_(String::from("banned_at"), Operator::IsNull, Value::Null),
        );
        assert_eq!(
            c.sql,
            "deleted_at IS NULL AND email IS NOT NULL AND banned_at IS NULL"
        );
        assert!(c.args.is_empty());
    }

    #[test]
    fn test_between_expands_to_two_arguments() {
        let c = compile(QueryCondition::new().where_between("age", 18, 65));
        assert_eq!(c.sql, "age BETWEEN ? AND ?");
        assert_eq!(c.args, vec![Value::from(18), Value::from(65)]);
    }

    #[test]
    fn test_in_expands_per_value() {
        let c = compile(
            QueryCondition::new()
                .where_in("id", [1, 2, 3])
                .where_not_in("status", ["banned"]),
        );
        assert_eq!(c.sql, "id IN (?, ?, ?) AND status NOT IN (?)");
        assert_eq!(
            c.args,
            vec![
                Value::from(1),
                Value::from(2),
                Value::from(3),
                Value::from("banned")
            ]
        );
    }

    #[test]
    fn test_nested_groups_keep_argument_order() {
        let c = compile(
            QueryCondition::new()
                .where_equal("active", true)
                .condition(|g| {
                    g.where_equal("role", "admin")
                        .or()
                        .where_between("level", 5, 9)
                })
                .or_condition(|g| g.where_in("id", [100, 200])),
        );
        assert_eq!(
            c.sql,
            "active = ? AND (role = ? OR level BETWEEN ? AND ?) OR (id IN (?, ?))"
        );
        assert_eq!(
            c.args,
            vec![
                Value::from(true),
                Value::from("admin"),
                Value::from(5),
                Value::from(9),
                Value::from(100),
                Value::from(200)
            ]
        );
    }

    #[test]
    fn test_deeply_nested() {
        let c = compile(QueryCondition::new().condition(|g| {
            g.condition(|h| h.where_like("name", "a%").or().where_like("name", "b%"))
                .where_less_than("age", 30)
        }));
        assert_eq!(c.sql, "((name LIKE ? OR name LIKE ?) AND age < ?)");
        assert_eq!(c.placeholder_count(), c.args.len());
    }

    #[test]
    fn test_dangling_operators_collapse() {
        let c = compile(
            QueryCondition::new()
                .or()
                .where_equal("a", 1)
                .and()
                .or()
                .where_equal("b", 2)
                .and(),
        );
        assert_eq!(c.sql, "a = ? OR b = ?");
    }

    #[test]
    fn test_empty_condition_and_empty_groups() {
        assert!(compile(QueryCondition::new()).is_empty());

        let c = compile(
            QueryCondition::new()
                .condition(|g| g)
                .where_equal("a", 1)
                .or_condition(|g| g.and()),
        );
        assert_eq!(c.sql, "a = ?");
        assert_eq!(c.args.len(), 1);
    }

    #[test]
    fn test_custom_predicate_is_rejected() {
        let condition = QueryCondition::new()
            .where_equal("a", 1)
            .where_custom("is_adult", |r: &Record| {
                r.get("age").and_then(Value::as_i64).unwrap_or(0) >= 18
            });

        let err = condition.compile().unwrap_err();
        match err {
            QueryError::Unsupported(msg) => {
                assert!(msg.contains("is_adult"));
                assert!(msg.contains("clause 1"));
            }
            other => panic!("Expected Unsupported, got {:?}", other),
        }
        assert!(condition.to_sql().is_err());
        assert!(condition.arguments().is_err());
    }

    #[test]
    fn test_nested_custom_predicate_is_rejected() {
        let condition = QueryCondition::new()
            .condition(|g| g.where_custom("deep", |_: &Record| true));
        assert!(matches!(condition.compile(), Err(QueryError::Unsupported(_))));
    }

    #[test]
    fn test_nested_custom_predicate_reports_full_path() {
        let condition = QueryCondition::new()
            .where_equal("a", 1)
            .or()
            .where_equal("b", 2)
            .condition(|g| {
                g.where_equal("c", 3)
                    .condition(|inner| inner.where_null("d").where_custom("deep", |_: &Record| true))
            });

        match condition.compile().unwrap_err() {
            QueryError::Unsupported(msg) => {
                assert!(msg.contains("'deep' at clause 3.1.1"), "{}", msg);
            }
            other => panic!("Expected Unsupported, got {:?}", other),
        }
    }

    #[test]
    fn test_question_mark_in_identifier_is_not_a_placeholder() {
        let c = compile(
            QueryCondition::new()
                .where_equal("\"why?\"", 1)
                .where_in("\"a?b\"", [1, 2])
                .where_null("\"c?\""),
        );
        assert_eq!(c.sql, "\"why?\" = ? AND \"a?b\" IN (?, ?) AND \"c?\" IS NULL");
        assert_eq!(c.placeholder_count(), 3);
        assert_eq!(c.args.len(), 3);
    }

    #[test]
    fn test_custom_predicate_filters_rows() {
        let condition =
            QueryCondition::new().where_custom("even", |r: &Record| {
                r.get("n").and_then(Value::as_i64).map(|n| n % 2 == 0).unwrap_or(false)
            });
        let predicates = condition.custom_predicates();
        assert_eq!(predicates.len(), 1);

        let rows: Vec<Record> = (0..5)
            .map(|n| Record::from([("n".to_string(), Value::from(n))]))
            .collect();
        let kept = rows.iter().filter(|r| predicates[0].matches(r)).count();
        assert_eq!(kept, 3);
    }

    #[test]
    fn test_malformed_arguments() {
        let between_single = QueryCondition::new().where_("age", Operator::Between, 5);
        assert!(matches!(
            between_single.compile(),
            Err(QueryError::InvalidArgument(_))
        ));

        let empty_in = QueryCondition::new().where_in("id", Vec::<i64>::new());
        assert!(matches!(empty_in.compile(), Err(QueryError::InvalidArgument(_))));

        let ranged_equal = QueryCondition::new().push_clause(ConditionClause::Where {
            field: "age".to_string(),
            op: Operator::Equal,
            operand: Operand::range(1, 2),
        });
        assert!(matches!(
            ranged_equal.compile(),
            Err(QueryError::InvalidArgument(_))
        ));

        let no_field = QueryCondition::new().where_equal(" ", 1);
        assert!(matches!(no_field.compile(), Err(QueryError::InvalidArgument(_))));
    }
}
