//! Placeholder / argument alignment over random condition trees

use lsc_core::{QueryError, Record, Value};
use lsc_query::{ConditionClause, Operand, Operator, QueryCondition};
use lsc_query::{ConditionBuilder, CustomPredicate};
use proptest::prelude::*;

fn value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,6}".prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        Just(Value::Null),
    ]
}

/// Plain names plus quoted identifiers that contain `?`
fn field() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "[a-z]{1,8}",
        1 => "\"[a-z?]{1,6}\"",
    ]
}

fn binary_op() -> impl Strategy<Value = Operator> {
    prop_oneof![
        Just(Operator::Equal),
        Just(Operator::NotEqual),
        Just(Operator::GreaterThan),
        Just(Operator::GreaterThanOrEqual),
        Just(Operator::LessThan),
        Just(Operator::LessThanOrEqual),
        Just(Operator::Like),
        Just(Operator::NotLike),
    ]
}

fn leaf() -> impl Strategy<Value = ConditionClause> {
    prop_oneof![
        (field(), binary_op(), value()).prop_map(|(field, op, v)| ConditionClause::Where {
            field,
            op,
            operand: Operand::Value(v),
        }),
        (field(), any::<bool>()).prop_map(|(field, null)| ConditionClause::Where {
            field,
            op: if null { Operator::IsNull } else { Operator::IsNotNull },
            operand: Operand::None,
        }),
        (field(), value(), value()).prop_map(|(field, lo, hi)| ConditionClause::Where {
            field,
            op: Operator::Between,
            operand: Operand::Range(lo, hi),
        }),
        (field(), prop::collection::vec(value(), 1..5), any::<bool>()).prop_map(
            |(field, values, negated)| ConditionClause::WhereIn {
                field,
                values,
                negated,
            }
        ),
        Just(ConditionClause::Or),
        Just(ConditionClause::And),
    ]
}

fn clauses() -> impl Strategy<Value = Vec<ConditionClause>> {
    let clause = leaf().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            3 => inner.clone(),
            1 => prop::collection::vec(inner, 0..6).prop_map(|nested| {
                let mut group = QueryCondition::new();
                for clause in nested {
                    group.push(clause);
                }
                ConditionClause::Nested(group)
            }),
        ]
    });
    prop::collection::vec(clause, 0..10)
}

fn build(clauses: Vec<ConditionClause>) -> QueryCondition {
    let mut condition = QueryCondition::new();
    for clause in clauses {
        condition.push(clause);
    }
    condition
}

proptest! {
    #[test]
    fn placeholders_match_arguments(clauses in clauses()) {
        let compiled = build(clauses).compile().unwrap();
        prop_assert_eq!(compiled.placeholder_count(), compiled.args.len());
        let unquoted: usize = compiled
            .sql
            .split('"')
            .step_by(2)
            .map(|segment| segment.matches('?').count())
            .sum();
        prop_assert_eq!(unquoted, compiled.args.len());
        prop_assert!(!compiled.sql.starts_with(" OR") && !compiled.sql.starts_with(" AND"));
        prop_assert!(!compiled.sql.ends_with("OR ") && !compiled.sql.ends_with("AND "));
        prop_assert!(!compiled.sql.contains("()"));
    }

    #[test]
    fn custom_anywhere_is_unsupported(clauses in clauses(), at in any::<prop::sample::Index>()) {
        let mut clauses = clauses;
        let position = at.index(clauses.len() + 1);
        let custom = CustomPredicate::new("keep_all", |_: &Record| true);
        clauses.insert(position, ConditionClause::Nested(
            QueryCondition::new().where_custom("keep_all", |_: &Record| true),
        ));
        clauses.insert(position, ConditionClause::Custom(custom));

        let result = build(clauses).compile();
        prop_assert!(matches!(result, Err(QueryError::Unsupported(_))));
    }
}
