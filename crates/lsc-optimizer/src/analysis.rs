//! Pattern-based static analysis of SQL text
//!
//! This is not a parser. Every rule is a regular expression over the
//! upper-cased statement, contributing a score and a suggestion when it
//! matches. Text that matches nothing scores zero.

use lsc_core::TableSchema;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Result of analyzing one statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub sql: String,
    /// `1 + round(complexity_score * 0.5)`. An approximation, never measured.
    pub estimated_time_ms: u64,
    pub has_full_table_scan: bool,
    /// Unindexed fields of the target table referenced in WHERE, ORDER BY or ON
    pub missing_indexes: Vec<String>,
    pub suggestions: Vec<String>,
    pub complexity_score: u32,
}

static SELECT_STAR: Lazy<Regex> = Lazy::new(|| build(r"\bSELECT\s+(DISTINCT\s+)?\*"));
static SELECT_KEYWORD: Lazy<Regex> = Lazy::new(|| build(r"\bSELECT\b"));
static WHERE_KEYWORD: Lazy<Regex> = Lazy::new(|| build(r"\bWHERE\b"));
static LIMIT_KEYWORD: Lazy<Regex> = Lazy::new(|| build(r"\bLIMIT\b"));
static OR_KEYWORD: Lazy<Regex> = Lazy::new(|| build(r"\bOR\b"));
static JOIN_KEYWORD: Lazy<Regex> = Lazy::new(|| build(r"\bJOIN\b"));
static ON_KEYWORD: Lazy<Regex> = Lazy::new(|| build(r"\bON\b"));
static ORDER_BY: Lazy<Regex> = Lazy::new(|| build(r"\bORDER\s+BY\b"));
static LEADING_WILDCARD: Lazy<Regex> = Lazy::new(|| build(r"\bLIKE\s+'%"));
static COLUMN_FUNCTION: Lazy<Regex> =
    Lazy::new(|| build(r"\b(UPPER|LOWER|SUBSTR|LENGTH|TRIM|DATE|DATETIME)\s*\("));
static CLAUSE_END: Lazy<Regex> = Lazy::new(|| {
    build(r"\b(WHERE|GROUP\s+BY|ORDER\s+BY|HAVING|LIMIT|OFFSET|UNION|INNER|LEFT|RIGHT|FULL|CROSS|JOIN)\b")
});
static TARGET_TABLE: Lazy<Regex> =
    Lazy::new(|| build(r"(?i)\b(?:FROM|UPDATE)\s+([A-Za-z_][A-Za-z0-9_]*)"));

fn build(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern is valid")
}

/// One contribution to the complexity score
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Finding {
    pub score: u32,
    pub suggestion: String,
}

impl Finding {
    fn new(score: u32, suggestion: impl Into<String>) -> Self {
        Self {
            score,
            suggestion: suggestion.into(),
        }
    }
}

/// A single heuristic. Receives the upper-cased statement.
trait AnalysisRule: Send + Sync {
    fn check(&self, sql: &str) -> Option<Finding>;
}

struct SelectStar;

impl AnalysisRule for SelectStar {
    fn check(&self, sql: &str) -> Option<Finding> {
        SELECT_STAR
            .is_match(sql)
            .then(|| Finding::new(10, "Avoid SELECT *; list only the columns you need"))
    }
}

struct FullTableScan;

impl AnalysisRule for FullTableScan {
    fn check(&self, sql: &str) -> Option<Finding> {
        is_full_table_scan(sql).then(|| {
            Finding::new(
                30,
                "Query reads the whole table; add a WHERE clause or a LIMIT",
            )
        })
    }
}

struct OrPredicate;

impl AnalysisRule for OrPredicate {
    fn check(&self, sql: &str) -> Option<Finding> {
        OR_KEYWORD.is_match(sql).then(|| {
            Finding::new(
                15,
                "OR conditions can prevent index usage; consider IN or UNION",
            )
        })
    }
}

struct LeadingWildcard;

impl AnalysisRule for LeadingWildcard {
    fn check(&self, sql: &str) -> Option<Finding> {
        LEADING_WILDCARD.is_match(sql).then(|| {
            Finding::new(
                20,
                "LIKE with a leading wildcard cannot use an index",
            )
        })
    }
}

struct FunctionOnColumn;

impl AnalysisRule for FunctionOnColumn {
    fn check(&self, sql: &str) -> Option<Finding> {
        clause_texts(sql, &WHERE_KEYWORD)
            .iter()
            .any(|clause| COLUMN_FUNCTION.is_match(clause))
            .then(|| {
                Finding::new(
                    15,
                    "Function calls on columns in WHERE prevent index usage",
                )
            })
    }
}

struct ManyJoins;

impl AnalysisRule for ManyJoins {
    fn check(&self, sql: &str) -> Option<Finding> {
        let joins = JOIN_KEYWORD.find_iter(sql).count() as u32;
        (joins > 3).then(|| {
            Finding::new(
                10 * joins,
                format!("{} JOINs; consider splitting the query or denormalizing", joins),
            )
        })
    }
}

struct Subquery;

impl AnalysisRule for Subquery {
    fn check(&self, sql: &str) -> Option<Finding> {
        (SELECT_KEYWORD.find_iter(sql).count() > 1)
            .then(|| Finding::new(20, "Subquery detected; consider rewriting it as a JOIN"))
    }
}

const RULES: &[&dyn AnalysisRule] = &[
    &SelectStar,
    &FullTableScan,
    &OrPredicate,
    &LeadingWildcard,
    &FunctionOnColumn,
    &ManyJoins,
    &Subquery,
];

/// Run every rule over `sql`, in a fixed order
pub(crate) fn findings(sql: &str) -> Vec<Finding> {
    let upper = sql.to_uppercase();
    RULES.iter().filter_map(|rule| rule.check(&upper)).collect()
}

/// Sum of the scores of every matching rule
pub fn complexity_score(sql: &str) -> u32 {
    findings(sql).iter().map(|f| f.score).sum()
}

/// Rough cost in milliseconds for a complexity score
pub fn estimated_time_ms(complexity_score: u32) -> u64 {
    1 + (f64::from(complexity_score) * 0.5).round() as u64
}

/// A statement that starts with SELECT and has neither WHERE nor LIMIT
pub fn detect_full_table_scan(sql: &str) -> bool {
    is_full_table_scan(&sql.to_uppercase())
}

fn is_full_table_scan(upper: &str) -> bool {
    upper.trim_start().starts_with("SELECT")
        && !WHERE_KEYWORD.is_match(upper)
        && !LIMIT_KEYWORD.is_match(upper)
}

/// Table named after the first FROM or UPDATE keyword, case preserved
pub fn target_table(sql: &str) -> Option<&str> {
    TARGET_TABLE
        .captures(sql)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Fields of `schema` referenced in WHERE, ORDER BY or JOIN ON text that no
/// declared index covers, in schema field order
pub fn missing_indexes(sql: &str, schema: &TableSchema) -> Vec<String> {
    let upper = sql.to_uppercase();
    let mut clauses = clause_texts(&upper, &WHERE_KEYWORD);
    clauses.extend(clause_texts(&upper, &ORDER_BY));
    if JOIN_KEYWORD.is_match(&upper) {
        clauses.extend(clause_texts(&upper, &ON_KEYWORD));
    }

    schema
        .fields()
        .iter()
        .filter(|field| !schema.is_indexed(field))
        .filter(|field| references(&clauses, field))
        .cloned()
        .collect()
}

fn references(clauses: &[&str], field: &str) -> bool {
    let pattern = format!(r"\b{}\b", regex::escape(&field.to_uppercase()));
    match Regex::new(&pattern) {
        Ok(re) => clauses.iter().any(|clause| re.is_match(clause)),
        Err(_) => false,
    }
}

/// Text following each match of `start`, up to the next clause keyword
fn clause_texts<'a>(sql: &'a str, start: &Regex) -> Vec<&'a str> {
    start
        .find_iter(sql)
        .map(|m| {
            let rest = &sql[m.end()..];
            let end = CLAUSE_END.find(rest).map_or(rest.len(), |e| e.start());
            &rest[..end]
        })
        .collect()
}
