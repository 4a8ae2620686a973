//! Fluent SQL query builder
//!
//! A [`QueryBuilder`] is scoped to one table in one space. It accumulates
//! projection, joins, conditions, ordering and paging, compiles them to SQL
//! text plus positional arguments, and hands both to the injected
//! [`ExecutionBackend`]. It never runs anything itself.
//!
//! Clause order in generated SQL is fixed:
//! `SELECT … FROM … JOIN … WHERE … ORDER BY … LIMIT … OFFSET …`.

use crate::condition::{CompiledCondition, ConditionBuilder, ConditionClause, QueryCondition};
use crate::error::ExecuteError;
use futures::stream;
use lsc_core::{ExecutionBackend, QueryError, Record, Result, Value, DEFAULT_SPACE};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
}

impl JoinType {
    /// SQL keyword for this join
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
        }
    }
}

/// One JOIN clause. The ON predicate is raw text and is not checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub join_type: JoinType,
    pub table: String,
    pub left: String,
    pub op: String,
    pub right: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// SQL keyword for this direction
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Statement text and the arguments for its placeholders
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledQuery {
    pub sql: String,
    pub args: Vec<Value>,
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Fluent builder for one table in one space.
///
/// Setters consume and return the builder. Terminal operations borrow it, so
/// one builder can be executed several times.
pub struct QueryBuilder<B: ExecutionBackend> {
    backend: Arc<B>,
    table: String,
    space: String,
    fields: Vec<String>,
    joins: Vec<Join>,
    condition: QueryCondition,
    order_by: Vec<(String, SortOrder)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl<B: ExecutionBackend> Clone for QueryBuilder<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            table: self.table.clone(),
            space: self.space.clone(),
            fields: self.fields.clone(),
            joins: self.joins.clone(),
            condition: self.condition.clone(),
            order_by: self.order_by.clone(),
            limit: self.limit,
            offset: self.offset,
        }
    }
}

impl<B: ExecutionBackend> QueryBuilder<B> {
    /// Create a builder for `table` in the default space
    pub fn new(backend: Arc<B>, table: impl Into<String>) -> Self {
        Self {
            backend,
            table: table.into(),
            space: DEFAULT_SPACE.to_string(),
            fields: vec![],
            joins: vec![],
            condition: QueryCondition::new(),
            order_by: vec![],
            limit: None,
            offset: None,
        }
    }

    /// Run against another isolation space
    pub fn in_space(mut self, space: impl Into<String>) -> Self {
        self.space = space.into();
        self
    }

    /// Restrict the projection. An empty selection means `*`.
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Add an INNER JOIN on `left op right`
    pub fn join(
        self,
        table: impl Into<String>,
        left: impl Into<String>,
        op: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        self.push_join(JoinType::Inner, table, left, op, right)
    }

    /// Add a LEFT JOIN on `left op right`
    pub fn left_join(
        self,
        table: impl Into<String>,
        left: impl Into<String>,
        op: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        self.push_join(JoinType::Left, table, left, op, right)
    }

    /// Add a RIGHT JOIN on `left op right`
    pub fn right_join(
        self,
        table: impl Into<String>,
        left: impl Into<String>,
        op: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        self.push_join(JoinType::Right, table, left, op, right)
    }

    /// Append a sort key. Keys apply in the order added.
    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by.push((field.into(), order));
        self
    }

    /// Append an ascending sort key
    pub fn order_by_asc(self, field: impl Into<String>) -> Self {
        self.order_by(field, SortOrder::Asc)
    }

    /// Append a descending sort key
    pub fn order_by_desc(self, field: impl Into<String>) -> Self {
        self.order_by(field, SortOrder::Desc)
    }

    /// Cap the number of rows returned
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `offset` rows
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Get the target table
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Get the isolation space passed to the backend
    pub fn space(&self) -> &str {
        &self.space
    }

    /// Get the accumulated WHERE condition
    pub fn where_condition(&self) -> &QueryCondition {
        &self.condition
    }

    /// Compile the SELECT statement and its arguments
    pub fn to_select_sql(&self) -> Result<CompiledQuery> {
        let projection = if self.fields.is_empty() {
            "*".to_string()
        } else {
            self.fields.join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", projection, self.table);
        self.write_joins(&mut sql);
        let condition = self.write_where(&mut sql)?;

        if !self.order_by.is_empty() {
            let order: Vec<String> = self
                .order_by
                .iter()
                .map(|(field, order)| format!("{} {}", field, order.as_sql()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }

        match (self.limit, self.offset) {
            (Some(limit), _) => sql.push_str(&format!(" LIMIT {}", limit)),
            // SQLite rejects OFFSET without LIMIT; -1 means no limit
            (None, Some(_)) => sql.push_str(" LIMIT -1"),
            (None, None) => {}
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        Ok(CompiledQuery {
            sql,
            args: condition.args,
        })
    }

    /// `SELECT COUNT(*) AS count` over the same FROM / JOIN / WHERE
    pub fn to_count_sql(&self) -> Result<CompiledQuery> {
        let mut sql = format!("SELECT COUNT(*) AS count FROM {}", self.table);
        self.write_joins(&mut sql);
        let condition = self.write_where(&mut sql)?;
        Ok(CompiledQuery {
            sql,
            args: condition.args,
        })
    }

    /// `UPDATE … SET` with the SET values first, then the WHERE arguments
    pub fn to_update_sql(&self, values: &[(String, Value)]) -> Result<CompiledQuery> {
        if values.is_empty() {
            return Err(QueryError::invalid_argument(format!(
                "UPDATE on '{}' needs at least one column",
                self.table
            )));
        }
        if let Some((column, _)) = values.iter().find(|(c, _)| c.trim().is_empty()) {
            return Err(QueryError::invalid_argument(format!(
                "invalid UPDATE column '{}'",
                column
            )));
        }

        let assignments: Vec<String> = values
            .iter()
            .map(|(column, _)| format!("{} = ?", column))
            .collect();
        let mut sql = format!("UPDATE {} SET {}", self.table, assignments.join(", "));
        let condition = self.write_where(&mut sql)?;

        let mut args: Vec<Value> = values.iter().map(|(_, v)| v.clone()).collect();
        args.extend(condition.args);
        Ok(CompiledQuery { sql, args })
    }

    /// Compile the DELETE statement. No conditions means every row.
    pub fn to_delete_sql(&self) -> Result<CompiledQuery> {
        let mut sql = format!("DELETE FROM {}", self.table);
        let condition = self.write_where(&mut sql)?;
        Ok(CompiledQuery {
            sql,
            args: condition.args,
        })
    }

    /// Execute the SELECT and return every row
    pub async fn get(&self) -> std::result::Result<Vec<Record>, ExecuteError<B::Error>> {
        let query = self.to_select_sql()?;
        debug!(sql = %query.sql, args = query.args.len(), space = %self.space, "executing query");
        self.backend
            .query(&query.sql, &query.args, &self.space)
            .await
            .map_err(ExecuteError::Backend)
    }

    /// Execute with `LIMIT 1` and return the first row, if any
    pub async fn first(&self) -> std::result::Result<Option<Record>, ExecuteError<B::Error>> {
        let rows = self.clone().limit(1).get().await?;
        Ok(rows.into_iter().next())
    }

    /// Execute the COUNT form and read its `count` column
    pub async fn count(&self) -> std::result::Result<u64, ExecuteError<B::Error>> {
        let query = self.to_count_sql()?;
        debug!(sql = %query.sql, args = query.args.len(), space = %self.space, "executing count");
        let rows = self
            .backend
            .query(&query.sql, &query.args, &self.space)
            .await
            .map_err(ExecuteError::Backend)?;

        Ok(rows
            .first()
            .and_then(|row| row.get("count"))
            .and_then(Value::as_i64)
            .map(|count| count.max(0) as u64)
            .unwrap_or(0))
    }

    /// Update matching rows. Columns are written in the order given.
    pub async fn update<I, K, V>(
        &self,
        values: I,
    ) -> std::result::Result<u64, ExecuteError<B::Error>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let values: Vec<(String, Value)> = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let query = self.to_update_sql(&values)?;
        debug!(sql = %query.sql, args = query.args.len(), space = %self.space, "executing update");
        self.backend
            .update(&query.sql, &query.args, &self.space)
            .await
            .map_err(ExecuteError::Backend)
    }

    /// Delete matching rows. With no conditions this clears the table.
    pub async fn delete(&self) -> std::result::Result<u64, ExecuteError<B::Error>> {
        let query = self.to_delete_sql()?;
        debug!(sql = %query.sql, args = query.args.len(), space = %self.space, "executing delete");
        self.backend
            .delete(&query.sql, &query.args, &self.space)
            .await
            .map_err(ExecuteError::Backend)
    }

    /// Execute the SELECT and present the rows as a stream.
    ///
    /// The whole result is fetched before the stream is returned.
    pub async fn stream(
        &self,
    ) -> std::result::Result<stream::Iter<std::vec::IntoIter<Record>>, ExecuteError<B::Error>>
    {
        let rows = self.get().await?;
        Ok(stream::iter(rows))
    }

    fn push_join(
        mut self,
        join_type: JoinType,
        table: impl Into<String>,
        left: impl Into<String>,
        op: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        self.joins.push(Join {
            join_type,
            table: table.into(),
            left: left.into(),
            op: op.into(),
            right: right.into(),
        });
        self
    }

    fn write_joins(&self, sql: &mut String) {
        for join in &self.joins {
            sql.push_str(&format!(
                " {} {} ON {} {} {}",
                join.join_type.as_sql(),
                join.table,
                join.left,
                join.op,
                join.right
            ));
        }
    }

    fn write_where(&self, sql: &mut String) -> Result<CompiledCondition> {
        let condition = self.condition.compile()?;
        if !condition.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&condition.sql);
        }
        Ok(condition)
    }
}

impl<B: ExecutionBackend> ConditionBuilder for QueryBuilder<B> {
    fn push_clause(mut self, clause: ConditionClause) -> Self {
        self.condition.push(clause);
        self
    }
}

impl<B: ExecutionBackend> fmt::Debug for QueryBuilder<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("table", &self.table)
            .field("space", &self.space)
            .field("fields", &self.fields)
            .field("joins", &self.joins)
            .field("condition", &self.condition)
            .field("order_by", &self.order_by)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish()
    }
}
