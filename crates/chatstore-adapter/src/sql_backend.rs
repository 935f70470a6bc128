//! Relational driver
//!
//! Renders each operation as one parameterised statement and hands it to an
//! [`SqlExecutor`], which owns the connection. Values are never inlined into
//! the SQL text; identifiers are always quoted.

use async_trait::async_trait;
use tracing::debug;

use chatstore_common::error::{Error, Result};
use chatstore_common::types::{
    CleanedWhere, Connector, Operator, Record, SortBy, SortDirection, Value,
};

use crate::backend::{BackendDriver, FindManyQuery};

/// Placeholder flavour of the target engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SqlDialect {
    /// `$1, $2, ...`
    #[default]
    Postgres,
    /// `?`
    Sqlite,
}

impl SqlDialect {
    fn placeholder(self, index: usize) -> String {
        match self {
            Self::Postgres => format!("${}", index),
            Self::Sqlite => "?".to_string(),
        }
    }
}

/// SQL text plus its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Connection-owning half of the relational driver
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Run a statement that yields rows
    async fn query(&self, statement: &SqlStatement) -> Result<Vec<Record>>;

    /// Run a statement and return the number of affected rows
    async fn execute(&self, statement: &SqlStatement) -> Result<u64>;
}

/// [`BackendDriver`] over any [`SqlExecutor`]
pub struct SqlBackend<E> {
    executor: E,
    dialect: SqlDialect,
}

impl<E: SqlExecutor> SqlBackend<E> {
    pub fn new(executor: E, dialect: SqlDialect) -> Self {
        Self { executor, dialect }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    fn builder(&self) -> StatementBuilder {
        StatementBuilder::new(self.dialect)
    }

    async fn query(&self, statement: SqlStatement) -> Result<Vec<Record>> {
        debug!(sql = %statement.sql, params = statement.params.len(), "Executing SQL query");
        self.executor.query(&statement).await
    }

    async fn execute(&self, statement: SqlStatement) -> Result<u64> {
        debug!(sql = %statement.sql, params = statement.params.len(), "Executing SQL statement");
        self.executor.execute(&statement).await
    }
}

// ============================================================================
// Statement Building
// ============================================================================

struct StatementBuilder {
    dialect: SqlDialect,
    sql: String,
    params: Vec<Value>,
}

impl StatementBuilder {
    fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    fn ident(&mut self, name: &str) -> &mut Self {
        self.sql.push_str(&quote_ident(name));
        self
    }

    fn bind(&mut self, value: Value) -> &mut Self {
        self.params.push(value);
        let placeholder = self.dialect.placeholder(self.params.len());
        self.sql.push_str(&placeholder);
        self
    }

    fn columns(&mut self, select: Option<&[String]>) -> &mut Self {
        match select {
            Some(columns) if !columns.is_empty() => {
                let list = columns
                    .iter()
                    .map(|column| quote_ident(column))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.push(&list)
            }
            _ => self.push("*"),
        }
    }

    fn assignments(&mut self, values: Record) -> &mut Self {
        for (index, (column, value)) in values.into_iter().enumerate() {
            if index > 0 {
                self.push(", ");
            }
            self.ident(&column).push(" = ").bind(value);
        }
        self
    }

    /// AND predicates must all hold; when OR predicates exist one of them
    /// must hold as well.
    fn where_clause(&mut self, predicates: &[CleanedWhere]) -> &mut Self {
        if predicates.is_empty() {
            return self;
        }
        let (any, all): (Vec<&CleanedWhere>, Vec<&CleanedWhere>) = predicates
            .iter()
            .partition(|predicate| predicate.connector == Connector::Or);

        self.push(" WHERE ");
        if !all.is_empty() {
            self.group(&all, " AND ");
        }
        if !any.is_empty() {
            if !all.is_empty() {
                self.push(" AND ");
            }
            self.group(&any, " OR ");
        }
        self
    }

    fn group(&mut self, predicates: &[&CleanedWhere], joiner: &str) {
        self.push("(");
        for (index, predicate) in predicates.iter().enumerate() {
            if index > 0 {
                self.push(joiner);
            }
            self.predicate(predicate);
        }
        self.push(")");
    }

    fn like(&mut self, field: &str, pattern: String) {
        self.ident(field)
            .push(" LIKE ")
            .bind(Value::String(pattern))
            .push(" ESCAPE '\\'");
    }

    fn predicate(&mut self, predicate: &CleanedWhere) {
        let value = predicate.value.clone();
        match (predicate.operator, value) {
            (Operator::Eq, Value::Null) => {
                self.ident(&predicate.field).push(" IS NULL");
            }
            (Operator::Ne, Value::Null) => {
                self.ident(&predicate.field).push(" IS NOT NULL");
            }
            (operator @ (Operator::In | Operator::NotIn), value) => {
                let items = match value {
                    Value::Array(items) => items,
                    single => vec![single],
                };
                if items.is_empty() {
                    // Nothing is in the empty set
                    self.push(if operator == Operator::In { "1 = 0" } else { "1 = 1" });
                    return;
                }
                self.ident(&predicate.field).push(if operator == Operator::In {
                    " IN ("
                } else {
                    " NOT IN ("
                });
                for (index, item) in items.into_iter().enumerate() {
                    if index > 0 {
                        self.push(", ");
                    }
                    self.bind(item);
                }
                self.push(")");
            }
            (Operator::Contains, value) => {
                self.like(&predicate.field, format!("%{}%", escape_like(&value.to_string())));
            }
            (Operator::StartsWith, value) => {
                self.like(&predicate.field, format!("{}%", escape_like(&value.to_string())));
            }
            (Operator::EndsWith, value) => {
                self.like(&predicate.field, format!("%{}", escape_like(&value.to_string())));
            }
            (operator, value) => {
                let symbol = match operator {
                    Operator::Ne => " <> ",
                    Operator::Lt => " < ",
                    Operator::Lte => " <= ",
                    Operator::Gt => " > ",
                    Operator::Gte => " >= ",
                    _ => " = ",
                };
                self.ident(&predicate.field).push(symbol).bind(value);
            }
        }
    }

    fn order_by(&mut self, sort_by: Option<&SortBy>) -> &mut Self {
        if let Some(sort_by) = sort_by {
            self.push(" ORDER BY ").ident(&sort_by.field).push(match sort_by.direction {
                SortDirection::Asc => " ASC",
                SortDirection::Desc => " DESC",
            });
        }
        self
    }

    fn limit(&mut self, limit: Option<usize>, offset: Option<usize>) -> &mut Self {
        if let Some(limit) = limit {
            self.push(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = offset {
            self.push(&format!(" OFFSET {}", offset));
        }
        self
    }

    fn build(&mut self) -> SqlStatement {
        SqlStatement {
            sql: std::mem::take(&mut self.sql),
            params: std::mem::take(&mut self.params),
        }
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Match `%`, `_` and the escape character itself literally
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn select_statement(
    dialect: SqlDialect,
    table: &str,
    where_clause: &[CleanedWhere],
    query: &FindManyQuery,
) -> SqlStatement {
    StatementBuilder::new(dialect)
        .push("SELECT ")
        .columns(query.select.as_deref())
        .push(" FROM ")
        .ident(table)
        .where_clause(where_clause)
        .order_by(query.sort_by.as_ref())
        .limit(query.limit, query.offset)
        .build()
}

fn project(row: Record, select: Option<&[String]>) -> Record {
    match select {
        Some(columns) if !columns.is_empty() => row
            .into_iter()
            .filter(|(column, _)| columns.iter().any(|c| c == column))
            .collect(),
        _ => row,
    }
}

#[async_trait]
impl<E: SqlExecutor> BackendDriver for SqlBackend<E> {
    async fn create(&self, model: &str, data: Record, select: Option<&[String]>) -> Result<Record> {
        let mut builder = self.builder();
        builder.push("INSERT INTO ").ident(model);
        if data.is_empty() {
            // Every column falls back to its default, the id to its sequence
            builder.push(" DEFAULT VALUES");
        } else {
            let columns: Vec<String> = data.keys().map(|column| quote_ident(column)).collect();
            builder.push(" (").push(&columns.join(", ")).push(") VALUES (");
            for (index, value) in data.values().cloned().enumerate() {
                if index > 0 {
                    builder.push(", ");
                }
                builder.bind(value);
            }
            builder.push(")");
        }
        builder.push(" RETURNING ").columns(select);

        let rows = self.query(builder.build()).await?;
        // Executors without RETURNING support hand back nothing
        let row = rows.into_iter().next().unwrap_or(data);
        Ok(project(row, select))
    }

    async fn update(
        &self,
        model: &str,
        where_clause: &[CleanedWhere],
        update: Record,
    ) -> Result<Option<Record>> {
        if update.is_empty() {
            return self.find_one(model, where_clause, None).await;
        }

        let statement = self
            .builder()
            .push("UPDATE ")
            .ident(model)
            .push(" SET ")
            .assignments(update)
            .where_clause(where_clause)
            .push(" RETURNING *")
            .build();

        Ok(self.query(statement).await?.into_iter().next())
    }

    async fn update_many(
        &self,
        model: &str,
        where_clause: &[CleanedWhere],
        update: Record,
    ) -> Result<u64> {
        if update.is_empty() {
            return self.count(model, where_clause).await;
        }

        let statement = self
            .builder()
            .push("UPDATE ")
            .ident(model)
            .push(" SET ")
            .assignments(update)
            .where_clause(where_clause)
            .build();

        self.execute(statement).await
    }

    async fn count(&self, model: &str, where_clause: &[CleanedWhere]) -> Result<u64> {
        let statement = self
            .builder()
            .push("SELECT COUNT(*) AS \"count\" FROM ")
            .ident(model)
            .where_clause(where_clause)
            .build();

        let rows = self.query(statement).await?;
        let count = rows
            .first()
            .and_then(|row| row.get("count"))
            .and_then(|value| match value {
                Value::String(text) => text.parse::<i64>().ok(),
                other => other.as_i64(),
            })
            .ok_or_else(|| Error::Backend(format!("count on '{}' returned no number", model)))?;

        u64::try_from(count).map_err(|_| Error::Backend(format!("negative count on '{}'", model)))
    }

    async fn delete(&self, model: &str, where_clause: &[CleanedWhere]) -> Result<()> {
        self.delete_many(model, where_clause).await.map(|_| ())
    }

    async fn delete_many(&self, model: &str, where_clause: &[CleanedWhere]) -> Result<u64> {
        let statement = self
            .builder()
            .push("DELETE FROM ")
            .ident(model)
            .where_clause(where_clause)
            .build();

        self.execute(statement).await
    }

    async fn find_one(
        &self,
        model: &str,
        where_clause: &[CleanedWhere],
        select: Option<&[String]>,
    ) -> Result<Option<Record>> {
        let query = FindManyQuery {
            limit: Some(1),
            select: select.map(<[String]>::to_vec),
            ..FindManyQuery::default()
        };
        let statement = select_statement(self.dialect, model, where_clause, &query);

        Ok(self.query(statement).await?.into_iter().next())
    }

    async fn find_many(&self, model: &str, query: &FindManyQuery) -> Result<Vec<Record>> {
        let statement = select_statement(self.dialect, model, &query.where_clause, query);
        self.query(statement).await
    }
}
