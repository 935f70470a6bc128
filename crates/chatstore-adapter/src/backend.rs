//! Backend driver contract and the in-memory driver
//!
//! Drivers receive physical table/column names and values that have already
//! been coerced to what the store supports. They must not remap keys or
//! reinterpret field types; that is the pipeline's job.

use std::cmp::Ordering;
use std::collections::HashMap;

use chatstore_common::error::Result;
use chatstore_common::types::{CleanedWhere, Connector, Operator, Record, SortBy, SortDirection, Value};
use chatstore_common::ID_FIELD;

/// Arguments of a `find_many` call, already translated to physical names
#[derive(Debug, Clone, Default)]
pub struct FindManyQuery {
    pub where_clause: Vec<CleanedWhere>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub sort_by: Option<SortBy>,
    pub select: Option<Vec<String>>,
}

/// Minimal CRUD contract implemented once per concrete store
#[async_trait::async_trait]
pub trait BackendDriver: Send + Sync {
    /// Insert one record and return it as stored
    async fn create(&self, model: &str, data: Record, select: Option<&[String]>) -> Result<Record>;

    /// Update the first matching record; `None` when nothing matched
    async fn update(
        &self,
        model: &str,
        where_clause: &[CleanedWhere],
        update: Record,
    ) -> Result<Option<Record>>;

    /// Update every matching record and return how many changed
    async fn update_many(
        &self,
        model: &str,
        where_clause: &[CleanedWhere],
        update: Record,
    ) -> Result<u64>;

    async fn count(&self, model: &str, where_clause: &[CleanedWhere]) -> Result<u64>;

    async fn delete(&self, model: &str, where_clause: &[CleanedWhere]) -> Result<()>;

    async fn delete_many(&self, model: &str, where_clause: &[CleanedWhere]) -> Result<u64>;

    async fn find_one(
        &self,
        model: &str,
        where_clause: &[CleanedWhere],
        select: Option<&[String]>,
    ) -> Result<Option<Record>>;

    async fn find_many(&self, model: &str, query: &FindManyQuery) -> Result<Vec<Record>>;
}

// ============================================================================
// Predicate Evaluation
// ============================================================================

/// Evaluate a where list against one record.
///
/// AND predicates must all hold; when OR predicates are present at least one
/// of them must hold as well.
pub fn matches_where(record: &Record, where_clause: &[CleanedWhere]) -> bool {
    let mut any_or = false;
    let mut or_hit = false;

    for predicate in where_clause {
        let hit = matches_predicate(record, predicate);
        match predicate.connector {
            Connector::And => {
                if !hit {
                    return false;
                }
            }
            Connector::Or => {
                any_or = true;
                or_hit |= hit;
            }
        }
    }

    !any_or || or_hit
}

fn matches_predicate(record: &Record, predicate: &CleanedWhere) -> bool {
    let actual = record.get(&predicate.field).unwrap_or(&Value::Null);
    let expected = &predicate.value;

    match predicate.operator {
        Operator::Eq => values_equal(actual, expected),
        Operator::Ne => !values_equal(actual, expected),
        Operator::Lt => actual.compare(expected) == Some(Ordering::Less),
        Operator::Lte => matches!(
            actual.compare(expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Operator::Gt => actual.compare(expected) == Some(Ordering::Greater),
        Operator::Gte => matches!(
            actual.compare(expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Operator::In => in_list(actual, expected),
        Operator::NotIn => !in_list(actual, expected),
        Operator::Contains => match (actual, expected) {
            (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
            (Value::Array(items), needle) => items.iter().any(|item| values_equal(item, needle)),
            _ => false,
        },
        Operator::StartsWith => match (actual, expected) {
            (Value::String(s), Value::String(prefix)) => s.starts_with(prefix.as_str()),
            _ => false,
        },
        Operator::EndsWith => match (actual, expected) {
            (Value::String(s), Value::String(suffix)) => s.ends_with(suffix.as_str()),
            _ => false,
        },
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    a == b || a.compare(b) == Some(Ordering::Equal)
}

fn in_list(actual: &Value, expected: &Value) -> bool {
    match expected {
        Value::Array(items) => items.iter().any(|item| values_equal(actual, item)),
        single => values_equal(actual, single),
    }
}

fn project(record: &Record, select: Option<&[String]>) -> Record {
    match select {
        Some(columns) if !columns.is_empty() => record
            .iter()
            .filter(|(key, _)| columns.iter().any(|c| c == *key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        _ => record.clone(),
    }
}

fn sort_records(records: &mut [Record], sort_by: &SortBy) {
    records.sort_by(|a, b| {
        let left = a.get(&sort_by.field).unwrap_or(&Value::Null);
        let right = b.get(&sort_by.field).unwrap_or(&Value::Null);
        let ordering = left.compare(right).unwrap_or(Ordering::Equal);
        match sort_by.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

// ============================================================================
// In-Memory Driver
// ============================================================================

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Record>,
    next_id: i64,
}

/// In-memory driver for development and testing.
///
/// Records arriving without an identifier get an auto-increment integer,
/// mirroring a relational store's native sequence. The sequence is written
/// under the physical id column, `id` unless the adapter maps the id
/// elsewhere; see [`InMemoryBackend::with_id_column`].
#[derive(Debug)]
pub struct InMemoryBackend {
    tables: parking_lot::RwLock<HashMap<String, Table>>,
    id_column: String,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self {
            tables: parking_lot::RwLock::default(),
            id_column: ID_FIELD.to_string(),
        }
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Column the auto-increment id is written to, e.g. `_id` when
    /// `map_keys_transform_input` maps `id => _id`
    #[must_use]
    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = column.into();
        self
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// Raw rows of a table exactly as the driver stores them
    pub fn rows(&self, model: &str) -> Vec<Record> {
        self.tables
            .read()
            .get(model)
            .map(|table| table.rows.clone())
            .unwrap_or_default()
    }

    /// Names of tables that have received at least one write
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait::async_trait]
impl BackendDriver for InMemoryBackend {
    async fn create(&self, model: &str, mut data: Record, select: Option<&[String]>) -> Result<Record> {
        let mut tables = self.tables.write();
        let table = tables.entry(model.to_string()).or_default();

        table.next_id += 1;
        if data.get(&self.id_column).map_or(true, Value::is_null) {
            data.insert(self.id_column.clone(), Value::Int(table.next_id));
        }

        table.rows.push(data.clone());
        Ok(project(&data, select))
    }

    async fn update(
        &self,
        model: &str,
        where_clause: &[CleanedWhere],
        update: Record,
    ) -> Result<Option<Record>> {
        let mut tables = self.tables.write();
        let Some(table) = tables.get_mut(model) else {
            return Ok(None);
        };

        let updated = table
            .rows
            .iter_mut()
            .find(|row| matches_where(row, where_clause))
            .map(|row| {
                row.extend(update);
                row.clone()
            });

        Ok(updated)
    }

    async fn update_many(
        &self,
        model: &str,
        where_clause: &[CleanedWhere],
        update: Record,
    ) -> Result<u64> {
        let mut tables = self.tables.write();
        let Some(table) = tables.get_mut(model) else {
            return Ok(0);
        };

        let mut changed = 0;
        for row in table.rows.iter_mut().filter(|row| matches_where(row, where_clause)) {
            row.extend(update.iter().map(|(k, v)| (k.clone(), v.clone())));
            changed += 1;
        }

        Ok(changed)
    }

    async fn count(&self, model: &str, where_clause: &[CleanedWhere]) -> Result<u64> {
        let tables = self.tables.read();
        let count = tables.get(model).map_or(0, |table| {
            table
                .rows
                .iter()
                .filter(|row| matches_where(row, where_clause))
                .count()
        });
        Ok(count as u64)
    }

    async fn delete(&self, model: &str, where_clause: &[CleanedWhere]) -> Result<()> {
        let mut tables = self.tables.write();
        if let Some(table) = tables.get_mut(model) {
            if let Some(index) = table
                .rows
                .iter()
                .position(|row| matches_where(row, where_clause))
            {
                table.rows.remove(index);
            }
        }
        Ok(())
    }

    async fn delete_many(&self, model: &str, where_clause: &[CleanedWhere]) -> Result<u64> {
        let mut tables = self.tables.write();
        let Some(table) = tables.get_mut(model) else {
            return Ok(0);
        };

        let before = table.rows.len();
        table.rows.retain(|row| !matches_where(row, where_clause));
        Ok((before - table.rows.len()) as u64)
    }

    async fn find_one(
        &self,
        model: &str,
        where_clause: &[CleanedWhere],
        select: Option<&[String]>,
    ) -> Result<Option<Record>> {
        let tables = self.tables.read();
        Ok(tables.get(model).and_then(|table| {
            table
                .rows
                .iter()
                .find(|row| matches_where(row, where_clause))
                .map(|row| project(row, select))
        }))
    }

    async fn find_many(&self, model: &str, query: &FindManyQuery) -> Result<Vec<Record>> {
        let tables = self.tables.read();
        let Some(table) = tables.get(model) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<Record> = table
            .rows
            .iter()
            .filter(|row| matches_where(row, &query.where_clause))
            .cloned()
            .collect();

        if let Some(sort_by) = &query.sort_by {
            sort_records(&mut rows, sort_by);
        }

        Ok(rows
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|row| project(&row, query.select.as_deref()))
            .collect())
    }
}
