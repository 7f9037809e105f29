//! In-memory data store.

use std::{
    cmp::Ordering as CmpOrdering,
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex, RwLock,
        atomic::{AtomicI64, Ordering},
    },
};

use async_trait::async_trait;
use serde_json::Value;
use tracing::trace;

use crate::{
    Clock, Result, SystemClock,
    content::Timestamp,
    store::{DataStore, Direction, Select, StoreError},
};

/// Most recent selects kept in the query log.
const QUERY_LOG_LIMIT: usize = 256;

/// Tables of JSON rows with equality filtering, ordering and limits.
///
/// Inserted rows get an integer `id` and a `created_at` stamp when they do not
/// carry their own, the way the hosted database's column defaults would.
/// The most recent selects are recorded so tests can assert on exactly what
/// was asked.
#[derive(Debug)]
pub struct InMemoryStore {
    pub(crate) tables: RwLock<HashMap<String, Vec<Value>>>,
    pub(crate) next_id: AtomicI64,
    clock: Arc<dyn Clock>,
    queries: Mutex<Vec<Select>>,
    unavailable: RwLock<HashSet<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            clock,
            queries: Mutex::new(Vec::new()),
            unavailable: RwLock::new(HashSet::new()),
        }
    }

    /// Insert a row exactly as given, without defaults.
    pub fn seed(&self, table: &str, row: Value) {
        self.tables
            .write()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    /// Merge `patch` into every row of `table` whose `column` equals `value`.
    ///
    /// Returns the number of rows changed.
    pub fn update(&self, table: &str, column: &str, value: &str, patch: &Value) -> usize {
        let Some(patch) = patch.as_object() else {
            return 0;
        };
        let mut tables = self.tables.write().unwrap();
        let Some(rows) = tables.get_mut(table) else {
            return 0;
        };
        let mut changed = 0;
        for row in rows.iter_mut() {
            if column_text(row, column).as_deref() != Some(value) {
                continue;
            }
            if let Some(row) = row.as_object_mut() {
                row.extend(patch.clone());
                changed += 1;
            }
        }
        changed
    }

    /// Every row of `table`, in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .read()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Recent selects, oldest first. Only the last [`QUERY_LOG_LIMIT`] are kept.
    pub fn queries(&self) -> Vec<Select> {
        self.queries.lock().unwrap().clone()
    }

    /// Selects run so far against `table`.
    pub fn queries_for(&self, table: &str) -> Vec<Select> {
        self.queries()
            .into_iter()
            .filter(|query| query.table() == table)
            .collect()
    }

    /// Make every request against `table` fail until cleared.
    pub fn set_unavailable(&self, table: &str, unavailable: bool) {
        let mut tables = self.unavailable.write().unwrap();
        if unavailable {
            tables.insert(table.to_string());
        } else {
            tables.remove(table);
        }
    }

    fn check_available(&self, table: &str) -> Result<()> {
        if self.unavailable.read().unwrap().contains(table) {
            return Err(StoreError::Api {
                table: table.to_string(),
                status: 503,
                code: None,
                message: "service unavailable".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn run(&self, query: &Select) -> Vec<Value> {
        let tables = self.tables.read().unwrap();
        let mut rows: Vec<Value> = tables
            .get(query.table())
            .map(|rows| {
                rows.iter()
                    .filter(|row| {
                        query
                            .filters()
                            .iter()
                            .all(|filter| column_text(row, &filter.column).as_deref() == Some(filter.value.as_str()))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = query.ordering() {
            rows.sort_by(|a, b| {
                let ordering = compare(a.get(&order.column), b.get(&order.column));
                match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = query.row_limit() {
            rows.truncate(limit);
        }
        rows
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataStore for InMemoryStore {
    async fn select(&self, query: &Select) -> Result<Vec<Value>> {
        {
            let mut queries = self.queries.lock().unwrap();
            if queries.len() == QUERY_LOG_LIMIT {
                queries.remove(0);
            }
            queries.push(query.clone());
        }
        self.check_available(query.table())?;
        let rows = self.run(query);
        trace!(%query, rows = rows.len(), "in-memory select");
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<()> {
        self.check_available(table)?;
        let Value::Object(mut row) = row else {
            return Err(StoreError::Encode {
                table: table.to_string(),
                reason: "row must be a JSON object".to_string(),
            }
            .into());
        };
        row.entry("id")
            .or_insert_with(|| self.next_id.fetch_add(1, Ordering::SeqCst).into());
        row.entry("created_at").or_insert_with(|| {
            let now = chrono::DateTime::from_timestamp_millis(self.clock.now_millis() as i64)
                .unwrap_or_default();
            Value::String(now.to_rfc3339())
        });
        trace!(table, "in-memory insert");
        self.seed(table, Value::Object(row));
        Ok(())
    }
}

/// A column's value as it would appear in an `eq.` filter.
fn column_text(row: &Value, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Ascending order as the hosted database sorts it: nulls after every value,
/// numbers numerically, timestamps chronologically, other strings lexically.
fn compare(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => {
            match (Timestamp::parse(a), Timestamp::parse(b)) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => a.cmp(b),
            }
        }
        (None | Some(Value::Null), None | Some(Value::Null)) => CmpOrdering::Equal,
        (None | Some(Value::Null), _) => CmpOrdering::Greater,
        (_, None | Some(Value::Null)) => CmpOrdering::Less,
        _ => CmpOrdering::Equal,
    }
}
