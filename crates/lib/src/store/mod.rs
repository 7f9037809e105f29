//! The remote data store seam.
//!
//! [`DataStore`] is deliberately untyped: it moves JSON rows. The free functions
//! in this module add the typed layer on top, including the single-or-absent
//! lookup the profile resolution relies on.

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::Result;

mod errors;
pub use errors::StoreError;

mod query;
pub use query::{Direction, Filter, Order, Select};

/// Table-scoped access to the remote database.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Rows matching `query`, in the requested order.
    async fn select(&self, query: &Select) -> Result<Vec<Value>>;

    /// Insert a single row into `table`.
    async fn insert(&self, table: &str, row: Value) -> Result<()>;
}

/// Run `query` and decode every row as `T`.
pub async fn select_rows<T: DeserializeOwned>(
    store: &dyn DataStore,
    query: &Select,
) -> Result<Vec<T>> {
    store
        .select(query)
        .await?
        .into_iter()
        .map(|row| decode(query.table(), row))
        .collect()
}

/// Run `query` expecting zero or one row.
///
/// Zero rows is `Ok(None)`, not an error. More than one row is
/// [`StoreError::MultipleRows`]: the caller asked for a unique record and the
/// data says otherwise.
pub async fn maybe_single<T: DeserializeOwned>(
    store: &dyn DataStore,
    query: &Select,
) -> Result<Option<T>> {
    let mut rows = store.select(query).await?;
    match rows.len() {
        0 => Ok(None),
        1 => decode(query.table(), rows.remove(0)).map(Some),
        count => Err(StoreError::MultipleRows {
            table: query.table().to_string(),
            count,
        }
        .into()),
    }
}

/// Encode `row` and insert it into `table`.
pub async fn insert_row<T: Serialize>(store: &dyn DataStore, table: &str, row: &T) -> Result<()> {
    let value = serde_json::to_value(row).map_err(|e| StoreError::Encode {
        table: table.to_string(),
        reason: e.to_string(),
    })?;
    store.insert(table, value).await
}

fn decode<T: DeserializeOwned>(table: &str, row: Value) -> Result<T> {
    serde_json::from_value(row).map_err(|e| {
        StoreError::Decode {
            table: table.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}
