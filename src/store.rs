// =============================================================================
// ROW STORE MODULE
// =============================================================================
// The row store is the managed backend that holds products and orders. This
// module defines the client contract every backend implements, plus an
// in-memory backend used by tests and by local runs without a database.
//
// LEARNING NOTES:
// - async_trait lets us put `async fn` in a trait used as `dyn RowStore`
// - Rows cross the seam as JSON objects; typed decoding happens above it
// - Every call is a single round trip: no caching, retries or pagination
// =============================================================================

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

/// A single row as returned by the store
pub type Row = Map<String, Value>;

// =============================================================================
// COLLECTIONS
// =============================================================================
/// Named collections (tables) known to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Products,
    Orders,
}

impl Collection {
    pub fn table_name(self) -> &'static str {
        match self {
            Collection::Products => "products",
            Collection::Orders => "orders",
        }
    }

    /// Columns a caller may order by or write to
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Collection::Products => &[
                "id",
                "name",
                "price",
                "category",
                "description",
                "stock_status",
                "images",
                "created_at",
            ],
            Collection::Orders => &["id", "total_amount", "status", "created_at", "user_id"],
        }
    }

    /// Reject column names that are not part of the collection.
    ///
    /// Backends interpolate column names into queries, so this must run
    /// before any query text is built.
    pub fn check_column(self, column: &str) -> Result<(), StoreError> {
        if self.columns().contains(&column) {
            Ok(())
        } else {
            Err(StoreError::UnknownColumn {
                collection: self.table_name(),
                column: column.to_string(),
            })
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table_name())
    }
}

// -----------------------------------------------------------------------------
// ORDER BY
// -----------------------------------------------------------------------------
/// Sort order for `list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub ascending: bool,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: true,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: false,
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected the call or could not be reached
    #[error("{0}")]
    Backend(String),

    #[error("unknown column '{column}' for {collection}")]
    UnknownColumn {
        collection: &'static str,
        column: String,
    },

    #[error("no row with id {id} in {collection}")]
    NotFound { collection: &'static str, id: Uuid },

    /// A caller passed a row the store cannot accept
    #[error("invalid row: {0}")]
    InvalidRow(String),

    /// A returned row did not match the expected shape
    #[error("could not decode row: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// ROW STORE CONTRACT
// =============================================================================
#[async_trait]
pub trait RowStore: Send + Sync + 'static {
    /// Read every row of `collection`, sorted by `order`
    async fn list(&self, collection: Collection, order: &OrderBy) -> StoreResult<Vec<Row>>;

    /// Insert one row and return it as stored (with id and defaults filled in)
    async fn insert(&self, collection: Collection, fields: Row) -> StoreResult<Row>;

    /// Overwrite `fields` on the row with the given id
    async fn update(&self, collection: Collection, id: Uuid, fields: Row) -> StoreResult<()>;

    /// Whether the backend is reachable
    async fn health_check(&self) -> bool {
        true
    }
}

// -----------------------------------------------------------------------------
// TYPED HELPERS
// -----------------------------------------------------------------------------

/// Decode a single row into a typed model
pub fn decode_row<T: DeserializeOwned>(row: Row) -> StoreResult<T> {
    serde_json::from_value(Value::Object(row)).map_err(|e| StoreError::Decode(e.to_string()))
}

/// Decode every row that fits `T`; rows that don't are logged and skipped.
///
/// Used by the read paths, where one malformed row must not hide the rest.
pub fn decode_rows_skipping<T: DeserializeOwned>(collection: Collection, rows: Vec<Row>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.get("id").cloned().unwrap_or(Value::Null);
            match decode_row(row) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(%collection, row_id = %id, error = %e, "Skipping malformed row");
                    None
                }
            }
        })
        .collect()
}

/// Turn a serializable value into the field map of a write
pub fn to_fields<T: serde::Serialize>(value: &T) -> StoreResult<Row> {
    match serde_json::to_value(value).map_err(|e| StoreError::InvalidRow(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidRow(format!(
            "expected an object, got {other}"
        ))),
    }
}

/// Ordering of two JSON values the way a SQL `ORDER BY` would see them.
///
/// Numbers compare numerically, timestamps chronologically, other strings
/// lexically. Nulls sort after every value.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (
                DateTime::<FixedOffset>::parse_from_rfc3339(x),
                DateTime::<FixedOffset>::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

// =============================================================================
// IN-MEMORY BACKEND
// =============================================================================
// Behaves like the Postgres backend from the caller's point of view: inserts
// get an id and a created_at, unknown columns are rejected, updates of a
// missing id fail. It also counts calls and can be told to fail, so views
// can be tested against both outcomes.
#[derive(Default)]
pub struct MemoryRowStore {
    rows: Mutex<HashMap<Collection, Vec<Row>>>,
    fail_with: Mutex<Option<String>>,
    pub list_calls: AtomicU64,
    pub insert_calls: AtomicU64,
    pub update_calls: AtomicU64,
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with `message` (`None` heals the store)
    #[cfg(test)]
    pub async fn set_failure(&self, message: Option<&str>) {
        *self.fail_with.lock().await = message.map(str::to_string);
    }

    /// Put a row in place without going through `insert`
    pub async fn seed(&self, collection: Collection, row: Row) {
        self.rows
            .lock()
            .await
            .entry(collection)
            .or_default()
            .push(row);
    }

    pub async fn rows(&self, collection: Collection) -> Vec<Row> {
        self.rows
            .lock()
            .await
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    async fn check_failure(&self) -> StoreResult<()> {
        match self.fail_with.lock().await.as_ref() {
            Some(message) => Err(StoreError::Backend(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RowStore for MemoryRowStore {
    async fn list(&self, collection: Collection, order: &OrderBy) -> StoreResult<Vec<Row>> {
        self.list_calls.fetch_add(1, AtomicOrdering::Relaxed);
        self.check_failure().await?;
        collection.check_column(&order.field)?;

        let mut rows = self.rows(collection).await;
        rows.sort_by(|a, b| {
            let ord = compare_values(a.get(&order.field), b.get(&order.field));
            if order.ascending {
                ord
            } else {
                ord.reverse()
            }
        });
        Ok(rows)
    }

    async fn insert(&self, collection: Collection, mut fields: Row) -> StoreResult<Row> {
        self.insert_calls.fetch_add(1, AtomicOrdering::Relaxed);
        self.check_failure().await?;
        for column in fields.keys() {
            collection.check_column(column)?;
        }

        fields
            .entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        fields
            .entry("created_at")
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));

        self.seed(collection, fields.clone()).await;
        Ok(fields)
    }

    async fn update(&self, collection: Collection, id: Uuid, fields: Row) -> StoreResult<()> {
        self.update_calls.fetch_add(1, AtomicOrdering::Relaxed);
        self.check_failure().await?;
        if fields.is_empty() {
            return Err(StoreError::InvalidRow("no fields to update".to_string()));
        }
        for column in fields.keys() {
            collection.check_column(column)?;
        }

        let id_value = Value::String(id.to_string());
        let mut rows = self.rows.lock().await;
        let row = rows
            .get_mut(&collection)
            .and_then(|rows| rows.iter_mut().find(|row| row.get("id") == Some(&id_value)))
            .ok_or(StoreError::NotFound {
                collection: collection.table_name(),
                id,
            })?;
        row.extend(fields);
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("test rows must be objects"),
        }
    }

    #[test]
    fn test_check_column_rejects_unknown_names() {
        assert!(Collection::Products.check_column("stock_status").is_ok());
        assert!(matches!(
            Collection::Orders.check_column("price; DROP TABLE orders"),
            Err(StoreError::UnknownColumn { collection: "orders", .. })
        ));
    }

    #[test]
    fn test_compare_values_orders_timestamps_chronologically() {
        // Lexically "…00Z" > "…00.5Z", chronologically it is the other way round
        let whole = json!("2026-10-16T10:00:00Z");
        let fraction = json!("2026-10-16T10:00:00.5Z");
        assert_eq!(compare_values(Some(&whole), Some(&fraction)), Ordering::Less);
        assert_eq!(
            compare_values(Some(&json!(9)), Some(&json!(10))),
            Ordering::Less
        );
        assert_eq!(compare_values(None, Some(&json!(1))), Ordering::Greater);
    }

    #[test]
    fn test_decode_rows_skipping_keeps_good_rows() {
        #[derive(Debug, serde::Deserialize, PartialEq)]
        struct Named {
            name: String,
        }

        let rows = vec![
            row(json!({ "id": 1, "name": "Cap" })),
            row(json!({ "id": 2, "name": null })),
            row(json!({ "id": 3, "name": "Tote" })),
        ];
        let decoded: Vec<Named> = decode_rows_skipping(Collection::Products, rows);
        assert_eq!(
            decoded,
            vec![
                Named { name: "Cap".to_string() },
                Named { name: "Tote".to_string() }
            ]
        );
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_created_at() {
        let store = MemoryRowStore::new();
        let created = store
            .insert(Collection::Products, row(json!({ "name": "Cap" })))
            .await
            .unwrap();

        assert!(created.get("id").and_then(Value::as_str).is_some());
        assert!(created.get("created_at").is_some());
        assert_eq!(store.rows(Collection::Products).await.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_rejects_unknown_columns() {
        let store = MemoryRowStore::new();
        let result = store
            .insert(Collection::Products, row(json!({ "quantity": 3 })))
            .await;
        assert!(matches!(result, Err(StoreError::UnknownColumn { .. })));
        assert!(store.rows(Collection::Products).await.is_empty());
    }

    #[tokio::test]
    async fn test_list_sorts_in_both_directions() {
        let store = MemoryRowStore::new();
        for (id, amount) in [(1, 30), (2, 10), (3, 20)] {
            store
                .seed(Collection::Orders, row(json!({ "id": id, "total_amount": amount })))
                .await;
        }

        let asc = store
            .list(Collection::Orders, &OrderBy::asc("total_amount"))
            .await
            .unwrap();
        let ids: Vec<_> = asc.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(2), json!(3), json!(1)]);

        let desc = store
            .list(Collection::Orders, &OrderBy::desc("total_amount"))
            .await
            .unwrap();
        let ids: Vec<_> = desc.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(3), json!(2)]);
    }

    #[tokio::test]
    async fn test_update_merges_fields_and_reports_missing_rows() {
        let store = MemoryRowStore::new();
        let created = store
            .insert(
                Collection::Products,
                row(json!({ "name": "Cap", "stock_status": "in_stock" })),
            )
            .await
            .unwrap();
        let id: Uuid = created["id"].as_str().unwrap().parse().unwrap();

        store
            .update(
                Collection::Products,
                id,
                row(json!({ "stock_status": "pre_order" })),
            )
            .await
            .unwrap();
        let rows = store.rows(Collection::Products).await;
        assert_eq!(rows[0]["stock_status"], json!("pre_order"));
        assert_eq!(rows[0]["name"], json!("Cap"));

        let missing = store
            .update(
                Collection::Products,
                Uuid::new_v4(),
                row(json!({ "stock_status": "pre_order" })),
            )
            .await;
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_failure_mode_surfaces_backend_message() {
        let store = MemoryRowStore::new();
        store.set_failure(Some("connection reset")).await;

        let err = store
            .list(Collection::Products, &OrderBy::desc("created_at"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "connection reset");

        store.set_failure(None).await;
        assert!(store
            .list(Collection::Products, &OrderBy::desc("created_at"))
            .await
            .is_ok());
    }
}
