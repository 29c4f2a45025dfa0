// =============================================================================
// DATABASE MODULE
// =============================================================================
// Postgres backend of the row store.
//
// LEARNING NOTES:
// - Connection pooling improves performance
// - Rows travel as JSONB: `to_jsonb(t)` on the way out,
//   `jsonb_populate_record` on the way in, so one code path serves
//   every collection
// - Column names are interpolated into SQL, so they are always checked
//   against the collection's whitelist first
// =============================================================================

use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::metrics;
use crate::store::{Collection, OrderBy, Row, RowStore, StoreError, StoreResult};

// -----------------------------------------------------------------------------
// DATABASE WRAPPER
// -----------------------------------------------------------------------------
#[derive(Clone)]
pub struct PgRowStore {
    /// SQLx PostgreSQL connection pool
    pool: PgPool,
}

impl PgRowStore {
    // -------------------------------------------------------------------------
    // CONNECTION
    // -------------------------------------------------------------------------
    /// Create a new database connection pool
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .idle_timeout(std::time::Duration::from_secs(300))
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        Ok(Self { pool })
    }

    // -------------------------------------------------------------------------
    // MIGRATIONS
    // -------------------------------------------------------------------------
    /// Create the `products` and `orders` tables if they don't exist
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name TEXT NOT NULL,
                price NUMERIC(12, 2) NOT NULL DEFAULT 0,
                category TEXT NOT NULL DEFAULT 'apparel',
                description TEXT NOT NULL DEFAULT '',
                stock_status TEXT NOT NULL DEFAULT 'in_stock',
                images JSONB NOT NULL DEFAULT '{}'::jsonb,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                CONSTRAINT non_negative_price CHECK (price >= 0),
                CONSTRAINT known_category CHECK (
                    category IN ('apparel', 'accessories', 'footwear', 'home', 'other')
                ),
                CONSTRAINT known_stock_status CHECK (
                    stock_status IN ('in_stock', 'out_of_stock', 'pre_order')
                )
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create products table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                total_amount NUMERIC(12, 2),
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                user_id TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create orders table")?;

        // The dashboard reads orders newest first, the inventory reads
        // products newest first
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_created_at ON orders(created_at)")
            .execute(&self.pool)
            .await
            .context("Failed to create orders created_at index")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_created_at ON products(created_at)")
            .execute(&self.pool)
            .await
            .context("Failed to create products created_at index")?;

        Ok(())
    }

    /// Seed a few catalog entries when the products table is empty
    pub async fn seed_sample_products(&self) -> Result<()> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        if count.0 > 0 {
            return Ok(());
        }

        let sample_products = vec![
            ("Oversized Linen Shirt", "1499.00", "apparel", "in_stock"),
            ("Canvas Tote Bag", "699.00", "accessories", "in_stock"),
            ("Leather Chelsea Boots", "5499.00", "footwear", "pre_order"),
            ("Stoneware Mug Set", "899.00", "home", "out_of_stock"),
        ];

        for (name, price, category, stock_status) in sample_products {
            sqlx::query(
                r#"
                INSERT INTO products (name, price, category, stock_status)
                VALUES ($1, $2::numeric, $3, $4)
                "#,
            )
            .bind(name)
            .bind(price)
            .bind(category)
            .bind(stock_status)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }
}

// -----------------------------------------------------------------------------
// QUERY TEXT
// -----------------------------------------------------------------------------
// Built only from whitelisted table and column names.

fn list_sql(collection: Collection, order: &OrderBy) -> StoreResult<String> {
    collection.check_column(&order.field)?;
    let direction = if order.ascending { "ASC" } else { "DESC" };
    Ok(format!(
        "SELECT to_jsonb(t) FROM {table} t ORDER BY t.{field} {direction}",
        table = collection.table_name(),
        field = order.field,
    ))
}

fn checked_columns<'a>(collection: Collection, fields: &'a Row) -> StoreResult<Vec<&'a str>> {
    fields
        .keys()
        .map(|column| collection.check_column(column).map(|_| column.as_str()))
        .collect()
}

fn insert_sql(collection: Collection, fields: &Row) -> StoreResult<String> {
    let table = collection.table_name();
    let columns = checked_columns(collection, fields)?;
    if columns.is_empty() {
        return Ok(format!(
            "INSERT INTO {table} AS t DEFAULT VALUES RETURNING to_jsonb(t)"
        ));
    }
    let list = columns.join(", ");
    Ok(format!(
        "INSERT INTO {table} AS t ({list}) \
         SELECT {list} FROM jsonb_populate_record(NULL::{table}, $1) \
         RETURNING to_jsonb(t)"
    ))
}

fn update_sql(collection: Collection, fields: &Row) -> StoreResult<String> {
    let table = collection.table_name();
    let columns = checked_columns(collection, fields)?;
    if columns.is_empty() {
        return Err(StoreError::InvalidRow("no fields to update".to_string()));
    }
    let assignments = columns
        .iter()
        .map(|column| format!("{column} = r.{column}"))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!(
        "UPDATE {table} AS t SET {assignments} \
         FROM jsonb_populate_record(NULL::{table}, $1) AS r \
         WHERE t.id = $2"
    ))
}

/// Record the call's latency whatever its outcome, then convert the error
fn observed<T>(
    operation: &str,
    collection: Collection,
    start: Instant,
    result: Result<T, sqlx::Error>,
) -> StoreResult<T> {
    metrics::record_store_op(
        operation,
        collection.table_name(),
        result.is_ok(),
        start.elapsed().as_secs_f64(),
    );
    Ok(result?)
}

fn into_row(value: Value) -> StoreResult<Row> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Decode(format!(
            "expected a JSON object row, got {other}"
        ))),
    }
}

// =============================================================================
// ROW STORE IMPLEMENTATION
// =============================================================================
#[async_trait]
impl RowStore for PgRowStore {
    async fn list(&self, collection: Collection, order: &OrderBy) -> StoreResult<Vec<Row>> {
        let start = Instant::now();
        let sql = list_sql(collection, order)?;

        let result = sqlx::query_as::<_, (Value,)>(&sql)
            .fetch_all(&self.pool)
            .await;

        observed("list", collection, start, result)?
            .into_iter()
            .map(|(row,)| into_row(row))
            .collect()
    }

    async fn insert(&self, collection: Collection, fields: Row) -> StoreResult<Row> {
        let start = Instant::now();
        let sql = insert_sql(collection, &fields)?;

        let result = sqlx::query_as::<_, (Value,)>(&sql)
            .bind(Value::Object(fields))
            .fetch_one(&self.pool)
            .await;

        let (row,) = observed("insert", collection, start, result)?;
        into_row(row)
    }

    async fn update(&self, collection: Collection, id: Uuid, fields: Row) -> StoreResult<()> {
        let start = Instant::now();
        let sql = update_sql(collection, &fields)?;

        let result = sqlx::query(&sql)
            .bind(Value::Object(fields))
            .bind(id)
            .execute(&self.pool)
            .await;

        if observed("update", collection, start, result)?.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection: collection.table_name(),
                id,
            });
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}
