// =============================================================================
// INVENTORY MODULE
// =============================================================================
// The inventory management view: the product list the admin sees, the
// "add product" form, and stock status changes.
//
// STATE OWNERSHIP:
// - The view owns its product list and form draft
// - The list changes only through insert-then-prepend and update-then-patch;
//   it is never re-fetched after a write
// - Locks are never held across a store call
// =============================================================================

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::metrics;
use crate::models::{Category, Product, ProductImages, StockStatus};
use crate::store::{
    decode_row, decode_rows_skipping, to_fields, Collection, OrderBy, RowStore, StoreError,
};

// =============================================================================
// ERRORS
// =============================================================================
#[derive(Debug, Error)]
pub enum ViewError {
    /// The form failed client-side validation; nothing was sent
    #[error("{0}")]
    Validation(String),

    #[error("a submission is already in progress")]
    SubmitInProgress,

    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// =============================================================================
// PRODUCT FORM
// =============================================================================
/// Raw "add product" form fields, exactly as typed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductForm {
    pub name: String,
    pub price: String,
    pub category: Category,
    pub description: String,
    pub front_image: String,
    pub back_image: String,
}

impl Default for ProductForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            price: String::new(),
            category: Category::Apparel,
            description: String::new(),
            front_image: String::new(),
            back_image: String::new(),
        }
    }
}

/// A validated form, ready to be inserted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Decimal,
    pub category: Category,
    pub description: String,
    pub stock_status: StockStatus,
    pub images: ProductImages,
}

fn optional_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parse a price strictly: a plain non-negative decimal, nothing else
pub fn parse_price(raw: &str) -> Result<Decimal, ViewError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ViewError::Validation("price is required".to_string()));
    }
    let price = Decimal::from_str(trimmed)
        .map_err(|_| ViewError::Validation(format!("invalid price: {trimmed:?}")))?;
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ViewError::Validation(format!(
            "price must not be negative: {trimmed}"
        )));
    }
    Ok(price)
}

impl ProductForm {
    pub fn validate(&self) -> Result<NewProduct, ViewError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ViewError::Validation("name is required".to_string()));
        }
        let price = parse_price(&self.price)?;

        Ok(NewProduct {
            name: name.to_string(),
            price,
            category: self.category,
            description: self.description.trim().to_string(),
            stock_status: StockStatus::InStock,
            images: ProductImages {
                front: optional_url(&self.front_image),
                back: optional_url(&self.back_image),
            },
        })
    }
}

// =============================================================================
// VIEW STATE
// =============================================================================
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventoryState {
    pub products: Vec<Product>,
    pub form: ProductForm,
    pub loading: bool,
}

/// Clears the submission flag however the submission ends
struct SubmitGuard<'a>(&'a AtomicBool);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// =============================================================================
// INVENTORY VIEW
// =============================================================================
pub struct InventoryView {
    store: Arc<dyn RowStore>,
    state: Mutex<InventoryState>,
    submitting: AtomicBool,
}

impl InventoryView {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self {
            store,
            state: Mutex::new(InventoryState::default()),
            submitting: AtomicBool::new(false),
        }
    }

    pub async fn snapshot(&self) -> InventoryState {
        self.state.lock().await.clone()
    }

    pub async fn products(&self) -> Vec<Product> {
        self.state.lock().await.products.clone()
    }

    // -------------------------------------------------------------------------
    // LOAD
    // -------------------------------------------------------------------------
    /// Replace the list with the store's products, newest first.
    ///
    /// A failed read shows an empty list; it is logged, not returned.
    pub async fn load(&self) -> Vec<Product> {
        self.state.lock().await.loading = true;

        let result = self
            .store
            .list(Collection::Products, &OrderBy::desc("created_at"))
            .await
            .map(|rows| decode_rows_skipping::<Product>(Collection::Products, rows));
        let products = result.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load products, showing empty list");
            Vec::new()
        });
        metrics::set_product_count(products.len());

        let mut state = self.state.lock().await;
        state.products = products.clone();
        state.loading = false;
        products
    }

    // -------------------------------------------------------------------------
    // CREATE
    // -------------------------------------------------------------------------
    /// Validate `form`, insert it, and prepend the created product.
    ///
    /// The typed form is kept as the draft. On success the draft resets to
    /// defaults; on any failure list and draft stay as they were.
    pub async fn submit(&self, form: ProductForm) -> Result<Product, ViewError> {
        if self
            .submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Rejected product submission while another is in flight");
            return Err(ViewError::SubmitInProgress);
        }
        let _guard = SubmitGuard(&self.submitting);

        self.state.lock().await.form = form.clone();
        let new_product = form.validate()?;

        let row = self
            .store
            .insert(Collection::Products, to_fields(&new_product)?)
            .await
            .map_err(|e| {
                warn!(error = %e, name = %new_product.name, "Failed to create product");
                e
            })?;
        let product: Product = decode_row(row)?;

        let mut state = self.state.lock().await;
        state.products.insert(0, product.clone());
        state.form = ProductForm::default();
        metrics::set_product_count(state.products.len());

        info!(product_id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    // -------------------------------------------------------------------------
    // STOCK STATUS
    // -------------------------------------------------------------------------
    /// Persist a new stock status, then patch it into the displayed list.
    ///
    /// Returns the patched product, or `None` when the product is not in the
    /// displayed list (the store was still updated).
    pub async fn set_stock_status(
        &self,
        id: Uuid,
        status: StockStatus,
    ) -> Result<Option<Product>, ViewError> {
        let mut fields = serde_json::Map::new();
        fields.insert("stock_status".to_string(), json!(status));

        self.store
            .update(Collection::Products, id, fields)
            .await
            .map_err(|e| {
                warn!(error = %e, product_id = %id, "Failed to update stock status");
                e
            })?;

        let mut state = self.state.lock().await;
        let patched = state.products.iter_mut().find(|p| p.id == id).map(|p| {
            p.stock_status = status;
            p.clone()
        });

        info!(product_id = %id, stock_status = ?status, "Stock status updated");
        Ok(patched)
    }

    /// Full product replacement; not supported
    pub async fn replace(&self, _id: Uuid, _form: ProductForm) -> Result<Product, ViewError> {
        Err(ViewError::NotImplemented("product replacement"))
    }
}
