// =============================================================================
// MODELS MODULE
// =============================================================================
// This module defines the data structures used throughout the service.
//
// LEARNING NOTES:
// - Rust uses structs to define data structures
// - Derive macros automatically implement common traits
// - Serde handles JSON serialization/deserialization
// - Money is a rust_decimal::Decimal, never a float
// =============================================================================

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// =============================================================================
// PRODUCT
// =============================================================================
// A product listed in the storefront catalog.
//
// Products are created by the admin through the inventory view and only ever
// change their stock status afterwards. They are never deleted in-app.
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier assigned by the row store
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Price in major currency units (rupees, dollars, ...)
    pub price: Decimal,

    /// Catalog category
    pub category: Category,

    /// Free-form description, may be empty
    #[serde(default)]
    pub description: String,

    /// Availability state
    pub stock_status: StockStatus,

    /// Front and back product shots
    #[serde(default)]
    pub images: ProductImages,

    /// When the row was created (set by the store, immutable)
    pub created_at: DateTime<Utc>,
}

// -----------------------------------------------------------------------------
// CATEGORY
// -----------------------------------------------------------------------------
/// Fixed set of catalog categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    Apparel,
    Accessories,
    Footwear,
    Home,
    Other,
}

// -----------------------------------------------------------------------------
// STOCK STATUS
// -----------------------------------------------------------------------------
/// Availability state of a product.
///
/// There are no automatic transitions: quantity is not tracked, so the status
/// only changes when an admin picks a new one. Any state may move to any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    #[default]
    InStock,
    OutOfStock,
    PreOrder,
}

// -----------------------------------------------------------------------------
// PRODUCT IMAGES
// -----------------------------------------------------------------------------
/// Optional image URLs, stored as a JSON object with `front` and `back` keys.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProductImages {
    #[serde(default)]
    pub front: Option<String>,
    #[serde(default)]
    pub back: Option<String>,
}

// =============================================================================
// ORDER
// =============================================================================
// An order placed through the storefront checkout.
//
// Orders are read-only here; their lifecycle belongs to the checkout and
// payment flow. The stored amount is read leniently: anything that does not
// parse as a decimal becomes `None` and counts as zero in revenue sums.
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,

    /// Order total in major units, `None` when the stored value is missing
    /// or not a number
    #[serde(default, deserialize_with = "lenient_amount")]
    pub total_amount: Option<Decimal>,

    /// Order status, e.g. "pending", "paid", "shipped"
    pub status: String,

    pub created_at: DateTime<Utc>,

    /// Customer reference, used only for grouping. Opaque: numeric ids are
    /// kept as their decimal text.
    #[serde(default, deserialize_with = "opaque_reference")]
    pub user_id: Option<String>,
}

impl Order {
    /// Amount used for revenue sums (unknown amounts count as zero)
    pub fn amount_or_zero(&self) -> Decimal {
        self.total_amount.unwrap_or(Decimal::ZERO)
    }

    pub fn is_pending(&self) -> bool {
        self.status == "pending"
    }
}

/// Accepts JSON numbers and numeric strings; everything else reads as `None`.
fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw {
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        serde_json::Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    })
}

/// Reads strings and numbers as text; anything else reads as `None`.
fn opaque_reference<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

// =============================================================================
// CHART POINT
// =============================================================================
/// One point of the revenue series. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Short weekday label ("Mon", "Tue", ...)
    pub label: String,

    /// Revenue in major units
    pub value: f64,
}

impl ChartPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

// =============================================================================
// API REQUEST/RESPONSE STRUCTURES
// =============================================================================

// -----------------------------------------------------------------------------
// STOCK STATUS UPDATE REQUEST
// -----------------------------------------------------------------------------
/// Request body for changing a product's availability
///
/// # Example JSON
/// ```json
/// { "stock_status": "out_of_stock" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockStatusRequest {
    pub stock_status: StockStatus,
}

// -----------------------------------------------------------------------------
// PAYMENT ORDER REQUEST
// -----------------------------------------------------------------------------
/// Request body for minting a payment order at the gateway
///
/// # Example JSON
/// ```json
/// { "amount": "199.50", "currency": "INR", "receipt": "cart-42" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOrderRequest {
    /// Amount in major units
    pub amount: Decimal,

    /// ISO currency code, the configured default when omitted
    #[serde(default)]
    pub currency: Option<String>,

    /// Merchant receipt reference, generated when omitted
    #[serde(default)]
    pub receipt: Option<String>,
}

// -----------------------------------------------------------------------------
// PRODUCT LIST RESPONSE
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<Product>,
    pub total: usize,
}

// =============================================================================
// HEALTH CHECK RESPONSES
// =============================================================================

/// Simple health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Detailed readiness check response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

/// Individual dependency health checks
#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub row_store: bool,
}

// =============================================================================
// ERROR RESPONSES
// =============================================================================

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type/code
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Create an error response with details
    pub fn with_details(
        error: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order_json(amount: serde_json::Value) -> serde_json::Value {
        json!({
            "id": "6f1c1c8e-8f43-4a8e-9d6c-0a7c3f1b2d11",
            "total_amount": amount,
            "status": "pending",
            "created_at": "2026-10-12T09:30:00+00:00",
            "user_id": "u-1"
        })
    }

    #[test]
    fn test_order_amount_reads_numbers_and_numeric_strings() {
        let from_number: Order = serde_json::from_value(order_json(json!(199.5))).unwrap();
        assert_eq!(from_number.total_amount, Some(Decimal::new(1995, 1)));

        let from_string: Order = serde_json::from_value(order_json(json!(" 42.10 "))).unwrap();
        assert_eq!(from_string.total_amount, Some(Decimal::new(4210, 2)));
    }

    #[test]
    fn test_order_amount_unparsable_counts_as_zero() {
        let garbage: Order = serde_json::from_value(order_json(json!("abc"))).unwrap();
        assert_eq!(garbage.total_amount, None);
        assert_eq!(garbage.amount_or_zero(), Decimal::ZERO);

        let null: Order = serde_json::from_value(order_json(json!(null))).unwrap();
        assert_eq!(null.amount_or_zero(), Decimal::ZERO);

        let mut missing = order_json(json!(0));
        missing.as_object_mut().unwrap().remove("total_amount");
        let missing: Order = serde_json::from_value(missing).unwrap();
        assert_eq!(missing.total_amount, None);
    }

    #[test]
    fn test_order_user_id_accepts_numbers() {
        let mut raw = order_json(json!(1));
        raw["user_id"] = json!(42);
        let order: Order = serde_json::from_value(raw).unwrap();
        assert_eq!(order.user_id.as_deref(), Some("42"));

        let mut raw = order_json(json!(1));
        raw["user_id"] = json!({ "nested": true });
        let order: Order = serde_json::from_value(raw).unwrap();
        assert_eq!(order.user_id, None);
    }

    #[test]
    fn test_pending_is_case_sensitive() {
        let mut order: Order = serde_json::from_value(order_json(json!(1))).unwrap();
        assert!(order.is_pending());
        order.status = "Pending".to_string();
        assert!(!order.is_pending());
    }

    #[test]
    fn test_enums_use_snake_case() {
        assert_eq!(
            serde_json::to_value(StockStatus::OutOfStock).unwrap(),
            json!("out_of_stock")
        );
        assert_eq!(
            serde_json::from_value::<StockStatus>(json!("pre_order")).unwrap(),
            StockStatus::PreOrder
        );
        assert_eq!(Category::default(), Category::Apparel);
    }

    #[test]
    fn test_product_images_default_to_empty() {
        let product: Product = serde_json::from_value(json!({
            "id": "6f1c1c8e-8f43-4a8e-9d6c-0a7c3f1b2d11",
            "name": "Linen Shirt",
            "price": 1299,
            "category": "apparel",
            "stock_status": "in_stock",
            "created_at": "2026-10-12T09:30:00Z"
        }))
        .unwrap();
        assert_eq!(product.images, ProductImages::default());
        assert_eq!(product.description, "");
        assert_eq!(product.price, Decimal::new(1299, 0));
    }
}
