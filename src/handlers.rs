// =============================================================================
// HANDLERS MODULE
// =============================================================================
// This module contains all HTTP request handlers (controller layer).
//
// LEARNING NOTES:
// - Handlers are thin: they call a view or service and translate the result
// - Axum "extractors" parse the request (State, Path, Query, Json)
// - Every handler records request count and latency for Prometheus
// =============================================================================

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::chart::{self, ChartLayout, HoverState};
use crate::dashboard::DashboardStats;
use crate::error::{AppError, AppResult};
use crate::inventory::ProductForm;
use crate::metrics;
use crate::models::*;
use crate::AppState;

/// Record metrics for a finished request
fn observe<T>(method: &str, endpoint: &str, start: Instant, ok: StatusCode, result: &AppResult<T>) {
    let status = match result {
        Ok(_) => ok,
        Err(e) => e.status(),
    };
    metrics::record_http_request(method, endpoint, status.as_u16(), start.elapsed().as_secs_f64());
}

// =============================================================================
// HEALTH CHECK ENDPOINTS
// =============================================================================

/// Liveness probe
///
/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "storefront-admin".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness probe - is the row store reachable?
///
/// GET /ready
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReadinessResponse>, StatusCode> {
    let store_healthy = state.store.health_check().await;

    if store_healthy {
        Ok(Json(ReadinessResponse {
            status: "ready".to_string(),
            checks: ReadinessChecks {
                row_store: store_healthy,
            },
        }))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

/// Prometheus metrics endpoint
///
/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}

// =============================================================================
// INVENTORY ENDPOINTS
// =============================================================================

/// List products, newest first
///
/// GET /api/v1/products
///
/// A store failure yields an empty list, not an error.
pub async fn list_products(State(state): State<Arc<AppState>>) -> Json<ProductListResponse> {
    let start = Instant::now();
    let products = state.inventory.load().await;
    metrics::record_http_request(
        "GET",
        "/api/v1/products",
        200,
        start.elapsed().as_secs_f64(),
    );

    Json(ProductListResponse {
        total: products.len(),
        products,
    })
}

/// Create a product from the admin form
///
/// POST /api/v1/products
///
/// # Request Body
/// ```json
/// {
///   "name": "Linen Shirt",
///   "price": "1499",
///   "category": "apparel",
///   "description": "",
///   "front_image": "https://cdn.example.com/front.jpg",
///   "back_image": ""
/// }
/// ```
///
/// # Response
/// - 201 Created: the stored product
/// - 400 Bad Request: validation failed, nothing was inserted
/// - 409 Conflict: another submission is still running
/// - 502 Bad Gateway: the row store rejected the insert
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(form): Json<ProductForm>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let start = Instant::now();

    let result = state.inventory.submit(form).await.map_err(AppError::from);
    observe("POST", "/api/v1/products", start, StatusCode::CREATED, &result);

    Ok((StatusCode::CREATED, Json(result?)))
}

/// Change a product's stock status
///
/// PATCH /api/v1/products/:id/status
///
/// # Request Body
/// ```json
/// { "stock_status": "out_of_stock" }
/// ```
pub async fn update_stock_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<StockStatusRequest>,
) -> AppResult<Json<Value>> {
    let start = Instant::now();

    let result = state
        .inventory
        .set_stock_status(id, request.stock_status)
        .await
        .map_err(AppError::from);
    observe("PATCH", "/api/v1/products/:id/status", start, StatusCode::OK, &result);

    // `product` is null when the row is not in the displayed list
    let product = result?;
    Ok(Json(json!({
        "id": id,
        "stock_status": request.stock_status,
        "product": product,
    })))
}

/// Full product replacement (not supported)
///
/// PUT /api/v1/products/:id
pub async fn replace_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(form): Json<ProductForm>,
) -> AppResult<Json<Product>> {
    let start = Instant::now();

    let result = state.inventory.replace(id, form).await.map_err(AppError::from);
    observe("PUT", "/api/v1/products/:id", start, StatusCode::OK, &result);

    Ok(Json(result?))
}

// =============================================================================
// DASHBOARD ENDPOINTS
// =============================================================================

/// Order statistics and the 7-day revenue series
///
/// GET /api/v1/dashboard
pub async fn dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardStats> {
    let start = Instant::now();
    let stats = state.dashboard.refresh().await;
    metrics::record_http_request(
        "GET",
        "/api/v1/dashboard",
        200,
        start.elapsed().as_secs_f64(),
    );
    Json(stats)
}

/// Query parameters for the chart endpoint
///
/// Pointer events replayed in order: `hover` entered a point, `leave` left
/// one. Leaving the hovered point clears the selection.
///
/// # Example
/// GET /api/v1/dashboard/chart.svg?hover=3
#[derive(Debug, Deserialize)]
pub struct ChartParams {
    /// Index of the point the pointer entered, if any
    pub hover: Option<usize>,

    /// Index of the point the pointer left, if any
    pub leave: Option<usize>,
}

/// Current chart layout with the pointer events applied
async fn chart_with_hover(state: &AppState, params: &ChartParams) -> (ChartLayout, HoverState) {
    state.dashboard.refresh().await;
    let series = state.dashboard.chart_series(state.samples.as_ref()).await;
    let layout = chart::layout(&series);

    let mut hover = HoverState::default();
    if let Some(index) = params.hover {
        hover.enter(&layout, index);
    }
    if let Some(index) = params.leave {
        hover.leave(index);
    }
    (layout, hover)
}

/// Revenue chart geometry as JSON, for clients that draw it themselves
///
/// GET /api/v1/dashboard/chart
pub async fn dashboard_chart_layout(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ChartParams>,
) -> Json<Value> {
    let start = Instant::now();

    let (layout, hover) = chart_with_hover(&state, &params).await;
    let tooltip = hover.tooltip(&layout);

    metrics::record_http_request(
        "GET",
        "/api/v1/dashboard/chart",
        200,
        start.elapsed().as_secs_f64(),
    );
    Json(json!({ "layout": layout, "tooltip": tooltip }))
}

/// Revenue chart as SVG
///
/// GET /api/v1/dashboard/chart.svg
pub async fn dashboard_chart(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ChartParams>,
) -> impl IntoResponse {
    let start = Instant::now();

    let (layout, hover) = chart_with_hover(&state, &params).await;
    let svg = chart::render_svg(&layout, &hover);

    metrics::record_http_request(
        "GET",
        "/api/v1/dashboard/chart.svg",
        200,
        start.elapsed().as_secs_f64(),
    );
    ([(header::CONTENT_TYPE, "image/svg+xml")], svg)
}

// =============================================================================
// PAYMENT ENDPOINTS
// =============================================================================

/// Mint a payment order at the gateway
///
/// POST /api/v1/payments/orders
///
/// # Request Body
/// ```json
/// { "amount": "199.50", "currency": "INR", "receipt": "cart-42" }
/// ```
///
/// # Response
/// - 200 OK: the gateway's order object, unchanged
/// - 400 Bad Request: invalid amount or currency
/// - 502 Bad Gateway: the gateway refused or could not be reached
pub async fn create_payment_order(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PaymentOrderRequest>,
) -> AppResult<Json<Value>> {
    let start = Instant::now();

    let result = state
        .payments
        .create_payment_order(&request)
        .await
        .map_err(AppError::from);
    observe("POST", "/api/v1/payments/orders", start, StatusCode::OK, &result);

    Ok(Json(result?))
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::{CheckoutAttempt, PaymentError, PaymentGateway, PaymentService};
    use crate::sample_data::SeededSampleData;
    use crate::store::{Collection, MemoryRowStore};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use axum::Router;
    use chrono::FixedOffset;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    struct EchoGateway;

    #[async_trait]
    impl PaymentGateway for EchoGateway {
        async fn create_order(&self, attempt: &CheckoutAttempt) -> Result<Value, PaymentError> {
            Ok(json!({
                "id": "order_echo",
                "amount": attempt.order.amount,
                "currency": attempt.order.currency,
                "receipt": attempt.order.receipt,
                "status": "created"
            }))
        }
    }

    fn app() -> (Arc<MemoryRowStore>, Router) {
        let store = Arc::new(MemoryRowStore::new());
        let state = AppState::new(
            store.clone(),
            PaymentService::new(Arc::new(EchoGateway), "INR"),
            Arc::new(SeededSampleData { seed: 1 }),
            FixedOffset::east_opt(0).unwrap(),
            PrometheusBuilder::new().build_recorder().handle(),
        );
        (store, crate::build_router(Arc::new(state)))
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_list_products() {
        let (_store, app) = app();

        let created = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/products",
                json!({ "name": "Canvas Tote", "price": "699" }),
            ))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let created = body_json(created).await;
        assert_eq!(created["category"], json!("apparel"));
        assert_eq!(created["stock_status"], json!("in_stock"));

        let listed = app
            .oneshot(Request::get("/api/v1/products").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(listed.status(), StatusCode::OK);
        let listed = body_json(listed).await;
        assert_eq!(listed["total"], json!(1));
        assert_eq!(listed["products"][0]["name"], json!("Canvas Tote"));
    }

    #[tokio::test]
    async fn test_create_product_with_empty_name_is_bad_request() {
        let (store, app) = app();
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/products",
                json!({ "name": "", "price": "10" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.rows(Collection::Products).await.is_empty());
    }

    #[tokio::test]
    async fn test_stock_status_of_unknown_product_is_not_found() {
        let (_store, app) = app();
        let response = app
            .oneshot(json_request(
                "PATCH",
                &format!("/api/v1/products/{}/status", Uuid::new_v4()),
                json!({ "stock_status": "out_of_stock" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_replace_product_is_not_implemented() {
        let (_store, app) = app();
        let response = app
            .oneshot(json_request(
                "PUT",
                &format!("/api/v1/products/{}", Uuid::new_v4()),
                json!({ "name": "x", "price": "1" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn test_dashboard_and_chart_without_orders() {
        let (_store, app) = app();

        let stats = app
            .clone()
            .oneshot(Request::get("/api/v1/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let stats = body_json(stats).await;
        assert_eq!(stats["total_orders"], json!(0));
        assert_eq!(stats["series"], json!([]));

        let chart = app
            .oneshot(
                Request::get("/api/v1/dashboard/chart.svg?hover=2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(chart.status(), StatusCode::OK);
        assert_eq!(chart.headers()[header::CONTENT_TYPE], "image/svg+xml");
        let bytes = to_bytes(chart.into_body(), usize::MAX).await.unwrap();
        let svg = String::from_utf8(bytes.to_vec()).unwrap();
        // Seven sample points, one of them hovered
        assert_eq!(svg.matches("class=\"hit-target\"").count(), 7);
        assert!(svg.contains("class=\"tooltip\""));
    }

    #[tokio::test]
    async fn test_chart_layout_reports_tooltip_for_hovered_point() {
        let (_store, app) = app();
        let response = app
            .oneshot(
                Request::get("/api/v1/dashboard/chart?hover=6")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["layout"]["points"].as_array().unwrap().len(), 7);
        assert_eq!(body["tooltip"]["label"], body["layout"]["points"][6]["label"]);
        let left_pct = body["tooltip"]["left_pct"].as_f64().unwrap();
        assert!((left_pct - 95.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_chart_leave_clears_only_the_hovered_point() {
        let (_store, app) = app();

        let still_hovered = app
            .clone()
            .oneshot(
                Request::get("/api/v1/dashboard/chart?hover=2&leave=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(still_hovered).await;
        assert_eq!(body["tooltip"]["label"], body["layout"]["points"][2]["label"]);

        let cleared = app
            .oneshot(
                Request::get("/api/v1/dashboard/chart?hover=2&leave=2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(cleared).await;
        assert_eq!(body["tooltip"], Value::Null);
    }

    #[tokio::test]
    async fn test_payment_order_amount_converted_to_minor_units() {
        let (_store, app) = app();
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/payments/orders",
                json!({ "amount": "199.5" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let order = body_json(response).await;
        assert_eq!(order["amount"], json!(19950));
        assert_eq!(order["currency"], json!("INR"));
    }

    #[tokio::test]
    async fn test_negative_payment_amount_is_bad_request() {
        let (_store, app) = app();
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/payments/orders",
                json!({ "amount": "-1" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], json!("INVALID_PAYMENT_REQUEST"));
    }
}
