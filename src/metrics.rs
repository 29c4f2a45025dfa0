// =============================================================================
// METRICS MODULE
// =============================================================================
// This module sets up Prometheus metrics for observability.
//
// LEARNING NOTES:
// - Prometheus uses a "pull" model - it scrapes /metrics endpoint
// - Metrics have types: Counter, Gauge, Histogram, Summary
// - Labels add dimensions to metrics (e.g., endpoint="/api/v1/products")
// - Without an installed recorder (unit tests) every call is a no-op
// =============================================================================

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

// =============================================================================
// METRIC NAMES (Constants)
// =============================================================================

/// HTTP request counter
/// Labels: method, endpoint, status
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";

/// HTTP request duration histogram
/// Labels: method, endpoint
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

/// Row store call duration histogram
/// Labels: operation (list/insert/update), collection, outcome (ok/error)
pub const STORE_OPERATION_DURATION_SECONDS: &str = "store_operation_duration_seconds";

/// Products currently shown in the inventory view
pub const CATALOG_PRODUCTS: &str = "catalog_products";

/// Payment order creation attempts
/// Labels: status (success/failed)
pub const PAYMENT_ORDERS_TOTAL: &str = "payment_orders_total";

/// Total revenue computed by the last dashboard refresh
pub const DASHBOARD_REVENUE: &str = "dashboard_revenue";

// =============================================================================
// SETUP FUNCTION
// =============================================================================
/// Initialize the Prometheus recorder and return the handle used by /metrics
pub fn setup_metrics() -> Result<PrometheusHandle> {
    // 1ms .. 10s, suitable for HTTP and row store latency
    let latency_buckets = &[
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full(STORE_OPERATION_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .install_recorder()?;

    describe_counter!(
        HTTP_REQUESTS_TOTAL,
        "Total number of HTTP requests received"
    );

    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request latency in seconds"
    );

    describe_histogram!(
        STORE_OPERATION_DURATION_SECONDS,
        "Row store call latency in seconds"
    );

    describe_gauge!(
        CATALOG_PRODUCTS,
        "Number of products in the inventory view"
    );

    describe_counter!(
        PAYMENT_ORDERS_TOTAL,
        "Total number of payment order creation attempts"
    );

    describe_gauge!(
        DASHBOARD_REVENUE,
        "Total revenue in major currency units at the last dashboard refresh"
    );

    Ok(handle)
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Record an HTTP request
///
/// # Arguments
/// * `method` - HTTP method (GET, POST, etc.)
/// * `endpoint` - Route pattern (/api/v1/products/:id/status)
/// * `status` - Response status code
/// * `duration_secs` - Request duration in seconds
pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration_secs: f64) {
    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .record(duration_secs);
}

/// Record a row store call duration, failed calls included
pub fn record_store_op(operation: &str, collection: &str, ok: bool, duration_secs: f64) {
    let outcome = if ok { "ok" } else { "error" };
    histogram!(
        STORE_OPERATION_DURATION_SECONDS,
        "operation" => operation.to_string(),
        "collection" => collection.to_string(),
        "outcome" => outcome
    )
    .record(duration_secs);
}

pub fn set_product_count(count: usize) {
    gauge!(CATALOG_PRODUCTS).set(count as f64);
}

/// Record a payment order attempt
pub fn record_payment_order(success: bool) {
    let status = if success { "success" } else { "failed" };
    counter!(PAYMENT_ORDERS_TOTAL, "status" => status.to_string()).increment(1);
}

pub fn set_dashboard_revenue(revenue: f64) {
    gauge!(DASHBOARD_REVENUE).set(revenue);
}
