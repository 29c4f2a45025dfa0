// =============================================================================
// STOREFRONT ADMIN SERVICE - Main Entry Point
// =============================================================================
// Backend of the storefront admin console.
//
// WHAT THIS SERVICE DOES:
// - Lists products, creates new ones and changes their stock status
// - Aggregates orders into dashboard stats and a 7-day revenue chart (SVG)
// - Mints payment orders at the payment gateway for checkout
// - Exposes health, readiness and Prometheus metrics endpoints
// =============================================================================

mod chart;       // Revenue chart layout, hover state and SVG rendering
mod config;      // Configuration loading (config.rs)
mod dashboard;   // Order aggregation for the dashboard
mod db;          // Postgres row store backend
mod error;       // HTTP-facing error type
mod handlers;    // HTTP request handlers
mod inventory;   // Inventory management view
mod metrics;     // Prometheus metrics setup
mod models;      // Data structures
mod payment;     // Payment gateway client
mod sample_data; // Synthetic fallback series for the chart
mod store;       // Row store contract and in-memory backend

use std::sync::Arc;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use chrono::FixedOffset;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::dashboard::DashboardView;
use crate::db::PgRowStore;
use crate::inventory::InventoryView;
use crate::metrics::setup_metrics;
use crate::payment::{PaymentService, RazorpayClient};
use crate::sample_data::{RandomSampleData, SampleDataProvider, SeededSampleData};
use crate::store::{MemoryRowStore, RowStore};

// -----------------------------------------------------------------------------
// APPLICATION STATE
// -----------------------------------------------------------------------------
// Each view owns its own state; nothing here is shared between views except
// the row store client they both read from.
pub struct AppState {
    /// Row store client (Postgres or in-memory)
    pub store: Arc<dyn RowStore>,

    pub inventory: InventoryView,
    pub dashboard: DashboardView,
    pub payments: PaymentService,

    /// Fallback chart data when there are too few orders
    pub samples: Arc<dyn SampleDataProvider>,

    /// Used to render metrics in Prometheus format
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RowStore>,
        payments: PaymentService,
        samples: Arc<dyn SampleDataProvider>,
        shop_offset: FixedOffset,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        Self {
            inventory: InventoryView::new(store.clone()),
            dashboard: DashboardView::new(store.clone(), shop_offset),
            store,
            payments,
            samples,
            metrics_handle,
        }
    }
}

// -----------------------------------------------------------------------------
// ROUTES
// -----------------------------------------------------------------------------
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ----- Health & Readiness Endpoints -----
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        // ----- Inventory -----
        .route(
            "/api/v1/products",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route("/api/v1/products/:id", put(handlers::replace_product))
        .route(
            "/api/v1/products/:id/status",
            patch(handlers::update_stock_status),
        )
        // ----- Dashboard -----
        .route("/api/v1/dashboard", get(handlers::dashboard))
        .route("/api/v1/dashboard/chart", get(handlers::dashboard_chart_layout))
        .route("/api/v1/dashboard/chart.svg", get(handlers::dashboard_chart))
        // ----- Checkout -----
        .route(
            "/api/v1/payments/orders",
            post(handlers::create_payment_order),
        )
        // ----- Middleware Layers -----
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// -----------------------------------------------------------------------------
// MAIN FUNCTION
// -----------------------------------------------------------------------------
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -------------------------------------------------------------------------
    // STEP 1: Load environment variables
    // -------------------------------------------------------------------------
    dotenvy::dotenv().ok();

    // -------------------------------------------------------------------------
    // STEP 2: Initialize logging/tracing
    // -------------------------------------------------------------------------
    // RUST_LOG controls log levels, e.g. RUST_LOG=info,storefront_admin=debug
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,storefront_admin=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting Storefront Admin Service...");

    // -------------------------------------------------------------------------
    // STEP 3: Load configuration
    // -------------------------------------------------------------------------
    let config = Config::from_env()?;
    info!(port = config.port, "Configuration loaded");

    // -------------------------------------------------------------------------
    // STEP 4: Set up Prometheus metrics
    // -------------------------------------------------------------------------
    let metrics_handle = setup_metrics()?;
    info!("Prometheus metrics initialized");

    // -------------------------------------------------------------------------
    // STEP 5: Connect to the row store
    // -------------------------------------------------------------------------
    let store: Arc<dyn RowStore> = match &config.database_url {
        Some(url) => {
            let db = PgRowStore::connect(url).await?;
            info!("Connected to PostgreSQL");

            db.run_migrations().await?;
            info!("Database migrations completed");

            if config.seed_sample_products {
                db.seed_sample_products().await?;
            }
            Arc::new(db)
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory row store");
            Arc::new(MemoryRowStore::new())
        }
    };

    // -------------------------------------------------------------------------
    // STEP 6: Payment gateway client
    // -------------------------------------------------------------------------
    let gateway = RazorpayClient::new(
        config.payment_api_base.as_str(),
        config.payment_key_id.as_str(),
        config.payment_key_secret.as_str(),
        config.payment_timeout,
    )?;
    let payments = PaymentService::new(Arc::new(gateway), config.default_currency.as_str());

    // -------------------------------------------------------------------------
    // STEP 7: Create application state and routes
    // -------------------------------------------------------------------------
    let samples: Arc<dyn SampleDataProvider> = match config.sample_data_seed {
        Some(seed) => Arc::new(SeededSampleData { seed }),
        None => Arc::new(RandomSampleData),
    };
    let state = Arc::new(AppState::new(
        store,
        payments,
        samples,
        config.shop_offset,
        metrics_handle,
    ));
    let app = build_router(state);

    // -------------------------------------------------------------------------
    // STEP 8: Start the HTTP server
    // -------------------------------------------------------------------------
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(address = %addr, "Storefront Admin Service is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
