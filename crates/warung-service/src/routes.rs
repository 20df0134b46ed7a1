//! HTTP routing for the storefront surface.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{checkout, health, products, settings, stats, users, webhooks};
use crate::state::AppState;

/// Maximum concurrent requests for the authenticated API surface.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Assemble the full router.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Liveness probe
///
/// ## Store API (service API key auth)
/// - `POST /v1/checkout` - Create a purchase or top-up intent
/// - `GET /v1/transactions/:ref_id` - Transaction status
/// - `POST /v1/transactions/:ref_id/cancel` - Cancel a pending intent
/// - `POST /v1/users` - Ensure a buyer account
/// - `GET /v1/users` - List buyer ids (broadcast fan-out)
/// - `GET /v1/users/:id` - Buyer account detail
/// - `POST /v1/users/:id/balance` - Admin balance adjustment
/// - `GET /v1/users/:id/transactions` - Buyer transaction history
/// - `GET|POST /v1/products`, `GET|PATCH|DELETE /v1/products/:id` - Catalog
/// - `POST /v1/products/:id/stock` - Append content items
/// - `GET|PUT /v1/settings/:key` - Operator toggles
/// - `GET /v1/stats` - Ledger counts
///
/// ## Webhooks (per-event authenticity checks)
/// - `POST /webhooks/qris` - Gateway payment callbacks
pub fn create_router(state: AppState) -> Router {
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let api_routes = Router::new()
        // Checkout and settlement
        .route("/checkout", post(checkout::create_checkout))
        .route("/transactions/:ref_id", get(checkout::transaction_status))
        .route(
            "/transactions/:ref_id/cancel",
            post(checkout::cancel_transaction),
        )
        // Buyers
        .route("/users", get(users::list_users).post(users::ensure_user))
        .route("/users/:id", get(users::get_user))
        .route("/users/:id/balance", post(users::adjust_balance))
        .route("/users/:id/transactions", get(users::list_transactions))
        // Catalog
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route("/products/:id", get(products::get_product))
        .route("/products/:id", patch(products::update_product))
        .route("/products/:id", delete(products::delete_product))
        .route("/products/:id/stock", post(products::append_stock))
        // Operator toggles and the dashboard
        .route("/settings/:key", get(settings::get_setting))
        .route("/settings/:key", put(settings::put_setting))
        .route("/stats", get(stats::get_stats))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // API v1 routes (service API key)
        .nest("/v1", api_routes)
        // Webhooks (authenticity checked per event, always acknowledged)
        .route("/webhooks/qris", post(webhooks::qris_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// A literal `*` in the configured origins opens the surface to any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
