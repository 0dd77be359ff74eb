//! # Routes
//!
//! Axum router configuration for the paygate API.
//!
//! Webhook routes live outside `/api/v1` and receive the raw request body;
//! the HTTP layer must never parse (and re-serialize) a webhook payload
//! before signature verification.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Orders:
///   - POST /api/v1/orders - Create order
///   - GET  /api/v1/orders/{id} - Get order
///
/// - Payments:
///   - POST /api/v1/payments/create-intent - Begin a pull-model payment
///   - POST /api/v1/payments/create-checkout-session - Begin hosted checkout
///   - POST /api/v1/payments/request-refund - Refund a paid order
///   - GET  /api/v1/payments/methods - List wired providers
///   - GET  /api/v1/payments/success / /cancel - Redirect landings
///
/// - Products:
///   - POST /api/v1/products - Create product
///   - GET  /api/v1/products - List products
///   - GET  /api/v1/products/{id} - Get product
///   - POST /api/v1/products/{id}/sync - Mirror into providers
///   - GET  /api/v1/products/{id}/sync-status - Sync report
///
/// - Webhooks:
///   - POST /webhook/{provider} - Signed provider notifications (raw body)
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let order_routes = Router::new()
        .route("/", post(handlers::create_order))
        .route("/{order_id}", get(handlers::get_order));

    let payment_routes = Router::new()
        .route("/create-intent", post(handlers::create_payment_intent))
        .route(
            "/create-checkout-session",
            post(handlers::create_checkout_session),
        )
        .route("/request-refund", post(handlers::request_refund))
        .route("/methods", get(handlers::payment_methods))
        .route("/success", get(handlers::payment_success))
        .route("/cancel", get(handlers::payment_cancel));

    let product_routes = Router::new()
        .route(
            "/",
            post(handlers::create_product).get(handlers::list_products),
        )
        .route("/{product_id}", get(handlers::get_product))
        .route("/{product_id}/sync", post(handlers::sync_product))
        .route("/{product_id}/sync-status", get(handlers::sync_status));

    let api_routes = Router::new()
        .nest("/orders", order_routes)
        .nest("/payments", payment_routes)
        .nest("/products", product_routes);

    // Webhook routes (no CORS needed, must accept raw body)
    let webhook_routes = Router::new().route("/{provider}", post(handlers::handle_webhook));

    Router::new()
        // Health check at root
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        // API v1
        .nest("/api/v1", api_routes)
        // Webhooks
        .nest("/webhook", webhook_routes)
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}
