//! # Request Handlers
//!
//! Axum request handlers for the paygate API: orders, payments, webhooks
//! and product catalog sync.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use paygate_core::{
    Currency, Order, OrderStore, PaymentError, PaymentMethod, Product, ProductStore,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{error, info, instrument};
use uuid::Uuid;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Create order request
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Amount in smallest currency unit, must be positive
    pub amount: i64,
    /// ISO 4217 currency code
    pub currency: String,
}

/// Create payment intent request
#[derive(Debug, Deserialize)]
pub struct CreatePaymentIntentRequest {
    pub order_id: Uuid,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

/// Create checkout session request
#[derive(Debug, Deserialize)]
pub struct CreateCheckoutSessionRequest {
    pub order_id: Uuid,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

/// Request refund request
#[derive(Debug, Deserialize)]
pub struct RequestRefundRequest {
    pub order_id: Uuid,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Create payment intent response
#[derive(Debug, Serialize)]
pub struct CreatePaymentIntentResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_url: Option<String>,
}

/// Create checkout session response
#[derive(Debug, Serialize)]
pub struct CreateCheckoutSessionResponse {
    pub url: String,
}

/// Create product request
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Price in smallest currency unit, must be positive
    pub price: i64,
    /// ISO 4217 currency code
    pub currency: String,
}

/// Sync-to-providers request
#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub providers: Vec<PaymentMethod>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn payment_error_to_response(err: PaymentError) -> HandlerError {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

fn bad_request(message: impl Into<String>) -> HandlerError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(message, 400)),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "paygate",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Create an order in `pending` status. No provider is contacted yet.
#[instrument(skip(state, request))]
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), HandlerError> {
    if request.amount <= 0 {
        return Err(bad_request("amount must be positive"));
    }
    let currency =
        Currency::from_str(&request.currency).map_err(payment_error_to_response)?;

    let order = state
        .orders
        .insert(Order::new(request.amount, currency))
        .await
        .map_err(payment_error_to_response)?;

    info!(order_id = %order.id, amount = order.amount, "order created");

    Ok((StatusCode::CREATED, Json(order)))
}

/// Fetch a single order
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, HandlerError> {
    let order = state
        .orders
        .get(order_id)
        .await
        .map_err(payment_error_to_response)?
        .ok_or_else(|| {
            payment_error_to_response(PaymentError::OrderNotFound {
                order_id: order_id.to_string(),
            })
        })?;

    Ok(Json(order))
}

/// Begin a pull-model payment for an order
#[instrument(skip(state, request), fields(order_id = %request.order_id))]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentIntentRequest>,
) -> Result<Json<CreatePaymentIntentResponse>, HandlerError> {
    let intent = state
        .orchestrator
        .create_payment_intent(request.order_id, request.payment_method)
        .await
        .map_err(|e| {
            error!("Failed to create payment intent: {}", e);
            payment_error_to_response(e)
        })?;

    Ok(Json(CreatePaymentIntentResponse {
        client_secret: intent.client_secret,
        approval_url: intent.approval_url,
    }))
}

/// Begin a hosted-checkout flow for an order
#[instrument(skip(state, request), fields(order_id = %request.order_id))]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Json(request): Json<CreateCheckoutSessionRequest>,
) -> Result<Json<CreateCheckoutSessionResponse>, HandlerError> {
    let session = state
        .orchestrator
        .create_checkout_session(request.order_id, request.payment_method)
        .await
        .map_err(|e| {
            error!("Failed to create checkout session: {}", e);
            payment_error_to_response(e)
        })?;

    Ok(Json(CreateCheckoutSessionResponse { url: session.url }))
}

/// Request a full refund of a paid order
#[instrument(skip(state, request), fields(order_id = %request.order_id))]
pub async fn request_refund(
    State(state): State<AppState>,
    Json(request): Json<RequestRefundRequest>,
) -> Result<Json<serde_json::Value>, HandlerError> {
    state
        .orchestrator
        .request_refund(request.order_id, request.reason.as_deref())
        .await
        .map_err(|e| {
            error!("Refund request failed: {}", e);
            payment_error_to_response(e)
        })?;

    Ok(Json(serde_json::json!({
        "message": "Refund requested successfully"
    })))
}

/// List the payment methods the registry has wired
pub async fn payment_methods(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "methods": state.orchestrator.available_methods()
    }))
}

/// Provider redirect landing after a successful payment
pub async fn payment_success(
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let session_id = params.get("session_id").cloned();
    Json(serde_json::json!({
        "message": "Payment successful",
        "session_id": session_id
    }))
}

/// Provider redirect landing after a cancelled payment
pub async fn payment_cancel() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Payment cancelled" }))
}

/// Handle a provider webhook delivery.
///
/// The body must be the exact bytes received (signature verification is
/// byte-exact), so this handler takes `Bytes` and never a parsed JSON
/// extractor. A verification failure returns non-2xx so the provider
/// redelivers.
#[instrument(skip(state, headers, body), fields(provider = %provider))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, HandlerError> {
    let method = PaymentMethod::from_str(&provider).map_err(payment_error_to_response)?;

    let header_name = match method {
        PaymentMethod::Stripe => "stripe-signature",
        PaymentMethod::Paypal => "paypal-signature",
    };
    let signature = headers
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| bad_request(format!("Missing {} header", header_name)))?;

    state
        .orchestrator
        .handle_webhook(&body, signature, Some(method))
        .await
        .map_err(|e| {
            error!("Webhook handling failed: {}", e);
            payment_error_to_response(e)
        })?;

    Ok(StatusCode::OK)
}

/// Create a product locally. Providers are only contacted by an explicit
/// sync.
#[instrument(skip(state, request))]
pub async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), HandlerError> {
    if request.price <= 0 {
        return Err(bad_request("price must be positive"));
    }
    let currency =
        Currency::from_str(&request.currency).map_err(payment_error_to_response)?;

    let mut product = Product::new(request.name, request.price, currency);
    product.description = request.description;

    let product = state
        .products
        .insert(product)
        .await
        .map_err(payment_error_to_response)?;

    info!(product_id = %product.id, "product created");

    Ok((StatusCode::CREATED, Json(product)))
}

/// List all products
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, HandlerError> {
    let products = state
        .products
        .list()
        .await
        .map_err(payment_error_to_response)?;

    Ok(Json(serde_json::json!({
        "count": products.len(),
        "products": products
    })))
}

/// Get single product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Product>, HandlerError> {
    let product = state
        .products
        .get(product_id)
        .await
        .map_err(payment_error_to_response)?
        .ok_or_else(|| {
            payment_error_to_response(PaymentError::ProductNotFound {
                product_id: product_id.to_string(),
            })
        })?;

    Ok(Json(product))
}

/// Mirror a product into the requested providers. Any per-provider failure
/// turns the response into a 400 carrying the full breakdown; successes in
/// the same run are still persisted.
#[instrument(skip(state, request), fields(product_id = %product_id))]
pub async fn sync_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(request): Json<SyncRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    if request.providers.is_empty() {
        return Err(bad_request("providers must not be empty"));
    }

    let outcome = state
        .sync
        .sync_to_providers(product_id, &request.providers)
        .await
        .map_err(payment_error_to_response)?;

    let status = if outcome.all_succeeded() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };

    Ok((status, Json(outcome)))
}

/// Report which providers a product is synced to
pub async fn sync_status(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let status = state
        .sync
        .sync_status(product_id)
        .await
        .map_err(payment_error_to_response)?;

    Ok(Json(status))
}
