//! End-to-end API tests over the HTTP surface, with scriptable providers
//! injected through `AppState::with_parts`.

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use paygate_api::{create_router, AppConfig, AppState};
use paygate_core::{
    Currency, HostedCheckout, InMemoryOrderStore, InMemoryProductStore, PaymentError,
    PaymentIntent, PaymentMethod, PaymentProvider, PaymentResult, ProviderEvent,
    ProviderEventKind, ProviderPrice, ProviderProduct, ProviderRegistry, Refund,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Scriptable provider: webhook payloads are JSON of the shape
/// `{"kind": ..., "transaction_id": ..., "order_id": ...}` and any signature
/// other than `sig_valid` fails verification.
struct ScriptedProvider {
    method: PaymentMethod,
    fail_product: bool,
    counter: AtomicUsize,
}

impl ScriptedProvider {
    fn new(method: PaymentMethod) -> Self {
        Self {
            method,
            fail_product: false,
            counter: AtomicUsize::new(0),
        }
    }

    fn failing_products(method: PaymentMethod) -> Self {
        Self {
            method,
            fail_product: true,
            counter: AtomicUsize::new(0),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}_{}_{}", prefix, self.method, n)
    }
}

#[async_trait]
impl PaymentProvider for ScriptedProvider {
    async fn create_payment_intent(
        &self,
        _amount: i64,
        _currency: Currency,
        _metadata: &HashMap<String, String>,
    ) -> PaymentResult<PaymentIntent> {
        let id = self.next_id("pi");
        Ok(PaymentIntent {
            client_secret: Some(format!("{id}_secret")),
            approval_url: None,
            id,
        })
    }

    async fn create_checkout_session(
        &self,
        _amount: i64,
        _currency: Currency,
        _order_id: &str,
    ) -> PaymentResult<HostedCheckout> {
        let id = self.next_id("cs");
        Ok(HostedCheckout {
            url: format!("https://checkout.example/{id}"),
            id,
        })
    }

    async fn create_refund(
        &self,
        _payment_id: &str,
        _amount: Option<i64>,
        _reason: Option<&str>,
    ) -> PaymentResult<Refund> {
        Ok(Refund {
            id: self.next_id("re"),
            status: "succeeded".to_string(),
        })
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> PaymentResult<ProviderEvent> {
        if signature != "sig_valid" {
            return Err(PaymentError::WebhookVerificationFailed(
                "Signature mismatch".to_string(),
            ));
        }
        let raw: Value = serde_json::from_slice(payload)
            .map_err(|e| PaymentError::WebhookParse(e.to_string()))?;
        let kind = match raw.get("kind").and_then(Value::as_str) {
            Some("payment_succeeded") => ProviderEventKind::PaymentSucceeded,
            Some("payment_failed") => ProviderEventKind::PaymentFailed,
            Some("checkout_completed") => ProviderEventKind::CheckoutCompleted,
            other => ProviderEventKind::Unknown(other.unwrap_or("none").to_string()),
        };
        Ok(ProviderEvent {
            event_id: self.next_id("evt"),
            kind,
            transaction_id: raw
                .get("transaction_id")
                .and_then(Value::as_str)
                .map(String::from),
            order_id: raw.get("order_id").and_then(Value::as_str).map(String::from),
            raw,
        })
    }

    async fn create_product(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> PaymentResult<ProviderProduct> {
        if self.fail_product {
            return Err(PaymentError::Provider {
                provider: self.method.to_string(),
                message: "catalog unavailable".to_string(),
            });
        }
        Ok(ProviderProduct {
            id: self.next_id("prod"),
            name: name.to_string(),
            description: description.map(String::from),
        })
    }

    async fn create_price(
        &self,
        product_id: &str,
        amount: i64,
        currency: Currency,
    ) -> PaymentResult<ProviderPrice> {
        Ok(ProviderPrice {
            id: self.next_id("price"),
            product: product_id.to_string(),
            unit_amount: amount,
            currency,
        })
    }

    fn method(&self) -> PaymentMethod {
        self.method
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        base_url: "http://localhost:0".to_string(),
        environment: "test".to_string(),
    }
}

fn server_with(registry: ProviderRegistry) -> TestServer {
    let state = AppState::with_parts(
        registry,
        Arc::new(InMemoryOrderStore::new()),
        Arc::new(InMemoryProductStore::new()),
        test_config(),
    );
    TestServer::new(create_router(state)).unwrap()
}

fn default_server() -> TestServer {
    server_with(
        ProviderRegistry::new()
            .with_provider(Arc::new(ScriptedProvider::new(PaymentMethod::Stripe)))
            .with_provider(Arc::new(ScriptedProvider::new(PaymentMethod::Paypal))),
    )
}

fn stripe_sig() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("stripe-signature"),
        HeaderValue::from_static("sig_valid"),
    )
}

async fn create_order(server: &TestServer, amount: i64) -> Value {
    let response = server
        .post("/api/v1/orders")
        .json(&json!({"amount": amount, "currency": "usd"}))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()
}

async fn order_status(server: &TestServer, order_id: &str) -> String {
    let order = server
        .get(&format!("/api/v1/orders/{order_id}"))
        .await
        .json::<Value>();
    order["status"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let server = default_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "healthy");
}

#[tokio::test]
async fn test_create_order_validation() {
    let server = default_server();

    let order = create_order(&server, 1000).await;
    assert_eq!(order["amount"], 1000);
    assert_eq!(order["status"], "pending");
    assert!(order["id"].as_str().is_some());

    let response = server
        .post("/api/v1/orders")
        .json(&json!({"amount": 0, "currency": "usd"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/v1/orders")
        .json(&json!({"amount": 100, "currency": "doge"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_payment_methods() {
    let server = default_server();
    let response = server.get("/api/v1/payments/methods").await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>(),
        json!({"methods": ["stripe", "paypal"]})
    );
}

/// The full lifecycle over HTTP: order -> intent -> success webhook ->
/// refund; a second refund must be rejected.
#[tokio::test]
async fn test_end_to_end_intent_payment_and_refund() {
    let server = default_server();
    let order = create_order(&server, 1000).await;
    let order_id = order["id"].as_str().unwrap();

    // Begin payment
    let response = server
        .post("/api/v1/payments/create-intent")
        .json(&json!({"order_id": order_id}))
        .await;
    response.assert_status_ok();
    let intent = response.json::<Value>();
    let client_secret = intent["client_secret"].as_str().unwrap();
    assert!(client_secret.ends_with("_secret"));
    let transaction_id = client_secret.trim_end_matches("_secret");

    assert_eq!(order_status(&server, order_id).await, "PAYMENT_INTENT_CREATED");

    // Signed success webhook settles the order
    let (name, value) = stripe_sig();
    let response = server
        .post("/webhook/stripe")
        .add_header(name, value)
        .bytes(
            json!({"kind": "payment_succeeded", "transaction_id": transaction_id})
                .to_string()
                .into(),
        )
        .await;
    response.assert_status_ok();

    assert_eq!(order_status(&server, order_id).await, "PAYMENT_SUCCEEDED");

    // Refund
    let response = server
        .post("/api/v1/payments/request-refund")
        .json(&json!({"order_id": order_id}))
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>()["message"],
        "Refund requested successfully"
    );
    assert_eq!(order_status(&server, order_id).await, "REFUND_REQUESTED");

    // Second refund is rejected with the state error
    let response = server
        .post("/api/v1/payments/request-refund")
        .json(&json!({"order_id": order_id, "reason": "twice"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let error = response.json::<Value>();
    assert!(error["error"]
        .as_str()
        .unwrap()
        .contains("order must be paid"));
}

#[tokio::test]
async fn test_checkout_session_flow_reconciles_ids() {
    let server = default_server();
    let order = create_order(&server, 2500).await;
    let order_id = order["id"].as_str().unwrap();

    let response = server
        .post("/api/v1/payments/create-checkout-session")
        .json(&json!({"order_id": order_id, "payment_method": "paypal"}))
        .await;
    response.assert_status_ok();
    assert!(response.json::<Value>()["url"]
        .as_str()
        .unwrap()
        .starts_with("https://"));
    assert_eq!(
        order_status(&server, order_id).await,
        "CHECKOUT_SESSION_CREATED"
    );

    // Checkout-completed webhook settles and swaps in the real reference
    let response = server
        .post("/webhook/paypal")
        .add_header(
            HeaderName::from_static("paypal-signature"),
            HeaderValue::from_static("sig_valid"),
        )
        .bytes(
            json!({
                "kind": "checkout_completed",
                "order_id": order_id,
                "transaction_id": "CAPTURE-42",
            })
            .to_string()
            .into(),
        )
        .await;
    response.assert_status_ok();

    let order = server
        .get(&format!("/api/v1/orders/{order_id}"))
        .await
        .json::<Value>();
    assert_eq!(order["status"], "PAYMENT_SUCCEEDED");
    assert_eq!(order["transaction_id"], "CAPTURE-42");
}

#[tokio::test]
async fn test_refund_requires_paid_order() {
    let server = default_server();
    let order = create_order(&server, 1000).await;

    let response = server
        .post("/api/v1/payments/request-refund")
        .json(&json!({"order_id": order["id"], "reason": "early"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refund_unknown_order_is_404() {
    let server = default_server();
    let response = server
        .post("/api/v1/payments/request-refund")
        .json(&json!({"order_id": "7d64a1f2-0000-0000-0000-000000000000"}))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_webhook_invalid_signature_rejected() {
    let server = default_server();
    let order = create_order(&server, 1000).await;
    let order_id = order["id"].as_str().unwrap();

    server
        .post("/api/v1/payments/create-intent")
        .json(&json!({"order_id": order_id}))
        .await
        .assert_status_ok();

    let response = server
        .post("/webhook/stripe")
        .add_header(
            HeaderName::from_static("stripe-signature"),
            HeaderValue::from_static("sig_forged"),
        )
        .bytes(
            json!({"kind": "payment_succeeded", "transaction_id": "pi_any"})
                .to_string()
                .into(),
        )
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    // Status unchanged
    assert_eq!(order_status(&server, order_id).await, "PAYMENT_INTENT_CREATED");
}

#[tokio::test]
async fn test_webhook_missing_header_and_unknown_provider() {
    let server = default_server();

    let response = server.post("/webhook/stripe").bytes("{}".into()).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let (name, value) = stripe_sig();
    let response = server
        .post("/webhook/venmo")
        .add_header(name, value)
        .bytes("{}".into())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_replay_is_idempotent_over_http() {
    let server = default_server();
    let order = create_order(&server, 1000).await;
    let order_id = order["id"].as_str().unwrap();

    let response = server
        .post("/api/v1/payments/create-intent")
        .json(&json!({"order_id": order_id}))
        .await;
    let secret = response.json::<Value>()["client_secret"]
        .as_str()
        .unwrap()
        .to_string();
    let transaction_id = secret.trim_end_matches("_secret").to_string();

    let body = json!({"kind": "payment_succeeded", "transaction_id": transaction_id}).to_string();
    for _ in 0..2 {
        let (name, value) = stripe_sig();
        server
            .post("/webhook/stripe")
            .add_header(name, value)
            .bytes(body.clone().into())
            .await
            .assert_status_ok();
    }

    assert_eq!(order_status(&server, order_id).await, "PAYMENT_SUCCEEDED");
}

#[tokio::test]
async fn test_product_sync_partial_failure_breakdown() {
    let server = server_with(
        ProviderRegistry::new()
            .with_provider(Arc::new(ScriptedProvider::new(PaymentMethod::Stripe)))
            .with_provider(Arc::new(ScriptedProvider::failing_products(
                PaymentMethod::Paypal,
            ))),
    );

    let response = server
        .post("/api/v1/products")
        .json(&json!({
            "name": "Widget",
            "description": "A fine widget",
            "price": 2500,
            "currency": "usd"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let product = response.json::<Value>();
    let product_id = product["id"].as_str().unwrap();

    // Partial failure surfaces as 400 with the full breakdown
    let response = server
        .post(&format!("/api/v1/products/{product_id}/sync"))
        .json(&json!({"providers": ["stripe", "paypal"]}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let outcome = response.json::<Value>();
    assert_eq!(outcome["successful_syncs"], json!(["stripe"]));
    assert_eq!(outcome["failed_syncs"][0]["provider"], "paypal");
    assert!(outcome["failed_syncs"][0]["error"]
        .as_str()
        .unwrap()
        .contains("catalog unavailable"));

    // The successful provider's ids were persisted anyway
    let response = server
        .get(&format!("/api/v1/products/{product_id}/sync-status"))
        .await;
    response.assert_status_ok();
    let status = response.json::<Value>();
    assert_eq!(status["synced_providers"], json!(["stripe"]));
    assert_eq!(status["available_providers"], json!(["stripe", "paypal"]));
}

#[tokio::test]
async fn test_product_sync_success() {
    let server = default_server();

    let response = server
        .post("/api/v1/products")
        .json(&json!({"name": "Gadget", "price": 999, "currency": "eur"}))
        .await;
    let product_id = response.json::<Value>()["id"].as_str().unwrap().to_string();

    let response = server
        .post(&format!("/api/v1/products/{product_id}/sync"))
        .json(&json!({"providers": ["stripe", "paypal"]}))
        .await;
    response.assert_status_ok();
    let outcome = response.json::<Value>();
    assert_eq!(outcome["failed_syncs"], json!([]));
    assert_eq!(outcome["successful_syncs"], json!(["stripe", "paypal"]));
    assert!(outcome["product"]["stripe_price_id"].as_str().is_some());
}

#[tokio::test]
async fn test_sync_unknown_product_is_404() {
    let server = default_server();
    let response = server
        .post("/api/v1/products/7d64a1f2-0000-0000-0000-000000000000/sync")
        .json(&json!({"providers": ["stripe"]}))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_product_validation() {
    let server = default_server();
    let response = server
        .post("/api/v1/products")
        .json(&json!({"name": "Freebie", "price": 0, "currency": "usd"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_products() {
    let server = default_server();
    for name in ["One", "Two"] {
        server
            .post("/api/v1/products")
            .json(&json!({"name": name, "price": 100, "currency": "usd"}))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let response = server.get("/api/v1/products").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["count"], 2);
}
