//! # Stripe Provider
//!
//! Implements the paygate provider contract against the Stripe REST API.
//! Stripe already deals in smallest-unit amounts, so no conversion happens
//! here; bodies are form-encoded the way the Stripe API expects.

use crate::config::StripeConfig;
use crate::webhook;
use async_trait::async_trait;
use paygate_core::{
    Currency, HostedCheckout, PaymentError, PaymentIntent, PaymentMethod, PaymentProvider,
    PaymentResult, ProviderEvent, ProviderPrice, ProviderProduct, Refund,
};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, error, info, instrument};

/// Stripe card-payment provider
pub struct StripeProvider {
    config: StripeConfig,
    client: Client,
}

impl StripeProvider {
    pub fn new(config: StripeConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Create from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        let config = StripeConfig::from_env()?;
        Ok(Self::new(config))
    }

    /// POST a form-encoded request and parse the JSON response.
    /// Stripe errors come back as `{"error": {"message": ...}}` and are
    /// surfaced as provider errors with the original message.
    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        form_params: &[(String, String)],
        idempotency_key: Option<&str>,
    ) -> PaymentResult<T> {
        let url = format!("{}{}", self.config.api_base_url, path);

        let mut request = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .form(form_params);

        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(PaymentError::Provider {
                    provider: "stripe".to_string(),
                    message: error_response.error.message,
                });
            }

            return Err(PaymentError::Provider {
                provider: "stripe".to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    #[instrument(skip(self, metadata))]
    async fn create_payment_intent(
        &self,
        amount: i64,
        currency: Currency,
        metadata: &HashMap<String, String>,
    ) -> PaymentResult<PaymentIntent> {
        let mut form_params: Vec<(String, String)> = vec![
            ("amount".to_string(), amount.to_string()),
            ("currency".to_string(), currency.as_str().to_string()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        for (key, value) in metadata {
            form_params.push((format!("metadata[{}]", key), value.clone()));
        }

        // Retries after a timeout must not create a second intent
        let idempotency_key = metadata.get("order_id").map(|s| s.as_str());

        let intent: StripePaymentIntentResponse = self
            .post_form("/v1/payment_intents", &form_params, idempotency_key)
            .await?;

        info!(intent_id = %intent.id, "created Stripe payment intent");

        Ok(PaymentIntent {
            id: intent.id,
            client_secret: intent.client_secret,
            approval_url: None,
        })
    }

    #[instrument(skip(self))]
    async fn create_checkout_session(
        &self,
        amount: i64,
        currency: Currency,
        order_id: &str,
    ) -> PaymentResult<HostedCheckout> {
        let form_params: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), self.config.success_url.clone()),
            ("cancel_url".to_string(), self.config.cancel_url.clone()),
            (
                "payment_method_types[0]".to_string(),
                "card".to_string(),
            ),
            (
                "line_items[0][price_data][currency]".to_string(),
                currency.as_str().to_string(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                amount.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                format!("Order {}", order_id),
            ),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("metadata[order_id]".to_string(), order_id.to_string()),
        ];

        let session: StripeCheckoutSessionResponse = self
            .post_form("/v1/checkout/sessions", &form_params, Some(order_id))
            .await?;

        info!(session_id = %session.id, "created Stripe checkout session");

        Ok(HostedCheckout {
            id: session.id,
            url: session.url,
        })
    }

    #[instrument(skip(self))]
    async fn create_refund(
        &self,
        payment_id: &str,
        amount: Option<i64>,
        reason: Option<&str>,
    ) -> PaymentResult<Refund> {
        let mut form_params: Vec<(String, String)> = vec![(
            "payment_intent".to_string(),
            payment_id.to_string(),
        )];
        if let Some(amount) = amount {
            form_params.push(("amount".to_string(), amount.to_string()));
        }
        // Stripe only accepts its fixed reason vocabulary; free-form caller
        // reasons travel in metadata instead.
        form_params.push(("reason".to_string(), "requested_by_customer".to_string()));
        if let Some(reason) = reason {
            form_params.push(("metadata[reason]".to_string(), reason.to_string()));
        }

        let refund: StripeRefundResponse =
            self.post_form("/v1/refunds", &form_params, None).await?;

        info!(refund_id = %refund.id, status = %refund.status, "created Stripe refund");

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
        let mut form_params: Vec<(String, String)> =
            vec![("name".to_string(), name.to_string())];
        if let Some(description) = description {
            form_params.push(("description".to_string(), description.to_string()));
        }

        let product: StripeProductResponse =
            self.post_form("/v1/products", &form_params, None).await?;

        debug!(product_id = %product.id, "created Stripe product");

        Ok(ProviderProduct {
            id: product.id,
            name: product.name,
            description: product.description,
        })
    }

    #[instrument(skip(self))]
    async fn create_price(
        &self,
        product_id: &str,
        amount: i64,
        currency: Currency,
    ) -> PaymentResult<ProviderPrice> {
        let form_params: Vec<(String, String)> = vec![
            ("product".to_string(), product_id.to_string()),
            ("unit_amount".to_string(), amount.to_string()),
            ("currency".to_string(), currency.as_str().to_string()),
        ];

        let price: StripePriceResponse =
            self.post_form("/v1/prices", &form_params, None).await?;

        debug!(price_id = %price.id, "created Stripe price");

        Ok(ProviderPrice {
            id: price.id,
            product: price.product,
            unit_amount: price.unit_amount,
            currency,
        })
    }

    fn method(&self) -> PaymentMethod {
        PaymentMethod::Stripe
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripePaymentIntentResponse {
    id: String,
    #[serde(default)]
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeCheckoutSessionResponse {
    id: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct StripeRefundResponse {
    id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct StripeProductResponse {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripePriceResponse {
    id: String,
    product: String,
    unit_amount: i64,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}
