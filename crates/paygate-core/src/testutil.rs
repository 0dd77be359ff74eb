//! Test doubles shared by the in-crate unit tests.

use crate::error::{PaymentError, PaymentResult};
use crate::money::Currency;
use crate::provider::{
    HostedCheckout, PaymentIntent, PaymentMethod, PaymentProvider, ProviderEvent,
    ProviderEventKind, ProviderPrice, ProviderProduct, Refund,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A scriptable in-memory provider. Webhook payloads are JSON of the shape
/// `{"kind": "...", "transaction_id": "...", "order_id": "..."}` and any
/// signature other than `"sig_valid"` fails verification.
pub struct MockProvider {
    method: PaymentMethod,
    pub fail_intent: bool,
    pub fail_checkout: bool,
    pub fail_refund: bool,
    pub fail_product: bool,
    pub fail_price: bool,
    counter: AtomicUsize,
    pub refund_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(method: PaymentMethod) -> Self {
        Self {
            method,
            fail_intent: false,
            fail_checkout: false,
            fail_refund: false,
            fail_product: false,
            fail_price: false,
            counter: AtomicUsize::new(0),
            refund_calls: AtomicUsize::new(0),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}_{}_{}", prefix, self.method, n)
    }

    fn provider_error(&self, message: &str) -> PaymentError {
        PaymentError::Provider {
            provider: self.method.to_string(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl PaymentProvider for MockProvider {
    async fn create_payment_intent(
        &self,
        _amount: i64,
        _currency: Currency,
        _metadata: &HashMap<String, String>,
    ) -> PaymentResult<PaymentIntent> {
        if self.fail_intent {
            return Err(self.provider_error("intent rejected"));
        }
        let id = self.next_id("mock_pi");
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
        if self.fail_checkout {
            return Err(self.provider_error("checkout rejected"));
        }
        let id = self.next_id("mock_cs");
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
        self.refund_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_refund {
            return Err(self.provider_error("refund rejected"));
        }
        Ok(Refund {
            id: self.next_id("mock_re"),
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
        let raw: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| PaymentError::WebhookParse(e.to_string()))?;
        let kind = match raw.get("kind").and_then(|v| v.as_str()) {
            Some("payment_succeeded") => ProviderEventKind::PaymentSucceeded,
            Some("payment_failed") => ProviderEventKind::PaymentFailed,
            Some("checkout_completed") => ProviderEventKind::CheckoutCompleted,
            Some(other) => ProviderEventKind::Unknown(other.to_string()),
            None => ProviderEventKind::Unknown("missing".to_string()),
        };
        Ok(ProviderEvent {
            event_id: self.next_id("mock_evt"),
            kind,
            transaction_id: raw
                .get("transaction_id")
                .and_then(|v| v.as_str())
                .map(String::from),
            order_id: raw
                .get("order_id")
                .and_then(|v| v.as_str())
                .map(String::from),
            raw,
        })
    }

    async fn create_product(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> PaymentResult<ProviderProduct> {
        if self.fail_product {
            return Err(self.provider_error("product rejected"));
        }
        Ok(ProviderProduct {
            id: self.next_id("mock_prod"),
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
        if self.fail_price {
            return Err(self.provider_error("price rejected"));
        }
        Ok(ProviderPrice {
            id: self.next_id("mock_price"),
            product: product_id.to_string(),
            unit_amount: amount,
            currency,
        })
    }

    fn method(&self) -> PaymentMethod {
        self.method
    }
}
