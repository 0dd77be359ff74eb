//! # Payment Provider Contract
//!
//! One trait, multiple backends. Each provider (Stripe, PayPal, ...)
//! implements [`PaymentProvider`], and the orchestrator and catalog sync stay
//! provider-agnostic behind it. The [`ProviderRegistry`] maps a requested
//! [`PaymentMethod`] to a pre-built, shared provider instance.
//!
//! Every amount crossing this boundary is an integer in the smallest
//! currency unit; providers that speak major units convert internally.

use crate::error::{PaymentError, PaymentResult};
use crate::money::Currency;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

/// Supported payment backends.
///
/// Adding a backend means registering a new implementation here and in the
/// registry; orders and products carry nullable columns per known backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Stripe,
    Paypal,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Stripe => "stripe",
            PaymentMethod::Paypal => "paypal",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stripe" => Ok(PaymentMethod::Stripe),
            "paypal" => Ok(PaymentMethod::Paypal),
            other => Err(PaymentError::UnsupportedProvider {
                method: other.to_string(),
            }),
        }
    }
}

/// Result of beginning a payment.
///
/// Pull-model providers return a `client_secret` the client completes the
/// payment with; redirect-model providers return an `approval_url` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Provider-assigned transaction id
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_url: Option<String>,
}

/// A provider-hosted checkout flow: redirect the customer to `url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostedCheckout {
    pub id: String,
    pub url: String,
}

/// Outcome of a refund request against a captured payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    pub status: String,
}

/// A product mirrored into a provider's catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderProduct {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A price attached to a mirrored product.
///
/// Providers without detached price objects synthesize a stable placeholder
/// id so callers can treat the contract uniformly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderPrice {
    pub id: String,
    pub product: String,
    pub unit_amount: i64,
    pub currency: Currency,
}

/// Discriminator for verified webhook events, already mapped out of each
/// provider's native event taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEventKind {
    /// A payment attempt settled successfully
    PaymentSucceeded,
    /// A payment attempt failed
    PaymentFailed,
    /// A hosted checkout completed; carries the local order id and the true
    /// underlying payment reference for reconciliation
    CheckoutCompleted,
    /// Anything the state machine does not care about
    Unknown(String),
}

/// A verified, parsed webhook notification
#[derive(Debug, Clone)]
pub struct ProviderEvent {
    /// Event id from the provider
    pub event_id: String,
    pub kind: ProviderEventKind,
    /// Provider-side payment reference the event is about. For
    /// `CheckoutCompleted` this is the *true* payment reference, which may
    /// differ from the session id stored at initiation.
    pub transaction_id: Option<String>,
    /// Local order id recovered from provider metadata, when present
    pub order_id: Option<String>,
    /// Raw event payload, kept for audit logging
    pub raw: serde_json::Value,
}

/// Capability contract every payment backend implements.
///
/// Implementations hold configuration plus an HTTP client and are shared
/// across concurrent requests as `Arc<dyn PaymentProvider>`.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Begin a payment. `metadata` travels to the provider and comes back in
    /// webhook events; the orchestrator always includes `order_id`.
    async fn create_payment_intent(
        &self,
        amount: i64,
        currency: Currency,
        metadata: &HashMap<String, String>,
    ) -> PaymentResult<PaymentIntent>;

    /// Begin a hosted-checkout flow. Redirect-only providers may implement
    /// this by delegating to [`Self::create_payment_intent`] and requiring an
    /// approval URL in the result.
    async fn create_checkout_session(
        &self,
        amount: i64,
        currency: Currency,
        order_id: &str,
    ) -> PaymentResult<HostedCheckout>;

    /// Issue a full (or, with `amount`, partial) refund against a previously
    /// captured payment.
    async fn create_refund(
        &self,
        payment_id: &str,
        amount: Option<i64>,
        reason: Option<&str>,
    ) -> PaymentResult<Refund>;

    /// Verify a webhook payload against its signature and parse the event.
    /// `payload` must be the exact bytes received on the wire.
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> PaymentResult<ProviderEvent>;

    /// Mirror a product into the provider's catalog
    async fn create_product(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> PaymentResult<ProviderProduct>;

    /// Attach a price to a mirrored product
    async fn create_price(
        &self,
        product_id: &str,
        amount: i64,
        currency: Currency,
    ) -> PaymentResult<ProviderPrice>;

    /// Identity used for routing, storage and logging
    fn method(&self) -> PaymentMethod;
}

/// Type alias for a shared payment provider (dynamic dispatch)
pub type BoxedPaymentProvider = Arc<dyn PaymentProvider>;

/// Resolves a requested payment method to a concrete provider.
///
/// Immutable after construction; registration order is the order
/// [`ProviderRegistry::available`] reports, so "sync to all" operations are
/// deterministic.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<(PaymentMethod, BoxedPaymentProvider)>,
    default_method: Option<PaymentMethod>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider. The first registration becomes the default
    /// method unless one was set explicitly. Re-registering a method
    /// replaces the previous instance.
    pub fn register(&mut self, provider: BoxedPaymentProvider) {
        let method = provider.method();
        if let Some(slot) = self.providers.iter_mut().find(|(m, _)| *m == method) {
            slot.1 = provider;
        } else {
            self.providers.push((method, provider));
        }
        if self.default_method.is_none() {
            self.default_method = Some(method);
        }
    }

    /// Register with builder pattern
    pub fn with_provider(mut self, provider: BoxedPaymentProvider) -> Self {
        self.register(provider);
        self
    }

    /// Builder: pin the default method
    pub fn with_default(mut self, method: PaymentMethod) -> Self {
        self.default_method = Some(method);
        self
    }

    /// Resolve a method to its provider instance
    pub fn get(&self, method: PaymentMethod) -> PaymentResult<BoxedPaymentProvider> {
        self.providers
            .iter()
            .find(|(m, _)| *m == method)
            .map(|(_, p)| Arc::clone(p))
            .ok_or(PaymentError::UnsupportedProvider {
                method: method.to_string(),
            })
    }

    /// Resolve a method, falling back to the default when none was requested
    pub fn get_or_default(
        &self,
        method: Option<PaymentMethod>,
    ) -> PaymentResult<BoxedPaymentProvider> {
        match method.or(self.default_method) {
            Some(m) => self.get(m),
            None => Err(PaymentError::Configuration(
                "no payment providers registered".to_string(),
            )),
        }
    }

    /// Currently wired methods, in registration order
    pub fn available(&self) -> Vec<PaymentMethod> {
        self.providers.iter().map(|(m, _)| *m).collect()
    }

    pub fn has(&self, method: PaymentMethod) -> bool {
        self.providers.iter().any(|(m, _)| *m == method)
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!("stripe".parse::<PaymentMethod>().unwrap(), PaymentMethod::Stripe);
        assert_eq!("PayPal".parse::<PaymentMethod>().unwrap(), PaymentMethod::Paypal);
        assert!(matches!(
            "venmo".parse::<PaymentMethod>(),
            Err(PaymentError::UnsupportedProvider { .. })
        ));
    }

    #[test]
    fn test_method_wire_format() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Paypal).unwrap(),
            "\"paypal\""
        );
    }

    #[test]
    fn test_empty_registry() {
        let registry = ProviderRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.available().is_empty());
        assert!(matches!(
            registry.get(PaymentMethod::Stripe),
            Err(PaymentError::UnsupportedProvider { .. })
        ));
        assert!(matches!(
            registry.get_or_default(None),
            Err(PaymentError::Configuration(_))
        ));
    }
}
