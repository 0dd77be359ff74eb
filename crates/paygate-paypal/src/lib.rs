//! # paygate-paypal
//!
//! PayPal provider for paygate-rs.
//!
//! Implements the full `PaymentProvider` contract over PayPal's REST API:
//! checkout orders (redirect-model payment intents), refunds against
//! captures, webhook verification, and catalog mirroring. Amounts are
//! converted to PayPal's major-unit wire format internally.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use paygate_paypal::PaypalProvider;
//! use paygate_core::ProviderRegistry;
//!
//! // Create provider from environment
//! // (PAYPAL_CLIENT_ID, PAYPAL_CLIENT_SECRET, PAYPAL_WEBHOOK_SECRET)
//! let paypal = PaypalProvider::from_env()?;
//!
//! let registry = ProviderRegistry::new().with_provider(Arc::new(paypal));
//! ```

pub mod config;
pub mod provider;
pub mod webhook;

// Re-exports
pub use config::PaypalConfig;
pub use provider::PaypalProvider;
