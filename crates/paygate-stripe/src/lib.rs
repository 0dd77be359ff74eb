//! # paygate-stripe
//!
//! Stripe provider for paygate-rs.
//!
//! Implements the full `PaymentProvider` contract: payment intents, hosted
//! checkout sessions, refunds, webhook verification, and catalog mirroring
//! (products + prices).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use paygate_stripe::StripeProvider;
//! use paygate_core::ProviderRegistry;
//!
//! // Create provider from environment (STRIPE_SECRET_KEY, STRIPE_WEBHOOK_SECRET)
//! let stripe = StripeProvider::from_env()?;
//!
//! let registry = ProviderRegistry::new().with_provider(Arc::new(stripe));
//! ```
//!
//! Webhook deliveries are verified against the `stripe-signature` header on
//! the exact request bytes; see [`webhook::verify_and_parse`].

pub mod config;
pub mod provider;
pub mod webhook;

// Re-exports
pub use config::StripeConfig;
pub use provider::StripeProvider;
