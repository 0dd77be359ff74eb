//! # paygate-core
//!
//! Core types and payment orchestration for the paygate engine.
//!
//! This crate provides:
//! - `PaymentProvider` trait and `ProviderRegistry` for pluggable payment
//!   backends
//! - `Order` and its lifecycle state machine
//! - `Product` with per-provider catalog mirroring state
//! - `OrderStore` / `ProductStore` repository ports with in-memory
//!   implementations
//! - `PaymentOrchestrator` for intents, checkout sessions, webhooks and
//!   refunds
//! - `CatalogSync` for per-provider product synchronization
//! - `PaymentError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use paygate_core::{
//!     InMemoryOrderStore, Order, Currency, PaymentOrchestrator, ProviderRegistry,
//! };
//!
//! let orders = Arc::new(InMemoryOrderStore::new());
//! let registry = Arc::new(ProviderRegistry::new().with_provider(stripe));
//! let orchestrator = PaymentOrchestrator::new(orders.clone(), registry);
//!
//! // Place an order, then begin payment
//! let order = orders.insert(Order::new(1000, Currency::USD)).await?;
//! let intent = orchestrator.create_payment_intent(order.id, None).await?;
//!
//! // Hand intent.client_secret (or intent.approval_url) to the client
//! ```

pub mod error;
pub mod money;
pub mod order;
pub mod orchestrator;
pub mod product;
pub mod provider;
pub mod store;
pub mod sync;

#[cfg(test)]
pub(crate) mod testutil;

// Re-exports for convenience
pub use error::{PaymentError, PaymentResult};
pub use money::Currency;
pub use order::{Order, OrderStatus};
pub use orchestrator::PaymentOrchestrator;
pub use product::{Product, SeedCatalog, SeedProduct};
pub use provider::{
    BoxedPaymentProvider, HostedCheckout, PaymentIntent, PaymentMethod, PaymentProvider,
    ProviderEvent, ProviderEventKind, ProviderPrice, ProviderProduct, ProviderRegistry,
    Refund,
};
pub use store::{
    InMemoryOrderStore, InMemoryProductStore, OrderPatch, OrderStore, ProductStore,
    SharedOrderStore, SharedProductStore, TransitionResult,
};
pub use sync::{CatalogSync, SyncFailure, SyncOutcome, SyncStatus};
