//! # Repository Ports
//!
//! Abstract stores for orders and products, plus thread-safe in-memory
//! implementations. A SQL-backed store would implement the same traits.
//!
//! The one non-obvious operation is [`OrderStore::transition`]: a single
//! guarded compare-on-status update. Webhook deliveries are at-least-once
//! and race caller-initiated actions, so every status write is conditional
//! on the current status instead of a blind overwrite.

use crate::error::{PaymentError, PaymentResult};
use crate::order::{Order, OrderStatus};
use crate::product::Product;
use crate::provider::PaymentMethod;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Fields applied by a guarded order transition. `None` leaves the stored
/// value untouched.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub provider: Option<PaymentMethod>,
    pub transaction_id: Option<String>,
    pub payment_method_id: Option<String>,
}

impl OrderPatch {
    /// Patch that only moves the status
    pub fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_provider(mut self, provider: PaymentMethod) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_transaction_id(mut self, id: impl Into<String>) -> Self {
        self.transaction_id = Some(id.into());
        self
    }

    pub fn with_payment_method_id(mut self, id: impl Into<String>) -> Self {
        self.payment_method_id = Some(id.into());
        self
    }
}

/// Outcome of a guarded transition
#[derive(Debug, Clone)]
pub enum TransitionResult {
    /// Guard held; the patch was applied. Carries the updated order.
    Updated(Order),
    /// The order exists but its status was not in the expected set.
    /// Carries the untouched current order.
    Refused(Order),
    /// No order with that id
    NotFound,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: Order) -> PaymentResult<Order>;

    async fn get(&self, id: Uuid) -> PaymentResult<Option<Order>>;

    /// Lookup by the provider-assigned transaction id (webhook reconciliation)
    async fn find_by_transaction(&self, transaction_id: &str)
        -> PaymentResult<Option<Order>>;

    /// Atomically apply `patch` iff the order's current status is in
    /// `expected`. The check and the write happen under one lock (or one
    /// conditional UPDATE in a SQL implementation), which is what gives
    /// at-most-one-refund and no-regression semantics under concurrency.
    async fn transition(
        &self,
        id: Uuid,
        expected: &[OrderStatus],
        patch: OrderPatch,
    ) -> PaymentResult<TransitionResult>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert(&self, product: Product) -> PaymentResult<Product>;

    async fn get(&self, id: Uuid) -> PaymentResult<Option<Product>>;

    async fn list(&self) -> PaymentResult<Vec<Product>>;

    /// Overwrite an existing product record
    async fn update(&self, product: &Product) -> PaymentResult<()>;
}

/// Shared handles to the stores, as constructed at startup or by tests
pub type SharedOrderStore = Arc<dyn OrderStore>;
pub type SharedProductStore = Arc<dyn ProductStore>;

/// A thread-safe in-memory order store.
///
/// `Arc<RwLock<HashMap<Uuid, Order>>>` keeps the guarded transition atomic:
/// the expected-status check and the write both happen under the write lock.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<Uuid, Order>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> PaymentResult<Order> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get(&self, id: Uuid) -> PaymentResult<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id).cloned())
    }

    async fn find_by_transaction(
        &self,
        transaction_id: &str,
    ) -> PaymentResult<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .find(|o| o.transaction_id.as_deref() == Some(transaction_id))
            .cloned())
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: &[OrderStatus],
        patch: OrderPatch,
    ) -> PaymentResult<TransitionResult> {
        let mut orders = self.orders.write().await;
        let order = match orders.get_mut(&id) {
            Some(order) => order,
            None => return Ok(TransitionResult::NotFound),
        };

        if !expected.contains(&order.status) {
            return Ok(TransitionResult::Refused(order.clone()));
        }

        if let Some(status) = patch.status {
            order.status = status;
        }
        if let Some(provider) = patch.provider {
            order.provider = Some(provider);
        }
        if let Some(transaction_id) = patch.transaction_id {
            order.transaction_id = Some(transaction_id);
        }
        if let Some(payment_method_id) = patch.payment_method_id {
            order.payment_method_id = Some(payment_method_id);
        }
        order.updated_at = Utc::now();

        Ok(TransitionResult::Updated(order.clone()))
    }
}

/// A thread-safe in-memory product store
#[derive(Default, Clone)]
pub struct InMemoryProductStore {
    products: Arc<RwLock<HashMap<Uuid, Product>>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn insert(&self, product: Product) -> PaymentResult<Product> {
        let mut products = self.products.write().await;
        products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn get(&self, id: Uuid) -> PaymentResult<Option<Product>> {
        let products = self.products.read().await;
        Ok(products.get(&id).cloned())
    }

    async fn list(&self) -> PaymentResult<Vec<Product>> {
        let products = self.products.read().await;
        let mut all: Vec<Product> = products.values().cloned().collect();
        all.sort_by_key(|p| p.created_at);
        Ok(all)
    }

    async fn update(&self, product: &Product) -> PaymentResult<()> {
        let mut products = self.products.write().await;
        match products.get_mut(&product.id) {
            Some(slot) => {
                *slot = product.clone();
                Ok(())
            }
            None => Err(PaymentError::ProductNotFound {
                product_id: product.id.to_string(),
            }),
        }
    }
}
