//! # Payment Orchestrator
//!
//! Drives an order through the payment lifecycle: intent/checkout creation,
//! webhook application, refunds. All status writes go through the store's
//! guarded transition, so concurrent webhook deliveries and caller actions
//! cannot regress an order or double-refund it.

use crate::error::{PaymentError, PaymentResult};
use crate::order::OrderStatus;
use crate::provider::{
    HostedCheckout, PaymentIntent, PaymentMethod, PaymentProvider, ProviderEvent,
    ProviderEventKind, ProviderRegistry, Refund,
};
use crate::store::{OrderPatch, SharedOrderStore, TransitionResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Statuses a payment flow may be initiated from
const INITIABLE: [OrderStatus; 3] = [
    OrderStatus::Pending,
    OrderStatus::PaymentIntentCreated,
    OrderStatus::CheckoutSessionCreated,
];

/// Statuses a verified payment-outcome webhook may move an order from
const SETTLEABLE: [OrderStatus; 2] = [
    OrderStatus::PaymentIntentCreated,
    OrderStatus::CheckoutSessionCreated,
];

pub struct PaymentOrchestrator {
    orders: SharedOrderStore,
    registry: Arc<ProviderRegistry>,
}

impl PaymentOrchestrator {
    pub fn new(orders: SharedOrderStore, registry: Arc<ProviderRegistry>) -> Self {
        Self { orders, registry }
    }

    /// Begin a pull-model payment for an order. Persists the provider's
    /// transaction id and moves the order to `PAYMENT_INTENT_CREATED`.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn create_payment_intent(
        &self,
        order_id: Uuid,
        method: Option<PaymentMethod>,
    ) -> PaymentResult<PaymentIntent> {
        let (order, provider) = self.load_for_initiation(order_id, method).await?;
        let method = provider.method();

        let mut metadata = HashMap::new();
        metadata.insert("order_id".to_string(), order.id.to_string());

        let intent = provider
            .create_payment_intent(order.amount, order.currency, &metadata)
            .await?;

        self.persist_initiation(
            order_id,
            OrderPatch::status(OrderStatus::PaymentIntentCreated)
                .with_provider(method)
                .with_transaction_id(intent.id.clone())
                .with_payment_method_id(intent.id.clone()),
        )
        .await?;

        info!(%order_id, %method, transaction_id = %intent.id, "payment intent created");
        Ok(intent)
    }

    /// Begin a hosted-checkout flow for an order. Persists the session id
    /// and moves the order to `CHECKOUT_SESSION_CREATED`.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn create_checkout_session(
        &self,
        order_id: Uuid,
        method: Option<PaymentMethod>,
    ) -> PaymentResult<HostedCheckout> {
        let (order, provider) = self.load_for_initiation(order_id, method).await?;
        let method = provider.method();

        let session = provider
            .create_checkout_session(order.amount, order.currency, &order.id.to_string())
            .await?;

        self.persist_initiation(
            order_id,
            OrderPatch::status(OrderStatus::CheckoutSessionCreated)
                .with_provider(method)
                .with_transaction_id(session.id.clone())
                .with_payment_method_id(session.id.clone()),
        )
        .await?;

        info!(%order_id, %method, session_id = %session.id, "checkout session created");
        Ok(session)
    }

    /// Refund a paid order in full.
    ///
    /// The order is claimed (`PAYMENT_SUCCEEDED` -> `REFUND_REQUESTED`)
    /// *before* the provider call so two racing requests cannot both reach
    /// the provider; a provider failure releases the claim.
    #[instrument(skip(self, reason), fields(order_id = %order_id))]
    pub async fn request_refund(
        &self,
        order_id: Uuid,
        reason: Option<&str>,
    ) -> PaymentResult<Refund> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or(PaymentError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;

        if order.status != OrderStatus::PaymentSucceeded {
            return Err(PaymentError::InvalidOrderState {
                reason: "order must be paid to request refund".to_string(),
            });
        }
        let payment_method_id = order
            .payment_method_id
            .clone()
            .ok_or(PaymentError::MissingPaymentReference)?;
        // Refunds always go to the provider the payment was made with, never
        // a caller-supplied one.
        let method = order.provider.ok_or_else(|| {
            PaymentError::Internal("paid order has no recorded provider".to_string())
        })?;
        let provider = self.registry.get(method)?;

        let claim = self
            .orders
            .transition(
                order_id,
                &[OrderStatus::PaymentSucceeded],
                OrderPatch::status(OrderStatus::RefundRequested),
            )
            .await?;
        match claim {
            TransitionResult::Updated(_) => {}
            TransitionResult::Refused(_) => {
                return Err(PaymentError::InvalidOrderState {
                    reason: "order must be paid to request refund".to_string(),
                });
            }
            TransitionResult::NotFound => {
                return Err(PaymentError::OrderNotFound {
                    order_id: order_id.to_string(),
                });
            }
        }

        match provider
            .create_refund(&payment_method_id, Some(order.amount), reason)
            .await
        {
            Ok(refund) => {
                info!(%order_id, %method, refund_id = %refund.id, "refund requested");
                Ok(refund)
            }
            Err(err) => {
                // Release the claim; the order is still refundable.
                self.orders
                    .transition(
                        order_id,
                        &[OrderStatus::RefundRequested],
                        OrderPatch::status(OrderStatus::PaymentSucceeded),
                    )
                    .await?;
                Err(PaymentError::RefundFailed {
                    provider: method.to_string(),
                    message: err.to_string(),
                })
            }
        }
    }

    /// Verify and apply a webhook delivery.
    ///
    /// Verification failures propagate (the provider must see a rejection
    /// and redeliver). Applications are idempotent and status-conditional:
    /// a repeated success event is a no-op, and a failure event arriving
    /// after a success does not regress the order.
    #[instrument(skip(self, raw_body, signature))]
    pub async fn handle_webhook(
        &self,
        raw_body: &[u8],
        signature: &str,
        method: Option<PaymentMethod>,
    ) -> PaymentResult<()> {
        let provider = self.registry.get_or_default(method)?;
        let event = provider.verify_webhook(raw_body, signature).await?;

        info!(
            provider = %provider.method(),
            event_id = %event.event_id,
            kind = ?event.kind,
            "webhook verified"
        );

        match event.kind {
            ProviderEventKind::PaymentSucceeded => {
                self.settle_by_transaction(&event, OrderStatus::PaymentSucceeded)
                    .await
            }
            ProviderEventKind::PaymentFailed => {
                self.settle_by_transaction(&event, OrderStatus::PaymentFailed)
                    .await
            }
            ProviderEventKind::CheckoutCompleted => self.reconcile_checkout(&event).await,
            ProviderEventKind::Unknown(kind) => {
                debug!(%kind, "ignoring unhandled webhook event");
                Ok(())
            }
        }
    }

    /// Supported payment methods, in registration order
    pub fn available_methods(&self) -> Vec<PaymentMethod> {
        self.registry.available()
    }

    /// Load an order and resolve the provider for a payment initiation,
    /// enforcing the lifecycle and same-provider guards.
    async fn load_for_initiation(
        &self,
        order_id: Uuid,
        method: Option<PaymentMethod>,
    ) -> PaymentResult<(crate::order::Order, crate::provider::BoxedPaymentProvider)> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or(PaymentError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;

        if !order.status.can_initiate_payment() {
            return Err(PaymentError::InvalidOrderState {
                reason: format!("cannot initiate payment from status {}", order.status),
            });
        }

        let provider = self.registry.get_or_default(method)?;
        if let Some(recorded) = order.provider {
            if recorded != provider.method() {
                return Err(PaymentError::InvalidOrderState {
                    reason: format!("payment already initiated with {recorded}"),
                });
            }
        }

        Ok((order, provider))
    }

    async fn persist_initiation(&self, order_id: Uuid, patch: OrderPatch) -> PaymentResult<()> {
        match self.orders.transition(order_id, &INITIABLE, patch).await? {
            TransitionResult::Updated(_) => Ok(()),
            TransitionResult::Refused(current) => Err(PaymentError::InvalidOrderState {
                reason: format!("order moved to {} concurrently", current.status),
            }),
            TransitionResult::NotFound => Err(PaymentError::OrderNotFound {
                order_id: order_id.to_string(),
            }),
        }
    }

    /// Apply a payment-outcome event by transaction-id lookup
    async fn settle_by_transaction(
        &self,
        event: &ProviderEvent,
        status: OrderStatus,
    ) -> PaymentResult<()> {
        let Some(transaction_id) = event.transaction_id.as_deref() else {
            warn!(event_id = %event.event_id, "payment event without transaction id");
            return Ok(());
        };

        let Some(order) = self.orders.find_by_transaction(transaction_id).await? else {
            // At-least-once delivery can outrun order persistence, and other
            // systems may share the provider account.
            warn!(%transaction_id, "webhook for unknown transaction");
            return Ok(());
        };

        match self
            .orders
            .transition(order.id, &SETTLEABLE, OrderPatch::status(status))
            .await?
        {
            TransitionResult::Updated(order) => {
                info!(order_id = %order.id, %status, "order settled by webhook");
            }
            TransitionResult::Refused(current) if current.status == status => {
                // Redelivery of an already-applied event
                debug!(order_id = %current.id, %status, "webhook replay, no-op");
            }
            TransitionResult::Refused(current) => {
                // e.g. a failure event arriving after a success: never regress
                warn!(
                    order_id = %current.id,
                    current = %current.status,
                    attempted = %status,
                    "webhook ignored by status guard"
                );
            }
            TransitionResult::NotFound => {}
        }
        Ok(())
    }

    /// Apply a checkout-completed event: settle the order referenced by the
    /// event's metadata and replace the stored session id with the true
    /// payment reference (sessions and payments have distinct ids; this is
    /// the point where they are reconciled, and the payment reference is
    /// what a later refund needs).
    async fn reconcile_checkout(&self, event: &ProviderEvent) -> PaymentResult<()> {
        let Some(order_id) = event.order_id.as_deref() else {
            warn!(event_id = %event.event_id, "checkout event without order metadata");
            return Ok(());
        };
        let Ok(order_id) = Uuid::parse_str(order_id) else {
            warn!(event_id = %event.event_id, %order_id, "checkout event with foreign order id");
            return Ok(());
        };

        let mut patch = OrderPatch::status(OrderStatus::PaymentSucceeded);
        if let Some(transaction_id) = event.transaction_id.as_deref() {
            patch = patch
                .with_transaction_id(transaction_id)
                .with_payment_method_id(transaction_id);
        }

        match self.orders.transition(order_id, &SETTLEABLE, patch).await? {
            TransitionResult::Updated(order) => {
                info!(
                    order_id = %order.id,
                    transaction_id = ?order.transaction_id,
                    "checkout completed, payment reference reconciled"
                );
            }
            TransitionResult::Refused(current)
                if current.status == OrderStatus::PaymentSucceeded =>
            {
                debug!(order_id = %current.id, "checkout webhook replay, no-op");
            }
            TransitionResult::Refused(current) => {
                warn!(
                    order_id = %current.id,
                    current = %current.status,
                    "checkout webhook ignored by status guard"
                );
            }
            TransitionResult::NotFound => {
                warn!(%order_id, "checkout webhook for unknown order");
            }
        }
        Ok(())
    }
}
