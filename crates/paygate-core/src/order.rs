//! # Order Types
//!
//! Order aggregate and its payment lifecycle.
//!
//! Status moves monotonically through the machine below; every persisted
//! status change goes through [`crate::store::OrderStore::transition`] so a
//! stale writer can never regress an order.
//!
//! ```text
//! pending ──(create intent)──────────> PAYMENT_INTENT_CREATED ──┐
//!    │                                                          ├─(webhook ok)──> PAYMENT_SUCCEEDED ──(refund)──> REFUND_REQUESTED
//!    └──(create checkout session)────> CHECKOUT_SESSION_CREATED ┘
//!                                        │
//!                                        └─(webhook failed)────> PAYMENT_FAILED
//! ```

use crate::money::Currency;
use crate::provider::PaymentMethod;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payment lifecycle status of an order.
///
/// Wire spellings match the upstream contract: `pending` plus the
/// SCREAMING_SNAKE states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "PAYMENT_INTENT_CREATED")]
    PaymentIntentCreated,
    #[serde(rename = "CHECKOUT_SESSION_CREATED")]
    CheckoutSessionCreated,
    #[serde(rename = "PAYMENT_SUCCEEDED")]
    PaymentSucceeded,
    #[serde(rename = "PAYMENT_FAILED")]
    PaymentFailed,
    #[serde(rename = "REFUND_REQUESTED")]
    RefundRequested,
}

impl OrderStatus {
    /// Whether a payment flow (intent or checkout session) may be initiated
    /// from this status. Re-initiation from an already-initiated state is
    /// allowed; the provider match is checked separately by the orchestrator.
    pub fn can_initiate_payment(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending
                | OrderStatus::PaymentIntentCreated
                | OrderStatus::CheckoutSessionCreated
        )
    }

    /// The state machine: is `next` a legal successor of `self`?
    pub fn can_transition(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Pending, PaymentIntentCreated) | (Pending, CheckoutSessionCreated) => true,
            // Re-initiation: the client abandoned the first attempt.
            (PaymentIntentCreated, PaymentIntentCreated)
            | (PaymentIntentCreated, CheckoutSessionCreated)
            | (CheckoutSessionCreated, PaymentIntentCreated)
            | (CheckoutSessionCreated, CheckoutSessionCreated) => true,
            (PaymentIntentCreated, PaymentSucceeded)
            | (PaymentIntentCreated, PaymentFailed)
            | (CheckoutSessionCreated, PaymentSucceeded)
            | (CheckoutSessionCreated, PaymentFailed) => true,
            (PaymentSucceeded, RefundRequested) => true,
            _ => false,
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PaymentIntentCreated => "PAYMENT_INTENT_CREATED",
            OrderStatus::CheckoutSessionCreated => "CHECKOUT_SESSION_CREATED",
            OrderStatus::PaymentSucceeded => "PAYMENT_SUCCEEDED",
            OrderStatus::PaymentFailed => "PAYMENT_FAILED",
            OrderStatus::RefundRequested => "REFUND_REQUESTED",
        };
        write!(f, "{}", s)
    }
}

/// An order awaiting (or having completed) payment.
///
/// `amount` is immutable after creation and always in the smallest currency
/// unit. Orders are never deleted; the full lifecycle stays on record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID (generated)
    pub id: Uuid,

    /// Amount in smallest currency unit (cents for USD)
    pub amount: i64,

    /// Currency
    pub currency: Currency,

    /// Lifecycle status
    #[serde(default)]
    pub status: OrderStatus,

    /// Provider the payment was initiated with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<PaymentMethod>,

    /// Provider-assigned payment intent / checkout session id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,

    /// Provider reference a refund is issued against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<String>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Create a new pending order with generated ID
    pub fn new(amount: i64, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            amount,
            currency,
            status: OrderStatus::Pending,
            provider: None,
            transaction_id: None,
            payment_method_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a refund may be requested: paid, with a usable provider
    /// payment reference.
    pub fn is_refundable(&self) -> bool {
        self.status == OrderStatus::PaymentSucceeded && self.payment_method_id.is_some()
    }
}
