//! # Payment Error Types
//!
//! Typed error handling for the paygate payment engine.
//! All payment operations return `Result<T, PaymentError>`.

use thiserror::Error;

/// Core error type for all payment operations
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Order lookup came back empty
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: String },

    /// Product lookup came back empty
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    /// Requested payment method has no registered provider
    #[error("Unsupported payment provider: {method}")]
    UnsupportedProvider { method: String },

    /// Currency not supported
    #[error("Unsupported currency: {currency}")]
    UnsupportedCurrency { currency: String },

    /// Action attempted against an order in the wrong lifecycle state
    #[error("Invalid order state: {reason}")]
    InvalidOrderState { reason: String },

    /// Refund attempted with no usable provider payment reference
    #[error("Cannot refund: no valid payment method ID found")]
    MissingPaymentReference,

    /// Payment provider API rejected or failed the call
    #[error("Provider error [{provider}]: {message}")]
    Provider { provider: String, message: String },

    /// Refund rejected by the provider backend
    #[error("Refund creation failed [{provider}]: {message}")]
    RefundFailed { provider: String, message: String },

    /// Network/HTTP error communicating with provider. Covers timeouts,
    /// where the outcome of the provider call is unknown.
    #[error("Network error: {0}")]
    Network(String),

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    WebhookVerificationFailed(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Persistence layer failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PaymentError {
    /// Returns true if retrying the same call could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::Network(_) | PaymentError::Provider { .. }
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::Configuration(_) => 500,
            PaymentError::InvalidRequest(_) => 400,
            PaymentError::OrderNotFound { .. } => 404,
            PaymentError::ProductNotFound { .. } => 404,
            PaymentError::UnsupportedProvider { .. } => 400,
            PaymentError::UnsupportedCurrency { .. } => 400,
            PaymentError::InvalidOrderState { .. } => 400,
            PaymentError::MissingPaymentReference => 400,
            PaymentError::Provider { .. } => 502,
            PaymentError::RefundFailed { .. } => 502,
            PaymentError::Network(_) => 503,
            PaymentError::WebhookVerificationFailed(_) => 401,
            PaymentError::WebhookParse(_) => 400,
            PaymentError::Storage(_) => 500,
            PaymentError::Serialization(_) => 500,
            PaymentError::Internal(_) => 500,
        }
    }
}

/// Result type alias for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(PaymentError::Network("timeout".into()).is_retryable());
        assert!(PaymentError::Provider {
            provider: "stripe".into(),
            message: "internal".into()
        }
        .is_retryable());
        assert!(!PaymentError::InvalidRequest("bad data".into()).is_retryable());
        assert!(!PaymentError::MissingPaymentReference.is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            PaymentError::OrderNotFound {
                order_id: "x".into()
            }
            .status_code(),
            404
        );
        assert_eq!(
            PaymentError::InvalidOrderState {
                reason: "order must be paid to request refund".into()
            }
            .status_code(),
            400
        );
        assert_eq!(
            PaymentError::WebhookVerificationFailed("sig".into()).status_code(),
            401
        );
        assert_eq!(
            PaymentError::RefundFailed {
                provider: "paypal".into(),
                message: "already refunded".into()
            }
            .status_code(),
            502
        );
    }
}
