//! # PayPal Configuration
//!
//! Configuration management for the PayPal integration.
//! Credentials come from environment variables; the environment selects the
//! sandbox or live API host.

use paygate_core::PaymentError;
use std::env;

const SANDBOX_API: &str = "https://api-m.sandbox.paypal.com";
const LIVE_API: &str = "https://api-m.paypal.com";

/// PayPal API configuration
#[derive(Debug, Clone)]
pub struct PaypalConfig {
    /// OAuth client id
    pub client_id: String,

    /// OAuth client secret
    pub client_secret: String,

    /// Webhook signing secret
    pub webhook_secret: String,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// Where the approval flow sends the customer afterwards
    pub return_url: String,
    pub cancel_url: String,
}

impl PaypalConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `PAYPAL_CLIENT_ID`
    /// - `PAYPAL_CLIENT_SECRET`
    /// - `PAYPAL_WEBHOOK_SECRET`
    ///
    /// Optional: `PAYPAL_ENVIRONMENT` (`sandbox` (default) or `live`)
    pub fn from_env() -> Result<Self, PaymentError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let client_id = env::var("PAYPAL_CLIENT_ID").map_err(|_| {
            PaymentError::Configuration("PAYPAL_CLIENT_ID not set".to_string())
        })?;

        let client_secret = env::var("PAYPAL_CLIENT_SECRET").map_err(|_| {
            PaymentError::Configuration("PAYPAL_CLIENT_SECRET not set".to_string())
        })?;

        let webhook_secret = env::var("PAYPAL_WEBHOOK_SECRET").map_err(|_| {
            PaymentError::Configuration("PAYPAL_WEBHOOK_SECRET not set".to_string())
        })?;

        let api_base_url = match env::var("PAYPAL_ENVIRONMENT").as_deref() {
            Ok("live") => LIVE_API.to_string(),
            Ok("sandbox") | Err(_) => SANDBOX_API.to_string(),
            Ok(other) => {
                return Err(PaymentError::Configuration(format!(
                    "PAYPAL_ENVIRONMENT must be sandbox or live, got {}",
                    other
                )))
            }
        };

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

        Ok(Self {
            client_id,
            client_secret,
            webhook_secret,
            api_base_url,
            return_url: format!("{}/api/v1/payments/success", base_url),
            cancel_url: format!("{}/api/v1/payments/cancel", base_url),
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            webhook_secret: webhook_secret.into(),
            api_base_url: SANDBOX_API.to_string(),
            return_url: "http://localhost:8080/api/v1/payments/success".to_string(),
            cancel_url: "http://localhost:8080/api/v1/payments/cancel".to_string(),
        }
    }

    /// Check if pointed at the sandbox host
    pub fn is_sandbox(&self) -> bool {
        self.api_base_url == SANDBOX_API
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}
