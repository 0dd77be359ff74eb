//! # paygate-api
//!
//! HTTP API layer for paygate-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoints for orders, payments and the product catalog
//! - Raw-body webhook handlers for payment events
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/v1/orders` | Create order |
//! | POST | `/api/v1/payments/create-intent` | Begin a payment |
//! | POST | `/api/v1/payments/create-checkout-session` | Hosted checkout |
//! | POST | `/api/v1/payments/request-refund` | Refund a paid order |
//! | GET | `/api/v1/payments/methods` | List payment methods |
//! | POST | `/api/v1/products` | Create product |
//! | POST | `/api/v1/products/{id}/sync` | Mirror product into providers |
//! | GET | `/api/v1/products/{id}/sync-status` | Sync report |
//! | POST | `/webhook/{provider}` | Provider webhook (raw body) |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
