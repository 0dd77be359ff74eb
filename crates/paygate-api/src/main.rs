//! # Paygate RS
//!
//! Multi-provider payment engine.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...
//! export PAYPAL_CLIENT_ID=...
//! export PAYPAL_CLIENT_SECRET=...
//! export PAYPAL_WEBHOOK_SECRET=...
//!
//! # Run the server
//! paygate
//! ```

use paygate_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Initialize application state
    let state = AppState::new().await?;

    let addr = state.config.socket_addr();
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Payment providers: {:?}", state.registry.available());

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("Paygate starting on http://{}", addr);

    if !is_prod {
        info!("Health: GET http://{}/health", addr);
        info!("Orders: POST http://{}/api/v1/orders", addr);
        info!("Webhooks: POST http://{}/webhook/{{provider}}", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
