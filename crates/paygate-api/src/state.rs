//! # Application State
//!
//! Shared state for the Axum application: provider registry, stores,
//! orchestrator and catalog sync, all constructed once at startup and passed
//! down. Tests build the same state with their own providers and stores via
//! [`AppState::with_parts`].

use paygate_core::{
    CatalogSync, InMemoryOrderStore, InMemoryProductStore, PaymentOrchestrator, Product,
    ProductStore, ProviderRegistry, SeedCatalog, SharedOrderStore, SharedProductStore,
};
use paygate_paypal::PaypalProvider;
use paygate_stripe::StripeProvider;
use std::sync::Arc;
use tracing::{info, warn};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Base URL for callbacks
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Invalid socket address")
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment provider registry
    pub registry: Arc<ProviderRegistry>,
    /// Order repository
    pub orders: SharedOrderStore,
    /// Product repository
    pub products: SharedProductStore,
    /// Payment state machine
    pub orchestrator: Arc<PaymentOrchestrator>,
    /// Product catalog mirroring
    pub sync: Arc<CatalogSync>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create the production state: providers from the environment,
    /// in-memory stores, optional product seed catalog.
    ///
    /// A provider with missing credentials is skipped with a warning rather
    /// than aborting startup; the registry only advertises what is wired.
    pub async fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let mut registry = ProviderRegistry::new();

        match StripeProvider::from_env() {
            Ok(stripe) => registry.register(Arc::new(stripe)),
            Err(e) => warn!("Stripe not registered: {}", e),
        }
        match PaypalProvider::from_env() {
            Ok(paypal) => registry.register(Arc::new(paypal)),
            Err(e) => warn!("PayPal not registered: {}", e),
        }

        if registry.is_empty() {
            anyhow::bail!("no payment providers configured");
        }

        let orders: SharedOrderStore = Arc::new(InMemoryOrderStore::new());
        let products: SharedProductStore = Arc::new(InMemoryProductStore::new());

        seed_products(&products).await?;

        Ok(Self::with_parts(registry, orders, products, config))
    }

    /// Assemble state from explicitly constructed parts (used by tests and
    /// alternative binaries).
    pub fn with_parts(
        registry: ProviderRegistry,
        orders: SharedOrderStore,
        products: SharedProductStore,
        config: AppConfig,
    ) -> Self {
        let registry = Arc::new(registry);
        let orchestrator = Arc::new(PaymentOrchestrator::new(
            orders.clone(),
            registry.clone(),
        ));
        let sync = Arc::new(CatalogSync::new(products.clone(), registry.clone()));

        Self {
            registry,
            orders,
            products,
            orchestrator,
            sync,
            config,
        }
    }
}

/// Load the optional seed catalog from `config/products.toml`
async fn seed_products(products: &SharedProductStore) -> anyhow::Result<()> {
    let config_paths = [
        "config/products.toml",
        "../config/products.toml",
        "../../config/products.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let catalog: SeedCatalog = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            for seed in &catalog.products {
                let product: Product = seed.into();
                products.insert(product).await?;
            }
            info!("Seeded {} products from {}", catalog.products.len(), path);
            return Ok(());
        }
    }

    info!("No product seed catalog found, starting empty");
    Ok(())
}
