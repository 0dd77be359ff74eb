//! # Product Catalog Sync
//!
//! Mirrors locally defined products into payment providers, one provider at
//! a time. Failures are isolated per provider: one bad backend never blocks
//! the others, and whatever ids were obtained are persisted.

use crate::error::{PaymentError, PaymentResult};
use crate::product::Product;
use crate::provider::{PaymentMethod, PaymentProvider, ProviderRegistry};
use crate::store::SharedProductStore;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// A provider that could not be synced, with the reason
#[derive(Debug, Clone, serde::Serialize)]
pub struct SyncFailure {
    pub provider: PaymentMethod,
    pub error: String,
}

/// Full breakdown of a sync run
#[derive(Debug, Clone, serde::Serialize)]
pub struct SyncOutcome {
    pub product: Product,
    pub successful_syncs: Vec<PaymentMethod>,
    pub failed_syncs: Vec<SyncFailure>,
}

impl SyncOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failed_syncs.is_empty()
    }
}

/// Sync-state report for a product
#[derive(Debug, Clone, serde::Serialize)]
pub struct SyncStatus {
    pub product: Product,
    pub synced_providers: Vec<PaymentMethod>,
    pub available_providers: Vec<PaymentMethod>,
}

pub struct CatalogSync {
    products: SharedProductStore,
    registry: Arc<ProviderRegistry>,
}

impl CatalogSync {
    pub fn new(products: SharedProductStore, registry: Arc<ProviderRegistry>) -> Self {
        Self { products, registry }
    }

    /// Mirror a product into each requested provider, in the order given.
    ///
    /// For each provider: create the product, then attach a price; either
    /// step failing records the provider in `failed_syncs` and moves on. No
    /// retries. The product is persisted once, after all attempts, with
    /// whatever id pairs were obtained.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn sync_to_providers(
        &self,
        product_id: Uuid,
        providers: &[PaymentMethod],
    ) -> PaymentResult<SyncOutcome> {
        let mut product = self.load(product_id).await?;

        let mut successful_syncs = Vec::new();
        let mut failed_syncs = Vec::new();

        for &method in providers {
            match self.sync_one(&product, method).await {
                Ok((external_product_id, external_price_id)) => {
                    product.set_provider_refs(method, external_product_id, external_price_id);
                    successful_syncs.push(method);
                    info!(%method, "product synced");
                }
                Err(err) => {
                    error!(%method, error = %err, "product sync failed");
                    failed_syncs.push(SyncFailure {
                        provider: method,
                        error: err.to_string(),
                    });
                }
            }
        }

        self.products.update(&product).await?;

        info!(
            total = providers.len(),
            succeeded = successful_syncs.len(),
            failed = failed_syncs.len(),
            "sync finished"
        );

        Ok(SyncOutcome {
            product,
            successful_syncs,
            failed_syncs,
        })
    }

    /// Report which providers a product is fully synced to. A provider
    /// counts only when both its external product id and price id are set.
    pub async fn sync_status(&self, product_id: Uuid) -> PaymentResult<SyncStatus> {
        let product = self.load(product_id).await?;
        let available_providers = self.registry.available();
        let synced_providers = available_providers
            .iter()
            .copied()
            .filter(|&m| product.is_synced(m))
            .collect();

        Ok(SyncStatus {
            product,
            synced_providers,
            available_providers,
        })
    }

    async fn load(&self, product_id: Uuid) -> PaymentResult<Product> {
        self.products
            .get(product_id)
            .await?
            .ok_or(PaymentError::ProductNotFound {
                product_id: product_id.to_string(),
            })
    }

    /// Create product then price in one provider; returns the external id pair
    async fn sync_one(
        &self,
        product: &Product,
        method: PaymentMethod,
    ) -> PaymentResult<(String, String)> {
        let provider = self.registry.get(method)?;

        let external_product = provider
            .create_product(&product.name, product.description.as_deref())
            .await?;

        let external_price = provider
            .create_price(&external_product.id, product.price, product.currency)
            .await?;

        Ok((external_product.id, external_price.id))
    }
}
