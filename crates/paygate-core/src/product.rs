//! # Product Types
//!
//! Locally defined products that can be mirrored into payment providers.
//! Creation has no provider side effects; synchronization is a separate,
//! explicit, repeatable operation (see [`crate::sync`]).

use crate::money::Currency;
use crate::provider::PaymentMethod;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product in the local catalog.
///
/// Each supported provider gets a nullable pair of external ids. A product
/// may be partially synced: zero, some, or all pairs populated. Adding a new
/// provider means adding a new pair of fields here, which is the accepted
/// scalability trade-off of this schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier (generated)
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Short description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Price in smallest currency unit
    pub price: i64,

    /// Currency
    pub currency: Currency,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_price_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paypal_product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paypal_price_id: Option<String>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Create a new product with generated ID and no provider ids
    pub fn new(name: impl Into<String>, price: i64, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            price,
            currency,
            stripe_product_id: None,
            stripe_price_id: None,
            paypal_product_id: None,
            paypal_price_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder: set description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// External (product id, price id) pair for a provider
    pub fn provider_refs(&self, method: PaymentMethod) -> (Option<&str>, Option<&str>) {
        match method {
            PaymentMethod::Stripe => (
                self.stripe_product_id.as_deref(),
                self.stripe_price_id.as_deref(),
            ),
            PaymentMethod::Paypal => (
                self.paypal_product_id.as_deref(),
                self.paypal_price_id.as_deref(),
            ),
        }
    }

    /// Record a provider's external id pair. Only touches the named
    /// provider's fields; ids already present for other providers stay.
    pub fn set_provider_refs(
        &mut self,
        method: PaymentMethod,
        product_id: impl Into<String>,
        price_id: impl Into<String>,
    ) {
        match method {
            PaymentMethod::Stripe => {
                self.stripe_product_id = Some(product_id.into());
                self.stripe_price_id = Some(price_id.into());
            }
            PaymentMethod::Paypal => {
                self.paypal_product_id = Some(product_id.into());
                self.paypal_price_id = Some(price_id.into());
            }
        }
        self.updated_at = Utc::now();
    }

    /// A provider counts as synced only when *both* external ids are present
    pub fn is_synced(&self, method: PaymentMethod) -> bool {
        let (product_id, price_id) = self.provider_refs(method);
        product_id.is_some() && price_id.is_some()
    }
}

/// A product definition as it appears in `config/products.toml`
#[derive(Debug, Clone, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Price in smallest currency unit
    pub price: i64,
    #[serde(default)]
    pub currency: Currency,
}

/// Seed catalog loaded from config at startup
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedCatalog {
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

impl SeedCatalog {
    /// Load catalog from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

impl From<&SeedProduct> for Product {
    fn from(seed: &SeedProduct) -> Self {
        let mut product = Product::new(seed.name.clone(), seed.price, seed.currency);
        product.description = seed.description.clone();
        product
    }
}
