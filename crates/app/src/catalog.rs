//! Product catalog.

use std::path::Path;

use async_trait::async_trait;
use mockall::automock;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;
use trolley::{
    fixtures::{CatalogFixture, FixtureError},
    products::{Product, ProductId},
};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    #[error("failed to load catalog fixture")]
    Fixture(#[from] FixtureError),
}

/// Read access to current product data.
#[automock]
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Look up a product by id. `Ok(None)` means the catalog has no such product.
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError>;
}

/// Catalog held in memory, usually seeded from a YAML fixture.
#[derive(Debug, Clone, Default)]
pub struct FixtureCatalog {
    products: FxHashMap<ProductId, Product>,
}

impl FixtureCatalog {
    #[must_use]
    pub fn new(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: products
                .into_iter()
                .map(|product| (product.id.clone(), product))
                .collect(),
        }
    }

    /// Build a catalog from YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or a product record is invalid.
    pub fn from_yaml_str(contents: &str) -> Result<Self, CatalogError> {
        let products = CatalogFixture::from_yaml_str(contents)?.into_products()?;

        Ok(Self::new(products))
    }

    /// Build a catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, or its contents are invalid.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let products = CatalogFixture::from_path(path)?.into_products()?;

        debug!(products = products.len(), "loaded catalog fixture");

        Ok(Self::new(products))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Products ordered by id.
    #[must_use]
    pub fn products(&self) -> Vec<&Product> {
        let mut products: Vec<_> = self.products.values().collect();
        products.sort_by(|a, b| a.id.cmp(&b.id));
        products
    }
}

#[async_trait]
impl ProductCatalog for FixtureCatalog {
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        Ok(self.products.get(id).cloned())
    }
}
