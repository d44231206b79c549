use std::sync::Arc;

use crate::domain::catalog::{merge, CatalogPage, CatalogQuery};
use crate::domain::errors::DomainError;
use crate::domain::ports::{KeyValueStore, ProductSource};
use crate::domain::product::Product;

pub const PRODUCT_OVERRIDES_KEY: &str = "products";

/// Fixture products with admin edits layered on top.
pub struct CatalogStore<S> {
    fixture: S,
    overrides: Arc<dyn KeyValueStore>,
}

impl<S: ProductSource> CatalogStore<S> {
    pub fn new(fixture: S, overrides: Arc<dyn KeyValueStore>) -> Self {
        Self { fixture, overrides }
    }

    fn read_overrides(&self) -> Vec<Product> {
        let Some(raw) = self.overrides.get(PRODUCT_OVERRIDES_KEY) else {
            return Vec::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable product overrides: {}", e);
            Vec::new()
        })
    }

    pub fn products(&self) -> Result<Vec<Product>, DomainError> {
        Ok(merge(self.read_overrides(), self.fixture.load_all()?))
    }

    pub fn find(&self, id: &str) -> Result<Option<Product>, DomainError> {
        Ok(self.products()?.into_iter().find(|p| p.id == id))
    }

    pub fn query(&self, query: &CatalogQuery) -> Result<CatalogPage, DomainError> {
        Ok(query.run(self.products()?))
    }

    /// Stores an edited or new product in the override list.
    pub fn upsert(&self, product: Product) -> Result<Product, DomainError> {
        product.validate()?;
        let mut overrides = self.read_overrides();
        match overrides.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product.clone(),
            None => overrides.push(product.clone()),
        }
        self.overrides
            .set(PRODUCT_OVERRIDES_KEY, serde_json::to_string(&overrides)?);
        log::info!("Saved product {} to overrides", product.id);
        Ok(product)
    }
}
