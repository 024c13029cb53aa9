use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use sheets_parser::ProductCatalog;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::store::Store;

/// Shared by every source in the process. Loaded on first use, dropped only
/// by `invalidate`.
pub static PRODUCT_CATALOG: Lazy<CatalogCache> = Lazy::new(CatalogCache::new);

#[derive(Default)]
pub struct CatalogCache {
    inner: RwLock<Option<Arc<ProductCatalog>>>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Without a store (dry runs) the catalog is empty and every product
    /// classifies as `Unknown`.
    pub async fn get_or_load(&self, store: Option<&dyn Store>) -> Result<Arc<ProductCatalog>> {
        if let Some(catalog) = self.inner.read().await.as_ref() {
            return Ok(Arc::clone(catalog));
        }

        let mut guard = self.inner.write().await;
        if let Some(catalog) = guard.as_ref() {
            return Ok(Arc::clone(catalog));
        }

        let entries = match store {
            Some(store) => store
                .load_product_catalog()
                .await
                .context("Failed to load product catalog")?,
            None => Vec::new(),
        };
        log::info!("Product catalog loaded: {} entries", entries.len());

        let catalog = Arc::new(ProductCatalog::new(entries));
        *guard = Some(Arc::clone(&catalog));
        Ok(catalog)
    }

    pub async fn invalidate(&self) {
        *self.inner.write().await = None;
    }
}
