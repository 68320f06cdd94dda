use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::contract::{Product, ProductFields};

/// Capability set of the single-key product table.
///
/// `update_existing` and `delete_existing` are conditional: each must check
/// for the key and write in one indivisible store operation, returning
/// `Ok(None)` when the key is absent without touching the table.
pub trait ProductStore {
    fn scan_all(&self) -> Result<Vec<Product>, StoreUnavailable>;

    fn get(&self, id: &str) -> Result<Option<Product>, StoreUnavailable>;

    fn put(&self, product: &Product) -> Result<(), StoreUnavailable>;

    fn update_existing(
        &self,
        id: &str,
        fields: &ProductFields,
    ) -> Result<Option<ProductFields>, StoreUnavailable>;

    fn delete_existing(&self, id: &str) -> Result<Option<Product>, StoreUnavailable>;
}

/// Backend failure other than key absence. Never mapped to a client error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreUnavailable {
    message: String,
}

impl StoreUnavailable {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for StoreUnavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StoreUnavailable {}

#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    products: Mutex<HashMap<String, Product>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let products = products
            .into_iter()
            .map(|product| (product.id.clone(), product))
            .collect();
        Self {
            products: Mutex::new(products),
        }
    }

    pub fn len(&self) -> Result<usize, StoreUnavailable> {
        Ok(self.table()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreUnavailable> {
        Ok(self.table()?.is_empty())
    }

    pub fn contains(&self, id: &str) -> Result<bool, StoreUnavailable> {
        Ok(self.table()?.contains_key(id))
    }

    fn table(&self) -> Result<MutexGuard<'_, HashMap<String, Product>>, StoreUnavailable> {
        self.products
            .lock()
            .map_err(|_| StoreUnavailable::new("in-memory product table lock poisoned"))
    }
}

impl ProductStore for InMemoryProductStore {
    fn scan_all(&self) -> Result<Vec<Product>, StoreUnavailable> {
        Ok(self.table()?.values().cloned().collect())
    }

    fn get(&self, id: &str) -> Result<Option<Product>, StoreUnavailable> {
        Ok(self.table()?.get(id).cloned())
    }

    fn put(&self, product: &Product) -> Result<(), StoreUnavailable> {
        self.table()?.insert(product.id.clone(), product.clone());
        Ok(())
    }

    fn update_existing(
        &self,
        id: &str,
        fields: &ProductFields,
    ) -> Result<Option<ProductFields>, StoreUnavailable> {
        let mut table = self.table()?;
        let Some(existing) = table.get_mut(id) else {
            return Ok(None);
        };
        existing.fields = fields.clone();
        Ok(Some(existing.fields.clone()))
    }

    fn delete_existing(&self, id: &str) -> Result<Option<Product>, StoreUnavailable> {
        Ok(self.table()?.remove(id))
    }
}
