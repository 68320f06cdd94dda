use crate::contract::{Product, ProductFields, PRODUCT_NOT_FOUND_MESSAGE};
use crate::ids::IdGenerator;
use crate::store::{ProductStore, StoreUnavailable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductError {
    NotFound,
    Unavailable(StoreUnavailable),
}

impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => f.write_str(PRODUCT_NOT_FOUND_MESSAGE),
            Self::Unavailable(error) => write!(f, "product store unavailable: {error}"),
        }
    }
}

impl std::error::Error for ProductError {}

impl From<StoreUnavailable> for ProductError {
    fn from(error: StoreUnavailable) -> Self {
        Self::Unavailable(error)
    }
}

/// The five product operations over a store and an id source.
///
/// Holds no per-request state; one instance serves every invocation of a
/// warm Lambda container.
#[derive(Debug, Clone)]
pub struct ProductService<S, G> {
    store: S,
    ids: G,
}

impl<S: ProductStore, G: IdGenerator> ProductService<S, G> {
    pub fn new(store: S, ids: G) -> Self {
        Self { store, ids }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Full unbounded scan in store order.
    pub fn list(&self) -> Result<Vec<Product>, ProductError> {
        Ok(self.store.scan_all()?)
    }

    pub fn get(&self, id: &str) -> Result<Product, ProductError> {
        self.store.get(id)?.ok_or(ProductError::NotFound)
    }

    /// Stores the fields under a freshly generated id. Not idempotent.
    pub fn create(&self, fields: ProductFields) -> Result<Product, ProductError> {
        let product = Product::new(self.ids.next_id(), fields);
        self.store.put(&product)?;
        Ok(product)
    }

    /// Replaces all mutable fields of an existing product.
    ///
    /// The returned id is always `id`; an id carried in the request body has
    /// already been dropped during decoding, since ids are immutable.
    pub fn update(&self, id: &str, fields: &ProductFields) -> Result<Product, ProductError> {
        let updated = self
            .store
            .update_existing(id, fields)?
            .ok_or(ProductError::NotFound)?;
        Ok(Product::new(id, updated))
    }

    /// Removes a product and returns its values from before the delete.
    pub fn delete(&self, id: &str) -> Result<Product, ProductError> {
        self.store
            .delete_existing(id)?
            .ok_or(ProductError::NotFound)
    }
}
