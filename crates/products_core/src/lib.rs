//! Product resource domain primitives.
//!
//! This crate owns the product contract, the route table, the store
//! capability trait and the operations built on it. It intentionally
//! excludes AWS SDK and Lambda runtime concerns so everything here can be
//! exercised against `InMemoryProductStore`.

pub mod contract;
pub mod ids;
pub mod routing;
pub mod service;
pub mod store;
