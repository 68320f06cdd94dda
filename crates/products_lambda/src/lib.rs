//! AWS-oriented adapters and handlers for the products API.
//!
//! This crate owns runtime integration details (the API Gateway proxy
//! envelope, the DynamoDB-backed product store, environment configuration)
//! and delegates product semantics to `products_core`.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod logging;
