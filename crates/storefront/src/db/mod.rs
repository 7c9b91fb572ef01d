//! Persistence boundary for the storefront.
//!
//! The reconciliation service talks to storage through the [`BasketStore`] and
//! [`ProductCatalog`] traits; `PostgreSQL` implementations live in
//! [`baskets`] and [`products`]. Tests swap in in-memory fakes.
//!
//! # Tables
//!
//! - `product` - catalog (seeded via `tidepool-cli seed`)
//! - `basket` - basket record keyed by its opaque token
//! - `basket_item` - line items, insertion-ordered via a position column
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p tidepool-cli -- migrate
//! ```

pub mod baskets;
pub mod products;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use tidepool_core::{Basket, BasketToken, Product, ProductId};

pub use baskets::PgBasketStore;
pub use products::PgProductCatalog;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// A write affected no records.
    #[error("no records affected")]
    NothingPersisted,
}

/// Transactional persistence for baskets.
///
/// Contract: `save` commits the whole basket (record plus line items) as a
/// single transaction, or not at all. There is no in-process basket state;
/// every operation loads, mutates, and saves.
#[async_trait]
pub trait BasketStore: Send + Sync {
    /// Load the basket for a token, including items with product snapshots.
    async fn load(&self, token: &BasketToken) -> Result<Option<Basket>, RepositoryError>;

    /// Persist the basket atomically. A commit that touches no basket record
    /// fails with [`RepositoryError::NothingPersisted`].
    async fn save(&self, basket: &Basket) -> Result<(), RepositoryError>;
}

/// How product listings are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    /// Alphabetical by name.
    #[default]
    Name,
    /// Cheapest first.
    Price,
    /// Most expensive first.
    PriceDesc,
}

/// Catalog listing filter.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Case-insensitive substring match on the product name.
    pub search: Option<String>,
    pub brand: Option<String>,
    pub product_type: Option<String>,
    pub sort: ProductSort,
}

/// Read-only product catalog.
///
/// Catalog management is a separate concern; the storefront only reads.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
