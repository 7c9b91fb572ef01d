//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{PgBasketStore, PgProductCatalog, ProductCatalog};
use crate::services::payments::GatewayError;
use crate::services::{BasketService, StripeDiscounts, StripeGateway};

/// Error creating application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("payment gateway client: {0}")]
    Gateway(#[from] GatewayError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; gives handlers access to the reconciliation
/// service, the catalog, the pool, and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    baskets: BasketService,
    catalog: Arc<dyn ProductCatalog>,
}

impl AppState {
    /// Wire up the Postgres stores and Stripe clients behind the
    /// reconciliation service.
    ///
    /// # Errors
    ///
    /// Returns an error if a payment provider client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let gateway = StripeGateway::new(&config.stripe)?;
        let discounts = StripeDiscounts::new(&config.stripe)?;

        let catalog: Arc<dyn ProductCatalog> = Arc::new(PgProductCatalog::new(pool.clone()));
        let store = Arc::new(PgBasketStore::new(pool.clone()));
        let baskets = BasketService::new(
            store,
            catalog.clone(),
            Arc::new(gateway),
            Arc::new(discounts),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                baskets,
                catalog,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the basket reconciliation service.
    #[must_use]
    pub fn baskets(&self) -> &BasketService {
        &self.inner.baskets
    }

    /// Get a reference to the product catalog.
    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn ProductCatalog> {
        &self.inner.catalog
    }
}
