//! `PostgreSQL`-backed product catalog with a read cache.
//!
//! Product rows change rarely relative to how often baskets read them, so
//! single-product lookups go through a short-lived moka cache. Listings hit
//! the database directly; they are already one query.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use sqlx::PgPool;

use tidepool_core::{Money, Product, ProductId};

use super::{ProductCatalog, ProductFilter, ProductSort, RepositoryError};

/// How long a cached product snapshot stays fresh.
const PRODUCT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Upper bound on cached products.
const PRODUCT_CACHE_CAPACITY: u64 = 1_000;

/// `PostgreSQL` implementation of [`ProductCatalog`].
#[derive(Clone)]
pub struct PgProductCatalog {
    pool: PgPool,
    cache: Cache<ProductId, Product>,
}

impl PgProductCatalog {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        let cache = Cache::builder()
            .time_to_live(PRODUCT_CACHE_TTL)
            .max_capacity(PRODUCT_CACHE_CAPACITY)
            .build();

        Self { pool, cache }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: String,
    price: i64,
    picture_url: String,
    brand: String,
    product_type: String,
    quantity_in_stock: i32,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: Money::from_cents(row.price),
            picture_url: row.picture_url,
            brand: row.brand,
            product_type: row.product_type,
            quantity_in_stock: row.quantity_in_stock,
        }
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, picture_url, brand, product_type, quantity_in_stock";

#[async_trait]
impl ProductCatalog for PgProductCatalog {
    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        if let Some(product) = self.cache.get(&id).await {
            return Ok(Some(product));
        }

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let product = Product::from(row);
                self.cache.insert(id, product.clone()).await;
                Ok(Some(product))
            }
            None => Ok(None),
        }
    }

    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let order = match filter.sort {
            ProductSort::Name => "name ASC",
            ProductSort::Price => "price ASC",
            ProductSort::PriceDesc => "price DESC",
        };

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM product
            WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR brand = $2)
              AND ($3::text IS NULL OR product_type = $3)
            ORDER BY {order}
            ",
        ))
        .bind(filter.search.as_deref())
        .bind(filter.brand.as_deref())
        .bind(filter.product_type.as_deref())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }
}
