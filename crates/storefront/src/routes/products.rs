//! Product catalog route handlers.
//!
//! Read-only browsing; catalog management happens elsewhere.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tidepool_core::{Money, Product, ProductId};

use crate::db::{ProductFilter, ProductSort};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Product as serialized to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// Unit price in minor units.
    pub price: Money,
    pub picture_url: String,
    pub brand: String,
    #[serde(rename = "type")]
    pub product_type: String,
    pub quantity_in_stock: i32,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            picture_url: product.picture_url,
            brand: product.brand,
            product_type: product.product_type,
            quantity_in_stock: product.quantity_in_stock,
        }
    }
}

/// Catalog listing query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub search_term: Option<String>,
    pub brand: Option<String>,
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    pub order_by: Option<String>,
}

impl From<ListParams> for ProductFilter {
    fn from(params: ListParams) -> Self {
        let sort = match params.order_by.as_deref() {
            Some("price") => ProductSort::Price,
            Some("priceDesc") => ProductSort::PriceDesc,
            _ => ProductSort::Name,
        };

        Self {
            search: params.search_term.filter(|s| !s.is_empty()),
            brand: params.brand.filter(|s| !s.is_empty()),
            product_type: params.product_type.filter(|s| !s.is_empty()),
            sort,
        }
    }
}

/// `GET /products` - catalog listing with optional search and sort.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ProductView>>> {
    let products = state.catalog().list(&params.into()).await?;
    Ok(Json(products.into_iter().map(ProductView::from).collect()))
}

/// `GET /products/{id}` - product detail.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductView>> {
    let product = state
        .catalog()
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    Ok(Json(ProductView::from(product)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_by_maps_to_sort() {
        let filter: ProductFilter = ListParams {
            order_by: Some("priceDesc".to_owned()),
            ..ListParams::default()
        }
        .into();
        assert_eq!(filter.sort, ProductSort::PriceDesc);

        let filter: ProductFilter = ListParams::default().into();
        assert_eq!(filter.sort, ProductSort::Name);
    }

    #[test]
    fn blank_filters_are_dropped() {
        let filter: ProductFilter = ListParams {
            search_term: Some(String::new()),
            brand: Some("Tidepool".to_owned()),
            ..ListParams::default()
        }
        .into();

        assert!(filter.search.is_none());
        assert_eq!(filter.brand.as_deref(), Some("Tidepool"));
    }
}
