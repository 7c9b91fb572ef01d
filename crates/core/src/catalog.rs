//! Product snapshot type.

use serde::{Deserialize, Serialize};

use crate::types::{Money, ProductId};

/// A product as the storefront sees it.
///
/// Basket line items embed a snapshot of this shape, so a basket can be
/// rendered and priced without a second catalog round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// Unit price in minor units.
    pub price: Money,
    pub picture_url: String,
    pub brand: String,
    pub product_type: String,
    /// Stock on hand. Informational here; the basket does not reserve stock.
    pub quantity_in_stock: i32,
}

#[cfg(test)]
pub(crate) fn test_product(id: i32, price_cents: i64) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        description: "A test product".to_owned(),
        price: Money::from_cents(price_cents),
        picture_url: String::new(),
        brand: "Tidepool".to_owned(),
        product_type: "Boards".to_owned(),
        quantity_in_stock: 100,
    }
}
