//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                - Liveness check
//! GET    /health/ready          - Readiness check (verifies database)
//!
//! # Catalog
//! GET    /products              - Product listing (searchTerm, brand, type, orderBy)
//! GET    /products/{id}         - Product detail
//!
//! # Basket (identified by the basketId cookie)
//! GET    /basket                - Current basket, 204 when none
//! POST   /basket                - Add item (?productId&quantity); issues cookie on create
//! DELETE /basket                - Remove item (?productId&quantity)
//! POST   /basket/{code}         - Apply promo code (checkout must be in progress)
//! DELETE /basket/remove-coupon  - Remove the attached coupon
//!
//! # Payments (requires authenticated customer)
//! POST   /payments              - Create or re-price the basket's payment intent
//! ```

pub mod basket;
pub mod payments;
pub mod products;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

/// Create the basket routes router.
pub fn basket_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(basket::show)
                .post(basket::add_item)
                .delete(basket::remove_item),
        )
        .route("/remove-coupon", delete(basket::remove_coupon))
        .route("/{code}", post(basket::apply_coupon))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/products", product_routes())
        .nest("/basket", basket_routes())
        .route("/payments", post(payments::synchronize))
}
