//! Request-boundary extractors.
//!
//! Transport concerns (cookies, upstream auth headers) stay here so the
//! reconciliation service never sees them.

pub mod auth;
pub mod basket_token;

pub use auth::RequireCustomer;
pub use basket_token::{BASKET_COOKIE_NAME, BasketTokenCookie, set_cookie_value};
