//! Business services.
//!
//! - [`basket`] - the basket reconciliation service (the storefront's core)
//! - [`payments`] - payment provider gateway (Stripe payment intents)
//! - [`discounts`] - promo code resolution (Stripe promotion codes)

pub mod basket;
pub mod discounts;
pub mod payments;

pub use basket::{BasketService, BasketUpdate, LoadedBasket};
pub use discounts::{CouponResolver, StripeDiscounts};
pub use payments::{PaymentGateway, PaymentIntent, StripeGateway};
