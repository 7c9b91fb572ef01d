//! Tidepool core library.
//!
//! Shared types and the basket domain model. Everything in this crate is pure
//! state and pure functions: no I/O, no async, no collaborator handles. The
//! storefront crate layers persistence and the payment provider on top.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod basket;
pub mod catalog;
pub mod types;

pub use basket::{Basket, BasketItem, Coupon, PaymentIntentRef};
pub use catalog::Product;
pub use types::{BasketToken, Money, ProductId};
