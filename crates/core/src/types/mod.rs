//! Shared primitive types.

pub mod id;
pub mod money;
pub mod token;

pub use id::ProductId;
pub use money::Money;
pub use token::BasketToken;
