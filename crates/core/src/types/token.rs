//! Opaque basket identity tokens.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The opaque token that correlates a client with its basket.
///
/// Minted once when a basket is created, echoed back by the client on every
/// subsequent request (via a cookie), and never reassigned. The token carries
/// no meaning beyond equality; the server never parses it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BasketToken(String);

impl BasketToken {
    /// Mint a fresh random token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap a token echoed back by a client.
    #[must_use]
    pub fn from_string(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BasketToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_unique() {
        assert_ne!(BasketToken::generate(), BasketToken::generate());
    }

    #[test]
    fn round_trips_raw_value() {
        let token = BasketToken::from_string("abc-123");
        assert_eq!(token.as_str(), "abc-123");
        assert_eq!(token.to_string(), "abc-123");
    }
}
