//! Basket identity cookie handling.
//!
//! The basket token travels in a plain cookie: the client owns it, the server
//! trusts it, and there is no server-side session beyond the basket record
//! itself. The cookie is issued exactly once, when a basket is first created,
//! and the client echoes it on every later request.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header::COOKIE, request::Parts},
};

use tidepool_core::BasketToken;

/// Cookie name the client echoes back on every request.
pub const BASKET_COOKIE_NAME: &str = "basketId";

/// Basket continuity window: 30 days.
const BASKET_COOKIE_MAX_AGE_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Extractor for the basket token cookie, if the client presented one.
///
/// Never rejects; a missing or unreadable cookie is simply `None`, and the
/// service layer decides whether that matters for the operation.
#[derive(Debug, Clone)]
pub struct BasketTokenCookie(pub Option<BasketToken>);

impl<S> FromRequestParts<S> for BasketTokenCookie
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|header| find_cookie(header, BASKET_COOKIE_NAME));

        Ok(Self(token.map(BasketToken::from_string)))
    }
}

/// Find a cookie's value in a `Cookie` header line.
fn find_cookie(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_owned())
    })
}

/// Build the `Set-Cookie` value that hands a freshly minted token to the
/// client.
///
/// The cookie is essential for basket continuity (the feature does not work
/// without it), scoped to the whole site, kept away from scripts, and expires
/// with the basket's 30-day window.
#[must_use]
pub fn set_cookie_value(token: &BasketToken, secure: bool) -> String {
    let mut cookie = format!(
        "{BASKET_COOKIE_NAME}={token}; Max-Age={BASKET_COOKIE_MAX_AGE_SECONDS}; \
         Path=/; HttpOnly; SameSite=Lax"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
