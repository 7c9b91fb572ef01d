//! Authentication boundary.
//!
//! Authentication itself lives upstream (an auth proxy terminates the session
//! and forwards the verified customer id in a trusted header). This extractor
//! only enforces that the header is present on routes that need a signed-in
//! caller, such as checkout initiation.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

/// Header the upstream auth layer sets after verifying the caller.
pub const CUSTOMER_ID_HEADER: &str = "x-customer-id";

/// Extractor that requires an authenticated customer.
///
/// # Example
///
/// ```rust,ignore
/// async fn checkout(RequireCustomer(customer_id): RequireCustomer) -> impl IntoResponse {
///     // customer_id is the upstream-verified identity
/// }
/// ```
pub struct RequireCustomer(pub String);

impl<S> FromRequestParts<S> for RequireCustomer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(CUSTOMER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| Self(value.to_owned()))
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(request: Request<()>) -> Result<RequireCustomer, AppError> {
        let (mut parts, ()) = request.into_parts();
        RequireCustomer::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let request = Request::builder().body(()).expect("request");
        assert!(matches!(
            extract(request).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn verified_header_passes_through() {
        let request = Request::builder()
            .header(CUSTOMER_ID_HEADER, "cust_42")
            .body(())
            .expect("request");
        let RequireCustomer(id) = extract(request).await.expect("authorized");
        assert_eq!(id, "cust_42");
    }
}
