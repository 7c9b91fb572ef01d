//! Unified error handling with Sentry integration.
//!
//! Every route handler returns `Result<T, AppError>`. Basket and payment
//! failures map to a `400` with a human-readable message and are safe for the
//! client to retry; infrastructure failures map to `500` and are captured to
//! Sentry before responding. No failure is fatal to the process, and no
//! operation mutates further state after its first failure.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use tidepool_core::ProductId;

use crate::db::RepositoryError;
use crate::services::payments::GatewayError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// No basket resolves for the presented token.
    #[error("basket not found")]
    BasketNotFound,

    /// The requested product does not exist in the catalog.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// The promo code did not resolve to a live coupon.
    #[error("invalid coupon: {0}")]
    InvalidCoupon(String),

    /// A precondition on the checkout/coupon flow was not met.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// The payment provider call failed or returned no usable result.
    #[error("payment gateway error: {0}")]
    PaymentGateway(#[from] GatewayError),

    /// The store commit affected no records.
    #[error("persistence failure: {0}")]
    Persistence(RepositoryError),

    /// Database read failed.
    #[error("database error: {0}")]
    Database(#[from] RepositoryError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("unauthorized")]
    Unauthorized,

    /// Bad request from client.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server-side and provider failures to Sentry
        if matches!(
            self,
            Self::Database(_) | Self::Internal(_) | Self::PaymentGateway(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BasketNotFound
            | Self::ProductNotFound(_)
            | Self::InvalidCoupon(_)
            | Self::InvalidState(_)
            | Self::PaymentGateway(_)
            | Self::Persistence(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::BasketNotFound => "Cannot find basket for this request.".to_string(),
            Self::ProductNotFound(_) => "Cannot find product to add to basket.".to_string(),
            Self::InvalidCoupon(_) => "Invalid coupon.".to_string(),
            Self::InvalidState(msg) => (*msg).to_string(),
            Self::PaymentGateway(_) => {
                "Problem communicating with the payment provider.".to_string()
            }
            Self::Persistence(_) => "Problem updating the basket.".to_string(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::Unauthorized => "Authentication required.".to_string(),
            Self::BadRequest(msg) => msg.clone(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
