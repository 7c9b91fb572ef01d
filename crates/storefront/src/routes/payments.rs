//! Payment route handlers.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::{BasketTokenCookie, RequireCustomer};
use crate::routes::basket::BasketView;
use crate::state::AppState;

/// `POST /payments` - initiate or refresh checkout for the caller's basket.
///
/// Creates the payment intent on first call and re-prices it on later calls;
/// the returned view carries the client secret the frontend needs to finish
/// payment. Requires an authenticated customer.
#[instrument(skip(state, token), fields(customer = %customer_id))]
pub async fn synchronize(
    State(state): State<AppState>,
    RequireCustomer(customer_id): RequireCustomer,
    BasketTokenCookie(token): BasketTokenCookie,
) -> Result<Json<BasketView>> {
    let basket = state.baskets().synchronize_intent(token.as_ref()).await?;
    Ok(Json(BasketView::from(&basket)))
}
