//! Basket route handlers.
//!
//! The basket API is JSON over plain HTTP verbs; the client renders it.
//! Basket identity rides in the `basketId` cookie, issued once by `add_item`
//! when a new basket is minted and echoed by the client thereafter.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tidepool_core::{Basket, BasketItem, Coupon, Money, ProductId};

use crate::error::{AppError, Result};
use crate::middleware::{BasketTokenCookie, set_cookie_value};
use crate::state::AppState;

/// Basket line item as serialized to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketItemView {
    pub product_id: ProductId,
    pub name: String,
    /// Unit price in minor units.
    pub price: Money,
    pub picture_url: String,
    pub brand: String,
    #[serde(rename = "type")]
    pub product_type: String,
    pub quantity: u32,
}

/// Coupon terms as serialized to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponView {
    pub name: String,
    pub amount_off: Option<Money>,
    pub percent_off: Option<Decimal>,
    pub promotion_code: String,
}

/// Basket as serialized to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketView {
    pub basket_id: String,
    pub items: Vec<BasketItemView>,
    /// All amounts in minor units.
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub client_secret: Option<String>,
    pub payment_intent_id: Option<String>,
    pub coupon: Option<CouponView>,
}

impl From<&BasketItem> for BasketItemView {
    fn from(item: &BasketItem) -> Self {
        let product = item.product();
        Self {
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
            picture_url: product.picture_url.clone(),
            brand: product.brand.clone(),
            product_type: product.product_type.clone(),
            quantity: item.quantity(),
        }
    }
}

impl From<&Coupon> for CouponView {
    fn from(coupon: &Coupon) -> Self {
        Self {
            name: coupon.name.clone(),
            amount_off: coupon.amount_off,
            percent_off: coupon.percent_off,
            promotion_code: coupon.code.clone(),
        }
    }
}

impl From<&Basket> for BasketView {
    fn from(basket: &Basket) -> Self {
        let subtotal = basket.subtotal();
        let total = basket.total();

        Self {
            basket_id: basket.token().as_str().to_owned(),
            items: basket.items().iter().map(BasketItemView::from).collect(),
            subtotal,
            discount: subtotal.saturating_sub(total),
            total,
            client_secret: basket.client_secret().map(str::to_owned),
            payment_intent_id: basket.payment_intent_id().map(str::to_owned),
            coupon: basket.coupon().map(CouponView::from),
        }
    }
}

/// Item mutation query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemParams {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl ItemParams {
    fn validated(self) -> Result<Self> {
        if self.quantity == 0 {
            return Err(AppError::BadRequest(
                "Quantity must be greater than zero.".to_owned(),
            ));
        }
        Ok(self)
    }
}

/// `GET /basket` - current basket, or an empty response when none exists.
#[instrument(skip(state, token))]
pub async fn show(
    State(state): State<AppState>,
    BasketTokenCookie(token): BasketTokenCookie,
) -> Result<Response> {
    match state.baskets().get_basket(token.as_ref()).await? {
        Some(basket) => Ok(Json(BasketView::from(&basket)).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// `POST /basket?productId&quantity` - add an item, creating the basket (and
/// issuing its cookie) on first use.
#[instrument(skip(state, token))]
pub async fn add_item(
    State(state): State<AppState>,
    BasketTokenCookie(token): BasketTokenCookie,
    Query(params): Query<ItemParams>,
) -> Result<Response> {
    let params = params.validated()?;
    let update = state
        .baskets()
        .add_item(token.as_ref(), params.product_id, params.quantity)
        .await?;

    let view = BasketView::from(&update.basket);
    match update.minted {
        Some(minted) => {
            let cookie = set_cookie_value(&minted, state.config().is_secure_origin());
            Ok((
                StatusCode::CREATED,
                AppendHeaders([(SET_COOKIE, cookie)]),
                Json(view),
            )
                .into_response())
        }
        None => Ok((StatusCode::CREATED, Json(view)).into_response()),
    }
}

/// `DELETE /basket?productId&quantity` - remove a quantity of an item.
#[instrument(skip(state, token))]
pub async fn remove_item(
    State(state): State<AppState>,
    BasketTokenCookie(token): BasketTokenCookie,
    Query(params): Query<ItemParams>,
) -> Result<Json<BasketView>> {
    let params = params.validated()?;
    let basket = state
        .baskets()
        .remove_item(token.as_ref(), params.product_id, params.quantity)
        .await?;

    Ok(Json(BasketView::from(&basket)))
}

/// `POST /basket/{code}` - apply a promo code mid-checkout.
#[instrument(skip(state, token))]
pub async fn apply_coupon(
    State(state): State<AppState>,
    BasketTokenCookie(token): BasketTokenCookie,
    Path(code): Path<String>,
) -> Result<(StatusCode, Json<BasketView>)> {
    let basket = state.baskets().apply_coupon(token.as_ref(), &code).await?;
    Ok((StatusCode::CREATED, Json(BasketView::from(&basket))))
}

/// `DELETE /basket/remove-coupon` - detach the coupon mid-checkout.
#[instrument(skip(state, token))]
pub async fn remove_coupon(
    State(state): State<AppState>,
    BasketTokenCookie(token): BasketTokenCookie,
) -> Result<Json<BasketView>> {
    let basket = state.baskets().remove_coupon(token.as_ref()).await?;
    Ok(Json(BasketView::from(&basket)))
}

#[cfg(test)]
mod tests {
    use tidepool_core::{BasketToken, Product};

    use super::*;

    fn sample_basket() -> Basket {
        let mut basket = Basket::new(BasketToken::from_string("tok-1"));
        basket.add_item(
            Product {
                id: ProductId::new(7),
                name: "Wave Board".to_owned(),
                description: "test".to_owned(),
                price: Money::from_cents(1000),
                picture_url: "/img/7.png".to_owned(),
                brand: "Tidepool".to_owned(),
                product_type: "Boards".to_owned(),
                quantity_in_stock: 3,
            },
            2,
        );
        basket
    }

    #[test]
    fn view_reports_discount_against_subtotal() {
        let mut basket = sample_basket();
        basket.attach_coupon(Coupon {
            id: "co_1".to_owned(),
            code: "SAVE5".to_owned(),
            name: "$5 off".to_owned(),
            amount_off: Some(Money::from_cents(500)),
            percent_off: None,
        });

        let view = BasketView::from(&basket);
        assert_eq!(view.subtotal, Money::from_cents(2000));
        assert_eq!(view.discount, Money::from_cents(500));
        assert_eq!(view.total, Money::from_cents(1500));
        assert_eq!(
            view.coupon.map(|c| c.promotion_code),
            Some("SAVE5".to_owned())
        );
    }

    #[test]
    fn view_serializes_camel_case_for_the_client() {
        let view = BasketView::from(&sample_basket());
        let json = serde_json::to_value(&view).expect("serializable");

        assert_eq!(json["basketId"], "tok-1");
        assert_eq!(json["items"][0]["productId"], 7);
        assert_eq!(json["items"][0]["type"], "Boards");
        assert!(json["clientSecret"].is_null());
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let params = ItemParams {
            product_id: ProductId::new(7),
            quantity: 0,
        };
        assert!(matches!(
            params.validated(),
            Err(AppError::BadRequest(_))
        ));
    }
}
