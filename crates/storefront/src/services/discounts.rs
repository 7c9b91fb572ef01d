//! Promo code resolution.
//!
//! Maps a shopper-typed promo code to the provider's coupon terms. A code
//! that does not resolve is not an error at this layer; the reconciliation
//! service turns `None` into `InvalidCoupon`.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use tidepool_core::{Coupon, Money};

use crate::config::StripeConfig;
use crate::services::payments::{GatewayError, build_client};

/// Resolve promo codes to coupons.
#[async_trait]
pub trait CouponResolver: Send + Sync {
    /// Look up a promo code. `Ok(None)` means the code is unknown, inactive,
    /// or expired.
    async fn resolve(&self, code: &str) -> Result<Option<Coupon>, GatewayError>;
}

#[derive(Debug, Deserialize)]
struct PromotionCodeList {
    data: Vec<PromotionCode>,
}

#[derive(Debug, Deserialize)]
struct PromotionCode {
    code: String,
    coupon: CouponResponse,
}

#[derive(Debug, Deserialize)]
struct CouponResponse {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    amount_off: Option<i64>,
    #[serde(default)]
    percent_off: Option<Decimal>,
}

/// Stripe promotion-codes client.
#[derive(Clone)]
pub struct StripeDiscounts {
    client: reqwest::Client,
    api_base: String,
}

impl StripeDiscounts {
    /// Create a new discounts client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            client: build_client(config)?,
            api_base: config.api_base.clone(),
        })
    }
}

#[async_trait]
impl CouponResolver for StripeDiscounts {
    async fn resolve(&self, code: &str) -> Result<Option<Coupon>, GatewayError> {
        let url = format!("{}/v1/promotion_codes", self.api_base);
        let response = self
            .client
            .get(&url)
            .query(&[("code", code), ("active", "true"), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let list: PromotionCodeList = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;

        Ok(list.data.into_iter().next().map(|promo| Coupon {
            id: promo.coupon.id,
            code: promo.code,
            name: promo.coupon.name.unwrap_or_default(),
            amount_off: promo.coupon.amount_off.map(Money::from_cents),
            percent_off: promo.coupon.percent_off,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_code_payload_maps_to_coupon() {
        let payload = r#"{
            "data": [{
                "code": "SAVE5",
                "coupon": {"id": "co_1", "name": "$5 off", "amount_off": 500}
            }]
        }"#;
        let list: PromotionCodeList = serde_json::from_str(payload).expect("valid payload");
        let promo = list.data.into_iter().next().expect("one promotion code");

        assert_eq!(promo.code, "SAVE5");
        assert_eq!(promo.coupon.amount_off, Some(500));
        assert_eq!(promo.coupon.percent_off, None);
    }

    #[test]
    fn empty_list_resolves_to_no_coupon() {
        let list: PromotionCodeList = serde_json::from_str(r#"{"data": []}"#).expect("valid");
        assert!(list.data.is_empty());
    }
}
