//! Payment provider gateway.
//!
//! The provider (Stripe) is the sole authority on intent ids, client secrets,
//! and the charged amount. This module only mirrors those fields; it never
//! fabricates them. The reconciliation service decides whether to create or
//! update; this gateway just makes the calls.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use tidepool_core::Money;

use crate::config::StripeConfig;

/// Errors that can occur when talking to the payment provider.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Provider response could not be interpreted.
    #[error("parse error: {0}")]
    Parse(String),
}

/// A payment intent as mirrored from the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    /// Amount the provider will charge, in minor units.
    pub amount: Money,
}

/// Create/update access to the provider's payment intents.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a fresh intent for `amount`.
    async fn create_intent(&self, amount: Money) -> Result<PaymentIntent, GatewayError>;

    /// Re-price an existing intent. The id and client secret are stable
    /// across updates; only the amount moves.
    async fn update_intent(
        &self,
        intent_id: &str,
        amount: Money,
    ) -> Result<PaymentIntent, GatewayError>;
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: Option<String>,
    amount: i64,
}

impl TryFrom<IntentResponse> for PaymentIntent {
    type Error = GatewayError;

    fn try_from(response: IntentResponse) -> Result<Self, Self::Error> {
        let client_secret = response.client_secret.ok_or_else(|| {
            GatewayError::Parse(format!(
                "intent {} returned without a client secret",
                response.id
            ))
        })?;

        Ok(Self {
            id: response.id,
            client_secret,
            amount: Money::from_cents(response.amount),
        })
    }
}

/// Stripe payment-intents client.
#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    api_base: String,
}

impl StripeGateway {
    /// Create a new gateway client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, GatewayError> {
        let client = build_client(config)?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
        })
    }

    async fn post_intent(
        &self,
        url: &str,
        form: &[(&str, String)],
    ) -> Result<PaymentIntent, GatewayError> {
        let response = self.client.post(url).form(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let intent: IntentResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;

        PaymentIntent::try_from(intent)
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, amount: Money) -> Result<PaymentIntent, GatewayError> {
        let url = format!("{}/v1/payment_intents", self.api_base);
        let form = [
            ("amount", amount.cents().to_string()),
            ("currency", "usd".to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];

        self.post_intent(&url, &form).await
    }

    async fn update_intent(
        &self,
        intent_id: &str,
        amount: Money,
    ) -> Result<PaymentIntent, GatewayError> {
        let url = format!("{}/v1/payment_intents/{intent_id}", self.api_base);
        let form = [("amount", amount.cents().to_string())];

        self.post_intent(&url, &form).await
    }
}

/// Build a reqwest client with the provider's bearer auth pre-installed.
pub(crate) fn build_client(config: &StripeConfig) -> Result<reqwest::Client, GatewayError> {
    let mut headers = HeaderMap::new();

    let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
    let mut auth_header = HeaderValue::from_str(&auth_value)
        .map_err(|e| GatewayError::Parse(format!("invalid API key format: {e}")))?;
    auth_header.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth_header);

    Ok(reqwest::Client::builder().default_headers(headers).build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_response_requires_client_secret() {
        let response = IntentResponse {
            id: "pi_123".to_owned(),
            client_secret: None,
            amount: 1500,
        };
        assert!(matches!(
            PaymentIntent::try_from(response),
            Err(GatewayError::Parse(_))
        ));
    }

    #[test]
    fn intent_response_maps_amount_to_minor_units() {
        let response = IntentResponse {
            id: "pi_123".to_owned(),
            client_secret: Some("pi_123_secret".to_owned()),
            amount: 1500,
        };
        let intent = PaymentIntent::try_from(response).expect("valid intent");
        assert_eq!(intent.amount, Money::from_cents(1500));
        assert_eq!(intent.client_secret, "pi_123_secret");
    }
}
