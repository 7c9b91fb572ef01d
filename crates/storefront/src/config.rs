//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TIDEPOOL_DATABASE_URL` - `PostgreSQL` connection string
//! - `TIDEPOOL_BASE_URL` - Public URL for the storefront
//! - `STRIPE_SECRET_KEY` - Payment provider secret key (`sk_...`)
//!
//! ## Optional
//! - `TIDEPOOL_HOST` - Bind address (default: 127.0.0.1)
//! - `TIDEPOOL_PORT` - Listen port (default: 3000)
//! - `STRIPE_API_BASE` - Payment provider API base URL (default: Stripe's)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

/// Blocklist of common placeholder patterns (case-insensitive).
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: Url,
    /// Payment provider configuration
    pub stripe: StripeConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Payment provider (Stripe) configuration.
///
/// Implements `Debug` manually to redact the secret key.
#[derive(Clone)]
pub struct StripeConfig {
    /// API base URL. Overridable so tests can point at a stub server.
    pub api_base: String,
    /// Secret API key (server-side only)
    pub secret_key: SecretString,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_base", &self.api_base)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the payment provider key fails shape validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_secret("TIDEPOOL_DATABASE_URL")?;
        let host = get_env_or_default("TIDEPOOL_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("TIDEPOOL_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("TIDEPOOL_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("TIDEPOOL_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("TIDEPOOL_BASE_URL")?
            .parse::<Url>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("TIDEPOOL_BASE_URL".to_string(), e.to_string())
            })?;

        let stripe = StripeConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            stripe,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the public origin is served over HTTPS.
    ///
    /// Controls the `Secure` attribute on the basket cookie.
    #[must_use]
    pub fn is_secure_origin(&self) -> bool {
        self.base_url.scheme() == "https"
    }
}

impl StripeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret_key = get_secret("STRIPE_SECRET_KEY")?;
        validate_stripe_key(&secret_key, "STRIPE_SECRET_KEY")?;

        Ok(Self {
            api_base: get_env_or_default("STRIPE_API_BASE", "https://api.stripe.com"),
            secret_key,
        })
    }
}

/// Validate the shape of a Stripe secret key.
///
/// Rejects keys that do not look like `sk_...` and keys containing obvious
/// placeholder text, so a misconfigured deployment fails at startup rather
/// than on the first checkout.
fn validate_stripe_key(key: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let exposed = key.expose_secret();

    if !exposed.starts_with("sk_") {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            "expected a secret key starting with sk_".to_string(),
        ));
    }

    let lowered = exposed.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lowered.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("contains placeholder text: {pattern}"),
            ));
        }
    }

    Ok(())
}

fn get_required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn get_env_or_default(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn get_secret(name: &str) -> Result<SecretString, ConfigError> {
    get_required_env(name).map(SecretString::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stripe_key_must_have_sk_prefix() {
        let key = SecretString::from("pk_live_123456");
        assert!(matches!(
            validate_stripe_key(&key, "STRIPE_SECRET_KEY"),
            Err(ConfigError::InsecureSecret(_, _))
        ));
    }

    #[test]
    fn stripe_key_rejects_placeholders() {
        let key = SecretString::from("sk_test_changeme");
        assert!(validate_stripe_key(&key, "STRIPE_SECRET_KEY").is_err());
    }

    #[test]
    fn stripe_key_accepts_plausible_key() {
        let key = SecretString::from("sk_test_4eC39HqLyjWDarjtT1zdp7dc");
        assert!(validate_stripe_key(&key, "STRIPE_SECRET_KEY").is_ok());
    }

    #[test]
    fn debug_redacts_secret_key() {
        let config = StripeConfig {
            api_base: "https://api.stripe.com".to_string(),
            secret_key: SecretString::from("sk_test_4eC39HqLyjWDarjtT1zdp7dc"),
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("4eC39"));
    }
}
