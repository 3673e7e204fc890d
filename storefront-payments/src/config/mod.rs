//! Configuration module for storefront-payments.

use secrecy::{ExposeSecret, Secret};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub urls: UrlConfig,
    pub paystack: PaystackConfig,
    pub stripe: StripeConfig,
    pub provider_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Origins used to build redirect and callback URLs.
#[derive(Debug, Clone)]
pub struct UrlConfig {
    /// Shopper-facing storefront origin, e.g. `https://shop.example.com`.
    pub site_url: String,
    /// Origin this service is reachable at from the shopper's browser.
    pub public_api_url: String,
}

impl UrlConfig {
    pub fn site(&self, path: &str) -> String {
        format!("{}{}", self.site_url.trim_end_matches('/'), path)
    }

    pub fn public_api(&self, path: &str) -> String {
        format!("{}{}", self.public_api_url.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Clone)]
pub struct PaystackConfig {
    /// Secret key: authenticates API calls and keys the webhook HMAC.
    pub secret_key: Secret<String>,
    pub api_base_url: String,
}

impl PaystackConfig {
    pub fn is_configured(&self) -> bool {
        !self.secret_key.expose_secret().is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: Secret<String>,
    pub webhook_secret: Secret<String>,
    pub api_base_url: String,
    pub webhook_tolerance_secs: i64,
}

impl StripeConfig {
    pub fn is_configured(&self) -> bool {
        !self.secret_key.expose_secret().is_empty()
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl StorefrontConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        Ok(Self {
            common,
            service_name: env_or("SERVICE_NAME", "storefront-payments"),
            log_level: env_or("LOG_LEVEL", "info,storefront_payments=debug,sqlx=warn"),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: Secret::new(env::var("DATABASE_URL").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required"))
                })?),
                max_connections: env_parse_or("DATABASE_MAX_CONNECTIONS", 10),
                min_connections: env_parse_or("DATABASE_MIN_CONNECTIONS", 2),
            },
            urls: UrlConfig {
                site_url: env_or("SITE_URL", "http://localhost:3000"),
                public_api_url: env_or("PUBLIC_API_URL", "http://localhost:8080"),
            },
            paystack: PaystackConfig {
                secret_key: Secret::new(env_or("PAYSTACK_SECRET_KEY", "")),
                api_base_url: env_or("PAYSTACK_API_BASE_URL", "https://api.paystack.co"),
            },
            stripe: StripeConfig {
                secret_key: Secret::new(env_or("STRIPE_SECRET_KEY", "")),
                webhook_secret: Secret::new(env_or("STRIPE_WEBHOOK_SECRET", "")),
                api_base_url: env_or("STRIPE_API_BASE_URL", "https://api.stripe.com"),
                webhook_tolerance_secs: env_parse_or("STRIPE_WEBHOOK_TOLERANCE_SECS", 300),
            },
            provider_timeout: Duration::from_secs(env_parse_or("PROVIDER_TIMEOUT_SECS", 15)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_helpers_join_without_double_slash() {
        let urls = UrlConfig {
            site_url: "https://shop.example.com/".to_string(),
            public_api_url: "https://api.example.com".to_string(),
        };
        assert_eq!(
            urls.site("/checkout/success"),
            "https://shop.example.com/checkout/success"
        );
        assert_eq!(
            urls.public_api("/api/payments/paystack/callback"),
            "https://api.example.com/api/payments/paystack/callback"
        );
    }

    #[test]
    fn empty_keys_are_not_configured() {
        let paystack = PaystackConfig {
            secret_key: Secret::new(String::new()),
            api_base_url: "https://api.paystack.co".to_string(),
        };
        assert!(!paystack.is_configured());

        let stripe = StripeConfig {
            secret_key: Secret::new("sk_test_123".to_string()),
            webhook_secret: Secret::new("whsec_123".to_string()),
            api_base_url: "https://api.stripe.com".to_string(),
            webhook_tolerance_secs: 300,
        };
        assert!(stripe.is_configured());
    }
}
