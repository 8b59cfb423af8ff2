//! Payment provider configuration.

use std::time::Duration;

use crate::error::{PaymentError, PaymentResult};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    /// Signing secret for webhook payloads (`whsec_...`).
    pub webhook_secret: Option<String>,
    pub api_base: String,
    /// ISO currency code charged for coin packages.
    pub currency: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl StripeConfig {
    pub fn from_env() -> PaymentResult<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| PaymentError::NotConfigured("STRIPE_SECRET_KEY is not set".into()))?;

        Ok(Self {
            secret_key,
            webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            api_base: std::env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            currency: std::env::var("PAYMENT_CURRENCY")
                .map(|c| c.to_lowercase())
                .unwrap_or_else(|_| "usd".to_string()),
            timeout: Duration::from_secs(
                std::env::var("STRIPE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(20),
            ),
            max_retries: 2,
        })
    }
}
