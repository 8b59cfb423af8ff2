//! Coin packages and card payments.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A purchasable bundle of coins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub struct CoinPackage {
    pub id: &'static str,
    pub coins: i64,
    pub price_cents: i64,
}

/// Fixed coin package catalogue.
pub const COIN_PACKAGES: [CoinPackage; 4] = [
    CoinPackage {
        id: "starter",
        coins: 10,
        price_cents: 100,
    },
    CoinPackage {
        id: "standard",
        coins: 150,
        price_cents: 1_000,
    },
    CoinPackage {
        id: "premium",
        coins: 500,
        price_cents: 2_000,
    },
    CoinPackage {
        id: "ultimate",
        coins: 1_000,
        price_cents: 3_500,
    },
];

impl CoinPackage {
    /// Look up a package by id.
    pub fn find(id: &str) -> Option<&'static CoinPackage> {
        COIN_PACKAGES.iter().find(|p| p.id == id)
    }
}

/// A completed card payment. The id is the provider's payment-intent id,
/// which makes crediting a payment idempotent.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Payment {
    pub id: String,
    pub email: String,
    pub package_id: String,
    pub coins: i64,
    pub amount_cents: i64,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        intent_id: impl Into<String>,
        email: impl Into<String>,
        package: &CoinPackage,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id: intent_id.into(),
            email: email.into(),
            package_id: package.id.to_string(),
            coins: package.coins,
            amount_cents: package.price_cents,
            currency: currency.into(),
            status: "succeeded".to_string(),
            created_at: Utc::now(),
        }
    }
}
