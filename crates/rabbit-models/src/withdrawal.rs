//! Worker withdrawal requests.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Exchange rate applied when converting coins back to money.
pub const COINS_PER_DOLLAR: i64 = 20;

/// Smallest withdrawal a worker may request.
pub const MIN_WITHDRAWAL_COINS: i64 = 200;

/// Convert a coin amount to US cents at the withdrawal rate (rounded down).
pub fn coins_to_cents(coins: i64) -> i64 {
    coins * 100 / COINS_PER_DOLLAR
}

/// Processing state of a withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(WithdrawalStatus::Pending),
            "approved" => Some(WithdrawalStatus::Approved),
            "rejected" => Some(WithdrawalStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A worker's request to convert coins into a real-world payout.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Withdrawal {
    pub id: String,
    pub worker_email: String,
    pub worker_name: String,
    pub withdrawal_coin: i64,
    pub withdrawal_amount_cents: i64,
    pub payment_system: String,
    pub account_number: String,
    #[serde(default)]
    pub status: WithdrawalStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

impl Withdrawal {
    pub fn new(
        worker_email: impl Into<String>,
        worker_name: impl Into<String>,
        withdrawal_coin: i64,
        payment_system: impl Into<String>,
        account_number: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            worker_email: worker_email.into(),
            worker_name: worker_name.into(),
            withdrawal_coin,
            withdrawal_amount_cents: coins_to_cents(withdrawal_coin),
            payment_system: payment_system.into(),
            account_number: account_number.into(),
            status: WithdrawalStatus::Pending,
            created_at: Utc::now(),
            processed_at: None,
        }
    }
}
