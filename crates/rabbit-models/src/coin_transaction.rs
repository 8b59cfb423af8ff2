//! Coin ledger data models.
//!
//! Every change to a user's coin balance is recorded as a transaction with
//! the signed delta and the resulting balance, so the history of a user sums
//! to their current balance.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reason a balance changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CoinOperationType {
    /// Coins granted at registration
    SignupBonus,
    /// Coins reserved when a creator posts a task
    TaskCreated,
    /// Unused task coins returned to the creator
    TaskRefund,
    /// Payout to a worker for an approved submission
    SubmissionApproved,
    /// Coins bought through the payment provider
    Purchase,
    /// Coins removed by an approved withdrawal
    Withdrawal,
    /// Manual admin correction
    AdminAdjustment,
}

impl CoinOperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignupBonus => "signup_bonus",
            Self::TaskCreated => "task_created",
            Self::TaskRefund => "task_refund",
            Self::SubmissionApproved => "submission_approved",
            Self::Purchase => "purchase",
            Self::Withdrawal => "withdrawal",
            Self::AdminAdjustment => "admin_adjustment",
        }
    }

    /// Returns a human-readable label for the operation type.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SignupBonus => "Signup Bonus",
            Self::TaskCreated => "Task Created",
            Self::TaskRefund => "Task Refund",
            Self::SubmissionApproved => "Submission Approved",
            Self::Purchase => "Coin Purchase",
            Self::Withdrawal => "Withdrawal",
            Self::AdminAdjustment => "Admin Adjustment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "signup_bonus" => Some(Self::SignupBonus),
            "task_created" => Some(Self::TaskCreated),
            "task_refund" => Some(Self::TaskRefund),
            "submission_approved" => Some(Self::SubmissionApproved),
            "purchase" => Some(Self::Purchase),
            "withdrawal" => Some(Self::Withdrawal),
            "admin_adjustment" => Some(Self::AdminAdjustment),
            _ => None,
        }
    }
}

/// A single ledger entry, stored under `users/{email}/coin_transactions`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CoinTransaction {
    pub id: String,

    pub email: String,

    pub operation_type: CoinOperationType,

    /// Signed change applied to the balance
    pub delta: i64,

    /// Balance immediately after this entry
    pub balance_after: i64,

    pub description: String,

    /// Task, submission, withdrawal or payment this entry belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl CoinTransaction {
    pub fn new(
        email: impl Into<String>,
        operation_type: CoinOperationType,
        delta: i64,
        description: impl Into<String>,
        balance_after: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.into(),
            operation_type,
            delta,
            balance_after,
            description: description.into(),
            reference_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Set the reference ID if Some, otherwise no-op.
    pub fn with_optional_reference(mut self, reference_id: Option<String>) -> Self {
        if let Some(r) = reference_id {
            self.reference_id = Some(r);
        }
        self
    }
}

/// What a balance change is for. Passed into the ledger alongside the delta.
#[derive(Debug, Clone)]
pub struct CoinContext {
    pub operation_type: CoinOperationType,
    pub description: String,
    pub reference_id: Option<String>,
}

impl CoinContext {
    pub fn new(operation_type: CoinOperationType, description: impl Into<String>) -> Self {
        Self {
            operation_type,
            description: description.into(),
            reference_id: None,
        }
    }

    /// Set the referenced document id.
    pub fn with_reference(mut self, reference_id: impl Into<String>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    /// Build the ledger entry for `email` once the new balance is known.
    pub fn to_transaction(&self, email: &str, delta: i64, balance_after: i64) -> CoinTransaction {
        CoinTransaction::new(
            email,
            self.operation_type,
            delta,
            self.description.clone(),
            balance_after,
        )
        .with_optional_reference(self.reference_id.clone())
    }
}
