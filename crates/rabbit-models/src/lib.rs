//! Shared data models for the Task Rabbit backend.
//!
//! This crate provides Serde-serializable types for:
//! - Users, roles and their coin balances
//! - Tasks and worker submissions
//! - Withdrawals, coin packages and payments
//! - Coin ledger transactions and notifications

pub mod coin_transaction;
pub mod notification;
pub mod payment;
pub mod submission;
pub mod task;
pub mod user;
pub mod withdrawal;

// Re-export common types
pub use coin_transaction::{CoinContext, CoinOperationType, CoinTransaction};
pub use notification::Notification;
pub use payment::{CoinPackage, Payment, COIN_PACKAGES};
pub use submission::{Submission, SubmissionStatus};
pub use task::{total_cost, Task, TaskId};
pub use user::{
    normalize_email, UnknownRole, User, UserRole, CREATOR_SIGNUP_COINS, WORKER_SIGNUP_COINS,
};
pub use withdrawal::{
    coins_to_cents, Withdrawal, WithdrawalStatus, COINS_PER_DOLLAR, MIN_WITHDRAWAL_COINS,
};
