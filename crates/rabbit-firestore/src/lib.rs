//! Firestore REST API client.
//!
//! This crate provides:
//! - A REST client with token caching, retries and atomic commits
//! - Typed repositories for users, tasks, submissions, withdrawals,
//!   payments, coin transactions and notifications
//! - The coin ledger that every balance change goes through
//! - Service account authentication via gcp_auth, or the local emulator

pub mod client;
pub mod coin_transaction_repo;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod notification_repo;
pub mod payment_repo;
pub mod retry;
pub mod submission_repo;
pub mod task_repo;
pub mod token_cache;
pub mod types;
pub mod user_repo;
pub mod withdrawal_repo;

pub use client::{FirestoreClient, FirestoreConfig};
pub use coin_transaction_repo::{split_cursor, CoinTransactionRepository};
pub use error::{FirestoreError, FirestoreResult};
pub use ledger::{
    guarded_commit, CoinLedger, LedgerError, LedgerPlan, LedgerReceipt, LedgerResult,
    MAX_LEDGER_ATTEMPTS,
};
pub use notification_repo::{notification_write, NotificationRepository};
pub use payment_repo::PaymentRepository;
pub use submission_repo::{SubmissionPage, SubmissionRepository};
pub use task_repo::{TaskRepository, TaskTextUpdate};
pub use types::{Document, FromFirestoreValue, Precondition, ToFirestoreValue, Value, Versioned, Write};
pub use user_repo::UserRepository;
pub use withdrawal_repo::WithdrawalRepository;
