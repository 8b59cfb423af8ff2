//! Coin ledger.
//!
//! All balance changes go through [`CoinLedger::transact`]. Each attempt
//! reads the account, asks the caller for a [`LedgerPlan`], refuses plans
//! that would overdraw the balance and then commits, in one atomic
//! `documents:commit`:
//!
//! - the new balance, guarded on the account's `updateTime`
//! - a [`CoinTransaction`] entry recording the delta
//! - any companion writes the plan carries, each with its own precondition
//!
//! If another writer wins the race the commit is rejected as a whole and
//! the plan is rebuilt from fresh reads, up to [`MAX_LEDGER_ATTEMPTS`]
//! times. A user's balance therefore always equals the sum of their
//! ledger deltas.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use rabbit_models::{CoinContext, CoinTransaction, User};

use crate::client::FirestoreClient;
use crate::coin_transaction_repo::transaction_write;
use crate::error::FirestoreError;
use crate::metrics::{record_ledger_commit, record_ledger_conflict};
use crate::types::{Versioned, Write};
use crate::user_repo::{balance_write, UserRepository};

/// Attempts before a contended operation gives up.
pub const MAX_LEDGER_ATTEMPTS: u32 = 5;

/// Linear backoff step between attempts (milliseconds).
const CONFLICT_BACKOFF_MS: u64 = 50;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Insufficient coins: balance {balance}, required {required}")]
    InsufficientCoins { balance: i64, required: i64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The plan refused to proceed (e.g. the target is no longer pending).
    #[error("{0}")]
    Rejected(String),

    /// The operation had already been applied; nothing was written.
    #[error("Already applied: {0}")]
    AlreadyApplied(String),

    #[error("Gave up after {attempts} conflicting attempts")]
    Conflict { attempts: u32 },

    #[error("Firestore error: {0}")]
    Firestore(#[from] FirestoreError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// A planned balance change plus the writes that must land with it.
#[derive(Debug, Clone)]
pub struct LedgerPlan {
    pub delta: i64,
    pub context: CoinContext,
    pub writes: Vec<Write>,
}

impl LedgerPlan {
    pub fn new(delta: i64, context: CoinContext) -> Self {
        Self {
            delta,
            context,
            writes: Vec::new(),
        }
    }

    pub fn with_write(mut self, write: Write) -> Self {
        self.writes.push(write);
        self
    }
}

/// Outcome of a committed ledger operation.
#[derive(Debug, Clone)]
pub struct LedgerReceipt {
    pub transaction: CoinTransaction,
    pub balance: i64,
}

#[derive(Clone)]
pub struct CoinLedger {
    client: FirestoreClient,
    users: UserRepository,
}

impl CoinLedger {
    pub fn new(client: FirestoreClient) -> Self {
        Self {
            users: UserRepository::new(client.clone()),
            client,
        }
    }

    /// Apply a balance change to `email` planned by `plan`.
    ///
    /// `plan` runs once per attempt against the freshly read account and
    /// should do its own reads, so its companion writes are guarded on
    /// versions from the same attempt.
    pub async fn transact<F, Fut>(&self, email: &str, plan: F) -> LedgerResult<LedgerReceipt>
    where
        F: FnMut(Versioned<User>) -> Fut,
        Fut: Future<Output = LedgerResult<LedgerPlan>>,
    {
        let mut operation = String::from("unplanned");
        let result = self.run(email, plan, &mut operation).await;

        match &result {
            Ok(receipt) => {
                record_ledger_commit(&operation, "committed");
                info!(
                    email = %email,
                    operation = %operation,
                    delta = receipt.transaction.delta,
                    balance = receipt.balance,
                    "Ledger transaction committed"
                );
            }
            Err(LedgerError::Conflict { attempts }) => {
                record_ledger_commit(&operation, "conflict");
                warn!(email = %email, operation = %operation, attempts, "Ledger transaction gave up");
            }
            Err(LedgerError::Firestore(e)) => {
                record_ledger_commit(&operation, "error");
                warn!(email = %email, operation = %operation, error = %e, "Ledger transaction failed");
            }
            Err(e) => {
                record_ledger_commit(&operation, "rejected");
                debug!(email = %email, operation = %operation, reason = %e, "Ledger transaction rejected");
            }
        }
        result
    }

    async fn run<F, Fut>(
        &self,
        email: &str,
        mut plan: F,
        operation: &mut String,
    ) -> LedgerResult<LedgerReceipt>
    where
        F: FnMut(Versioned<User>) -> Fut,
        Fut: Future<Output = LedgerResult<LedgerPlan>>,
    {
        for attempt in 1..=MAX_LEDGER_ATTEMPTS {
            let account = self
                .users
                .get_versioned(email)
                .await?
                .ok_or_else(|| LedgerError::UserNotFound(email.to_string()))?;
            let balance = account.value.coins;
            let update_time = account.update_time.clone();

            let LedgerPlan {
                delta,
                context,
                writes,
            } = plan(account).await?;
            *operation = context.operation_type.as_str().to_string();

            let new_balance = balance
                .checked_add(delta)
                .filter(|b| *b >= 0)
                .ok_or(LedgerError::InsufficientCoins {
                    balance,
                    required: -delta,
                })?;

            let transaction = context.to_transaction(email, delta, new_balance);
            let mut all = Vec::with_capacity(writes.len() + 2);
            all.push(balance_write(&self.client, email, new_balance, update_time.as_deref()));
            all.push(transaction_write(&self.client, &transaction));
            all.extend(writes);

            match self.client.commit(all).await {
                Ok(_) => {
                    return Ok(LedgerReceipt {
                        transaction,
                        balance: new_balance,
                    })
                }
                Err(e) if e.is_write_conflict() => {
                    debug!(
                        email = %email,
                        attempt,
                        error = %e,
                        "Ledger commit lost a race, re-planning"
                    );
                    record_ledger_conflict(operation);
                    backoff(attempt).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(LedgerError::Conflict {
            attempts: MAX_LEDGER_ATTEMPTS,
        })
    }

    /// Apply a fixed delta with no companion reads.
    pub async fn apply(
        &self,
        email: &str,
        delta: i64,
        context: CoinContext,
        writes: Vec<Write>,
    ) -> LedgerResult<LedgerReceipt> {
        self.transact(email, |_| {
            let plan = LedgerPlan {
                delta,
                context: context.clone(),
                writes: writes.clone(),
            };
            async move { Ok(plan) }
        })
        .await
    }
}

/// Build and commit a set of guarded writes, rebuilding them whenever the
/// commit loses a race.
///
/// `build` returns the writes plus the value to hand back on success. Any
/// error it returns ends the loop immediately.
pub async fn guarded_commit<T, F, Fut>(
    client: &FirestoreClient,
    operation: &str,
    mut build: F,
) -> LedgerResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LedgerResult<(Vec<Write>, T)>>,
{
    for attempt in 1..=MAX_LEDGER_ATTEMPTS {
        let (writes, value) = build().await?;

        match client.commit(writes).await {
            Ok(_) => return Ok(value),
            Err(e) if e.is_write_conflict() => {
                debug!(operation, attempt, error = %e, "Guarded commit lost a race, re-planning");
                record_ledger_conflict(operation);
                backoff(attempt).await;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(LedgerError::Conflict {
        attempts: MAX_LEDGER_ATTEMPTS,
    })
}

async fn backoff(attempt: u32) {
    if attempt < MAX_LEDGER_ATTEMPTS {
        tokio::time::sleep(Duration::from_millis(CONFLICT_BACKOFF_MS * attempt as u64)).await;
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod ledger_tests;
