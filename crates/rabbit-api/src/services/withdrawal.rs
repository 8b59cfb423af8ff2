//! Worker withdrawals. Coins leave the balance only when an admin approves.

use tracing::info;

use rabbit_firestore::{
    guarded_commit, notification_write, CoinLedger, FirestoreClient, LedgerError, LedgerPlan,
    LedgerReceipt, WithdrawalRepository,
};
use rabbit_models::{
    coins_to_cents, CoinContext, CoinOperationType, Notification, User, Withdrawal,
    WithdrawalStatus, MIN_WITHDRAWAL_COINS,
};

use crate::error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct WithdrawalService {
    client: FirestoreClient,
    ledger: CoinLedger,
    withdrawals: WithdrawalRepository,
}

impl WithdrawalService {
    pub fn new(client: FirestoreClient, ledger: CoinLedger) -> Self {
        Self {
            withdrawals: WithdrawalRepository::new(client.clone()),
            client,
            ledger,
        }
    }

    pub fn withdrawals(&self) -> &WithdrawalRepository {
        &self.withdrawals
    }

    /// File a pending withdrawal request.
    ///
    /// The balance is checked here but not reserved; approval re-checks it.
    pub async fn request(
        &self,
        worker: &User,
        withdrawal_coin: i64,
        payment_system: &str,
        account_number: &str,
    ) -> ApiResult<Withdrawal> {
        if withdrawal_coin < MIN_WITHDRAWAL_COINS {
            return Err(ApiError::bad_request(format!(
                "Minimum withdrawal is {} coins",
                MIN_WITHDRAWAL_COINS
            )));
        }
        if withdrawal_coin > worker.coins {
            return Err(ApiError::InsufficientCoins {
                balance: worker.coins,
                required: withdrawal_coin,
            });
        }

        let withdrawal = Withdrawal::new(
            &worker.email,
            &worker.name,
            withdrawal_coin,
            payment_system,
            account_number,
        );
        self.withdrawals.create(&withdrawal).await?;
        Ok(withdrawal)
    }

    /// Approve a pending request, debiting the worker in the same commit.
    pub async fn approve(&self, admin: &User, id: &str) -> ApiResult<LedgerReceipt> {
        let withdrawal = self.pending(id).await?;

        let withdrawals = &self.withdrawals;
        let client = &self.client;
        let receipt = self
            .ledger
            .transact(&withdrawal.worker_email, move |_| async move {
                let current = withdrawals
                    .get_versioned(id)
                    .await?
                    .ok_or_else(|| LedgerError::NotFound("Withdrawal not found".to_string()))?;
                let w = &current.value;
                if w.status != WithdrawalStatus::Pending {
                    return Err(LedgerError::Rejected(
                        "Withdrawal has already been processed".to_string(),
                    ));
                }

                let context = CoinContext::new(
                    CoinOperationType::Withdrawal,
                    format!("Withdrawal via {}", w.payment_system),
                )
                .with_reference(id);
                let notification = Notification::new(
                    format!(
                        "Your withdrawal of {} coins (${:.2}) has been approved",
                        w.withdrawal_coin,
                        coins_to_cents(w.withdrawal_coin) as f64 / 100.0
                    ),
                    "/dashboard/withdrawals",
                );

                Ok(LedgerPlan::new(-w.withdrawal_coin, context)
                    .with_write(withdrawals.review_write(
                        id,
                        WithdrawalStatus::Approved,
                        current.update_time.as_deref(),
                    ))
                    .with_write(notification_write(client, &w.worker_email, &notification)))
            })
            .await?;

        info!(
            withdrawal_id = %id,
            worker = %withdrawal.worker_email,
            approved_by = %admin.email,
            coins = -receipt.transaction.delta,
            "Withdrawal approved"
        );
        Ok(receipt)
    }

    /// Reject a pending request. No coins move.
    pub async fn reject(&self, admin: &User, id: &str) -> ApiResult<Withdrawal> {
        self.pending(id).await?;

        let withdrawals = &self.withdrawals;
        let client = &self.client;
        let rejected = guarded_commit(client, "withdrawal_reject", move || async move {
            let current = withdrawals
                .get_versioned(id)
                .await?
                .ok_or_else(|| LedgerError::NotFound("Withdrawal not found".to_string()))?;
            if current.value.status != WithdrawalStatus::Pending {
                return Err(LedgerError::Rejected(
                    "Withdrawal has already been processed".to_string(),
                ));
            }

            let w = current.value;
            let notification = Notification::new(
                format!("Your withdrawal of {} coins was rejected", w.withdrawal_coin),
                "/dashboard/withdrawals",
            );
            let writes = vec![
                withdrawals.review_write(id, WithdrawalStatus::Rejected, current.update_time.as_deref()),
                notification_write(client, &w.worker_email, &notification),
            ];
            Ok((
                writes,
                Withdrawal {
                    status: WithdrawalStatus::Rejected,
                    processed_at: Some(chrono::Utc::now()),
                    ..w
                },
            ))
        })
        .await?;

        info!(withdrawal_id = %id, rejected_by = %admin.email, "Withdrawal rejected");
        Ok(rejected)
    }

    async fn pending(&self, id: &str) -> ApiResult<Withdrawal> {
        let withdrawal = self
            .withdrawals
            .get_versioned(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Withdrawal not found"))?
            .value;
        if withdrawal.status != WithdrawalStatus::Pending {
            return Err(ApiError::bad_request("Withdrawal has already been processed"));
        }
        Ok(withdrawal)
    }
}
