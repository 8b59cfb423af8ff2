//! Withdrawal request repository.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, warn};

use rabbit_models::{Withdrawal, WithdrawalStatus};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{Document, FieldFilter, StructuredQuery, ToFirestoreValue, Value, Versioned, Write};

pub const WITHDRAWALS: &str = "withdrawals";

#[derive(Clone)]
pub struct WithdrawalRepository {
    client: FirestoreClient,
}

impl WithdrawalRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, withdrawal: &Withdrawal) -> FirestoreResult<()> {
        self.client
            .create_document(WITHDRAWALS, &withdrawal.id, withdrawal_to_fields(withdrawal))
            .await?;
        info!(
            withdrawal_id = %withdrawal.id,
            worker = %withdrawal.worker_email,
            coins = withdrawal.withdrawal_coin,
            "Created withdrawal request"
        );
        Ok(())
    }

    pub async fn get_versioned(&self, id: &str) -> FirestoreResult<Option<Versioned<Withdrawal>>> {
        match self.client.get_document(WITHDRAWALS, id).await? {
            Some(doc) => Ok(Some(Versioned {
                value: document_to_withdrawal(&doc, id)?,
                update_time: doc.update_time.clone(),
            })),
            None => Ok(None),
        }
    }

    pub async fn list_by_worker(&self, email: &str) -> FirestoreResult<Vec<Withdrawal>> {
        let query = StructuredQuery::collection(WITHDRAWALS)
            .filter(vec![FieldFilter::eq("worker_email", email.to_firestore_value())])
            .order_by("created_at", true);
        self.query(query).await
    }

    /// Pending requests, oldest first.
    pub async fn list_pending(&self) -> FirestoreResult<Vec<Withdrawal>> {
        let query = StructuredQuery::collection(WITHDRAWALS)
            .filter(vec![FieldFilter::eq(
                "status",
                WithdrawalStatus::Pending.as_str().to_firestore_value(),
            )])
            .order_by("created_at", false);
        self.query(query).await
    }

    async fn query(&self, query: StructuredQuery) -> FirestoreResult<Vec<Withdrawal>> {
        let docs = self.client.run_query("", query).await?;
        Ok(docs
            .iter()
            .filter_map(|d| {
                let id = d.id().unwrap_or_default();
                document_to_withdrawal(d, id)
                    .map_err(|e| warn!(withdrawal_id = %id, error = %e, "Skipping unreadable withdrawal"))
                    .ok()
            })
            .collect())
    }

    /// Settle a pending request, guarded on the version it was read at.
    pub fn review_write(
        &self,
        id: &str,
        status: WithdrawalStatus,
        update_time: Option<&str>,
    ) -> Write {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), status.as_str().to_firestore_value());
        fields.insert("processed_at".to_string(), Utc::now().to_firestore_value());
        Write::patch(self.client.document_name(WITHDRAWALS, id), fields)
            .if_unchanged_since(update_time)
    }
}

fn withdrawal_to_fields(w: &Withdrawal) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("worker_email".to_string(), w.worker_email.to_firestore_value());
    fields.insert("worker_name".to_string(), w.worker_name.to_firestore_value());
    fields.insert("withdrawal_coin".to_string(), w.withdrawal_coin.to_firestore_value());
    fields.insert(
        "withdrawal_amount_cents".to_string(),
        w.withdrawal_amount_cents.to_firestore_value(),
    );
    fields.insert("payment_system".to_string(), w.payment_system.to_firestore_value());
    fields.insert("account_number".to_string(), w.account_number.to_firestore_value());
    fields.insert("status".to_string(), w.status.as_str().to_firestore_value());
    fields.insert("created_at".to_string(), w.created_at.to_firestore_value());
    fields.insert("processed_at".to_string(), w.processed_at.to_firestore_value());
    fields
}

fn document_to_withdrawal(doc: &Document, id: &str) -> FirestoreResult<Withdrawal> {
    let status: String = doc.require("status")?;
    let status = WithdrawalStatus::from_str(&status)
        .ok_or_else(|| FirestoreError::SerializationError(format!("unknown status {}", status)))?;

    Ok(Withdrawal {
        id: id.to_string(),
        worker_email: doc.require("worker_email")?,
        worker_name: doc.get("worker_name").unwrap_or_default(),
        withdrawal_coin: doc.require("withdrawal_coin")?,
        withdrawal_amount_cents: doc.require("withdrawal_amount_cents")?,
        payment_system: doc.get("payment_system").unwrap_or_default(),
        account_number: doc.get("account_number").unwrap_or_default(),
        status,
        created_at: doc.get("created_at").unwrap_or_else(Utc::now),
        processed_at: doc.get("processed_at"),
    })
}
