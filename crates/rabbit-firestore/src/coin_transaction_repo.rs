//! Coin ledger history under `users/{email}/coin_transactions`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;

use rabbit_models::{CoinOperationType, CoinTransaction};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{Document, StructuredQuery, ToFirestoreValue, Value, Write};
use crate::user_repo::USERS;

pub const COIN_TRANSACTIONS: &str = "coin_transactions";

pub struct CoinTransactionRepository {
    client: FirestoreClient,
    email: String,
}

impl CoinTransactionRepository {
    pub fn new(client: FirestoreClient, email: impl Into<String>) -> Self {
        Self {
            client,
            email: email.into(),
        }
    }

    /// One page of history, newest first.
    ///
    /// `cursor` identifies the last entry of the previous page as
    /// `{rfc3339 timestamp}|{transaction id}`. Entries sharing a timestamp are
    /// ordered by document name so a page boundary never skips or repeats one.
    /// Returns the entries and the cursor for the next page.
    pub async fn list_page(
        &self,
        limit: Option<u32>,
        cursor: Option<&str>,
    ) -> FirestoreResult<(Vec<CoinTransaction>, Option<String>)> {
        let limit = limit.unwrap_or(50).clamp(1, 100) as i32;

        let mut query = StructuredQuery::collection(COIN_TRANSACTIONS)
            .order_by("timestamp", true)
            .order_by("__name__", true)
            .limit(limit);
        if let Some(cursor) = cursor {
            let (timestamp, id) = split_cursor(cursor);
            let mut values = vec![Value::TimestampValue(timestamp.to_string())];
            if let Some(id) = id {
                let collection = format!("{}/{}/{}", USERS, self.email, COIN_TRANSACTIONS);
                values.push(Value::ReferenceValue(self.client.document_name(&collection, id)));
            }
            query = query.start_after(values);
        }

        let parent = format!("{}/{}", USERS, urlencoding::encode(&self.email));
        let docs = self.client.run_query(&parent, query).await?;

        let transactions: Vec<CoinTransaction> = docs
            .iter()
            .filter_map(|d| match document_to_transaction(d) {
                Ok(tx) => Some(tx),
                Err(e) => {
                    warn!(email = %self.email, error = %e, "Failed to parse coin transaction");
                    None
                }
            })
            .collect();

        let next_cursor = if transactions.len() as i32 == limit {
            transactions
                .last()
                .map(|tx| format!("{}|{}", tx.timestamp.to_rfc3339(), tx.id))
        } else {
            None
        };
        Ok((transactions, next_cursor))
    }
}

/// Split a page cursor into its timestamp and optional transaction id.
pub fn split_cursor(cursor: &str) -> (&str, Option<&str>) {
    match cursor.split_once('|') {
        Some((timestamp, id)) => (timestamp, Some(id)),
        None => (cursor, None),
    }
}

/// Insert of a ledger entry, for inclusion in a commit.
pub fn transaction_write(client: &FirestoreClient, tx: &CoinTransaction) -> Write {
    let collection = format!("{}/{}/{}", USERS, tx.email, COIN_TRANSACTIONS);
    Write::create(
        client.document_name(&collection, &tx.id),
        transaction_to_fields(tx),
    )
}

fn transaction_to_fields(tx: &CoinTransaction) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("email".to_string(), tx.email.to_firestore_value());
    fields.insert(
        "operation_type".to_string(),
        tx.operation_type.as_str().to_firestore_value(),
    );
    fields.insert("delta".to_string(), tx.delta.to_firestore_value());
    fields.insert("balance_after".to_string(), tx.balance_after.to_firestore_value());
    fields.insert("description".to_string(), tx.description.to_firestore_value());
    fields.insert("reference_id".to_string(), tx.reference_id.to_firestore_value());
    fields.insert("timestamp".to_string(), tx.timestamp.to_firestore_value());
    fields
}

fn document_to_transaction(doc: &Document) -> FirestoreResult<CoinTransaction> {
    let op: String = doc.require("operation_type")?;
    let operation_type = CoinOperationType::from_str(&op)
        .ok_or_else(|| FirestoreError::SerializationError(format!("unknown operation {}", op)))?;

    Ok(CoinTransaction {
        id: doc.id().unwrap_or_default().to_string(),
        email: doc.require("email")?,
        operation_type,
        delta: doc.require("delta")?,
        balance_after: doc.require("balance_after")?,
        description: doc.get("description").unwrap_or_default(),
        reference_id: doc.get("reference_id"),
        timestamp: doc.get::<DateTime<Utc>>("timestamp").unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use rabbit_models::CoinContext;

    use super::*;

    #[test]
    fn test_transaction_fields_roundtrip() {
        let tx = CoinContext::new(CoinOperationType::Purchase, "Bought standard")
            .with_reference("pi_123")
            .to_transaction("a@b.io", 150, 160);
        let mut doc = Document::new(transaction_to_fields(&tx));
        doc.name = Some(format!("x/users/a@b.io/coin_transactions/{}", tx.id));

        let back = document_to_transaction(&doc).unwrap();
        assert_eq!(back.id, tx.id);
        assert_eq!(back.delta, 150);
        assert_eq!(back.balance_after, 160);
        assert_eq!(back.operation_type, CoinOperationType::Purchase);
        assert_eq!(back.reference_id.as_deref(), Some("pi_123"));
    }

    #[test]
    fn test_split_cursor() {
        assert_eq!(
            split_cursor("2026-01-01T00:00:00+00:00|tx-1"),
            ("2026-01-01T00:00:00+00:00", Some("tx-1"))
        );
        assert_eq!(
            split_cursor("2026-01-01T00:00:00+00:00"),
            ("2026-01-01T00:00:00+00:00", None)
        );
    }
}
