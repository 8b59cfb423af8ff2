//! Card payment records. Document ids are payment-intent ids.

use std::collections::HashMap;

use chrono::Utc;

use rabbit_models::Payment;

use crate::client::FirestoreClient;
use crate::error::FirestoreResult;
use crate::types::{Document, FieldFilter, StructuredQuery, ToFirestoreValue, Value, Write};

pub const PAYMENTS: &str = "payments";

#[derive(Clone)]
pub struct PaymentRepository {
    client: FirestoreClient,
}

impl PaymentRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, intent_id: &str) -> FirestoreResult<Option<Payment>> {
        Ok(self
            .client
            .get_document(PAYMENTS, intent_id)
            .await?
            .map(|doc| document_to_payment(&doc, intent_id)))
    }

    pub async fn list_by_email(&self, email: &str) -> FirestoreResult<Vec<Payment>> {
        let query = StructuredQuery::collection(PAYMENTS)
            .filter(vec![FieldFilter::eq("email", email.to_firestore_value())])
            .order_by("created_at", true);
        self.query(query).await
    }

    pub async fn list_all(&self) -> FirestoreResult<Vec<Payment>> {
        self.query(StructuredQuery::collection(PAYMENTS)).await
    }

    async fn query(&self, query: StructuredQuery) -> FirestoreResult<Vec<Payment>> {
        let docs = self.client.run_query("", query).await?;
        Ok(docs
            .iter()
            .map(|d| document_to_payment(d, d.id().unwrap_or_default()))
            .collect())
    }

    /// Insert of a payment record; fails if the intent was already credited.
    pub fn create_write(&self, payment: &Payment) -> Write {
        Write::create(
            self.client.document_name(PAYMENTS, &payment.id),
            payment_to_fields(payment),
        )
    }
}

fn payment_to_fields(p: &Payment) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("email".to_string(), p.email.to_firestore_value());
    fields.insert("package_id".to_string(), p.package_id.to_firestore_value());
    fields.insert("coins".to_string(), p.coins.to_firestore_value());
    fields.insert("amount_cents".to_string(), p.amount_cents.to_firestore_value());
    fields.insert("currency".to_string(), p.currency.to_firestore_value());
    fields.insert("status".to_string(), p.status.to_firestore_value());
    fields.insert("created_at".to_string(), p.created_at.to_firestore_value());
    fields
}

fn document_to_payment(doc: &Document, id: &str) -> Payment {
    Payment {
        id: id.to_string(),
        email: doc.get("email").unwrap_or_default(),
        package_id: doc.get("package_id").unwrap_or_default(),
        coins: doc.get("coins").unwrap_or(0),
        amount_cents: doc.get("amount_cents").unwrap_or(0),
        currency: doc.get("currency").unwrap_or_default(),
        status: doc.get("status").unwrap_or_default(),
        created_at: doc.get("created_at").unwrap_or_else(Utc::now),
    }
}
