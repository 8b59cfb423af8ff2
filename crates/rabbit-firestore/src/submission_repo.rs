//! Submission repository.

use std::collections::HashMap;

use chrono::Utc;
use tracing::warn;

use rabbit_models::{Submission, SubmissionStatus, TaskId};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{Document, FieldFilter, StructuredQuery, ToFirestoreValue, Value, Versioned, Write};

pub const SUBMISSIONS: &str = "submissions";

/// One page of a worker's submissions.
#[derive(Debug, Clone)]
pub struct SubmissionPage {
    pub items: Vec<Submission>,
    pub page: u32,
    pub limit: u32,
    pub has_more: bool,
}

#[derive(Clone)]
pub struct SubmissionRepository {
    client: FirestoreClient,
}

impl SubmissionRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    pub async fn get_versioned(&self, id: &str) -> FirestoreResult<Option<Versioned<Submission>>> {
        match self.client.get_document(SUBMISSIONS, id).await? {
            Some(doc) => Ok(Some(Versioned {
                value: document_to_submission(&doc, id)?,
                update_time: doc.update_time.clone(),
            })),
            None => Ok(None),
        }
    }

    /// A worker's submissions, newest first. `page` is zero-based.
    pub async fn list_by_worker(
        &self,
        email: &str,
        page: u32,
        limit: u32,
    ) -> FirestoreResult<SubmissionPage> {
        let limit = limit.clamp(1, 100);
        // One extra row tells us whether another page exists.
        let query = StructuredQuery::collection(SUBMISSIONS)
            .filter(vec![FieldFilter::eq("worker_email", email.to_firestore_value())])
            .order_by("created_at", true)
            .offset(page.saturating_mul(limit) as i32)
            .limit(limit as i32 + 1);

        let mut items = self.query(query).await?;
        let has_more = items.len() > limit as usize;
        items.truncate(limit as usize);

        Ok(SubmissionPage {
            items,
            page,
            limit,
            has_more,
        })
    }

    /// Pending submissions on tasks owned by `creator_email`.
    pub async fn list_pending_for_creator(&self, creator_email: &str) -> FirestoreResult<Vec<Submission>> {
        let query = StructuredQuery::collection(SUBMISSIONS)
            .filter(vec![
                FieldFilter::eq("creator_email", creator_email.to_firestore_value()),
                FieldFilter::eq("status", SubmissionStatus::Pending.as_str().to_firestore_value()),
            ])
            .order_by("created_at", true);
        self.query(query).await
    }

    /// Whether `worker_email` already has a submission for `task_id`.
    pub async fn exists_for(&self, worker_email: &str, task_id: &TaskId) -> FirestoreResult<bool> {
        let query = StructuredQuery::collection(SUBMISSIONS)
            .filter(vec![
                FieldFilter::eq("worker_email", worker_email.to_firestore_value()),
                FieldFilter::eq("task_id", task_id.as_str().to_firestore_value()),
            ])
            .limit(1);
        Ok(!self.client.run_query("", query).await?.is_empty())
    }

    async fn query(&self, query: StructuredQuery) -> FirestoreResult<Vec<Submission>> {
        let docs = self.client.run_query("", query).await?;
        Ok(docs
            .iter()
            .filter_map(|d| {
                let id = d.id().unwrap_or_default();
                document_to_submission(d, id)
                    .map_err(|e| warn!(submission_id = %id, error = %e, "Skipping unreadable submission"))
                    .ok()
            })
            .collect())
    }

    // =========================================================================
    // Commit writes
    // =========================================================================

    pub fn create_write(&self, submission: &Submission) -> Write {
        Write::create(
            self.client.document_name(SUBMISSIONS, &submission.id),
            submission_to_fields(submission),
        )
    }

    /// Move a submission out of `pending`, guarded on the version it was read at.
    pub fn review_write(&self, id: &str, status: SubmissionStatus, update_time: Option<&str>) -> Write {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), status.as_str().to_firestore_value());
        fields.insert("reviewed_at".to_string(), Utc::now().to_firestore_value());
        Write::patch(self.client.document_name(SUBMISSIONS, id), fields)
            .if_unchanged_since(update_time)
    }
}

fn submission_to_fields(s: &Submission) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("task_id".to_string(), s.task_id.as_str().to_firestore_value());
    fields.insert("task_title".to_string(), s.task_title.to_firestore_value());
    fields.insert("payable_amount".to_string(), s.payable_amount.to_firestore_value());
    fields.insert("worker_email".to_string(), s.worker_email.to_firestore_value());
    fields.insert("worker_name".to_string(), s.worker_name.to_firestore_value());
    fields.insert("creator_email".to_string(), s.creator_email.to_firestore_value());
    fields.insert("creator_name".to_string(), s.creator_name.to_firestore_value());
    fields.insert("submission_details".to_string(), s.submission_details.to_firestore_value());
    fields.insert("status".to_string(), s.status.as_str().to_firestore_value());
    fields.insert("created_at".to_string(), s.created_at.to_firestore_value());
    fields.insert("reviewed_at".to_string(), s.reviewed_at.to_firestore_value());
    fields
}

fn document_to_submission(doc: &Document, id: &str) -> FirestoreResult<Submission> {
    let status: String = doc.require("status")?;
    let status = SubmissionStatus::from_str(&status)
        .ok_or_else(|| FirestoreError::SerializationError(format!("unknown status {}", status)))?;

    Ok(Submission {
        id: id.to_string(),
        task_id: TaskId::from_string(doc.require::<String>("task_id")?),
        task_title: doc.get("task_title").unwrap_or_default(),
        payable_amount: doc.require("payable_amount")?,
        worker_email: doc.require("worker_email")?,
        worker_name: doc.get("worker_name").unwrap_or_default(),
        creator_email: doc.require("creator_email")?,
        creator_name: doc.get("creator_name").unwrap_or_default(),
        submission_details: doc.get("submission_details").unwrap_or_default(),
        status,
        created_at: doc.get("created_at").unwrap_or_else(Utc::now),
        reviewed_at: doc.get("reviewed_at"),
    })
}
