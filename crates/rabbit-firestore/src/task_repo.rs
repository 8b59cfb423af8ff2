//! Task repository.

use std::collections::HashMap;

use chrono::Utc;
use tracing::warn;

use rabbit_models::{Task, TaskId};

use crate::client::FirestoreClient;
use crate::error::FirestoreResult;
use crate::types::{Document, FieldFilter, StructuredQuery, ToFirestoreValue, Value, Versioned, Write};

pub const TASKS: &str = "tasks";

/// Creator-editable text fields.
#[derive(Debug, Clone, Default)]
pub struct TaskTextUpdate {
    pub task_title: Option<String>,
    pub task_detail: Option<String>,
    pub submission_info: Option<String>,
}

impl TaskTextUpdate {
    pub fn is_empty(&self) -> bool {
        self.task_title.is_none() && self.task_detail.is_none() && self.submission_info.is_none()
    }
}

#[derive(Clone)]
pub struct TaskRepository {
    client: FirestoreClient,
}

impl TaskRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &str) -> FirestoreResult<Option<Task>> {
        Ok(self.get_versioned(id).await?.map(|v| v.value))
    }

    pub async fn get_versioned(&self, id: &str) -> FirestoreResult<Option<Versioned<Task>>> {
        match self.client.get_document(TASKS, id).await? {
            Some(doc) => Ok(Some(Versioned {
                value: document_to_task(&doc, id)?,
                update_time: doc.update_time.clone(),
            })),
            None => Ok(None),
        }
    }

    /// Tasks posted by `email`, newest first.
    pub async fn list_by_creator(&self, email: &str) -> FirestoreResult<Vec<Task>> {
        let query = StructuredQuery::collection(TASKS)
            .filter(vec![FieldFilter::eq("creator_email", email.to_firestore_value())])
            .order_by("created_at", true);
        self.query(query).await
    }

    /// Tasks that still have open units.
    pub async fn list_available(&self) -> FirestoreResult<Vec<Task>> {
        let query = StructuredQuery::collection(TASKS)
            .filter(vec![FieldFilter::new(
                "task_quantity",
                "GREATER_THAN",
                0i64.to_firestore_value(),
            )])
            .order_by("task_quantity", true)
            .order_by("created_at", true);
        self.query(query).await
    }

    pub async fn list_all(&self) -> FirestoreResult<Vec<Task>> {
        self.query(StructuredQuery::collection(TASKS).order_by("created_at", true))
            .await
    }

    /// Patch the text fields present in `update`.
    pub async fn update_text(&self, id: &str, update: &TaskTextUpdate) -> FirestoreResult<Task> {
        let mut fields = HashMap::new();
        if let Some(v) = &update.task_title {
            fields.insert("task_title".to_string(), v.to_firestore_value());
        }
        if let Some(v) = &update.task_detail {
            fields.insert("task_detail".to_string(), v.to_firestore_value());
        }
        if let Some(v) = &update.submission_info {
            fields.insert("submission_info".to_string(), v.to_firestore_value());
        }
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());

        let mask: Vec<String> = fields.keys().cloned().collect();
        let doc = self
            .client
            .update_document(TASKS, id, fields, Some(mask))
            .await?;
        document_to_task(&doc, id)
    }

    async fn query(&self, query: StructuredQuery) -> FirestoreResult<Vec<Task>> {
        let docs = self.client.run_query("", query).await?;
        Ok(docs
            .iter()
            .filter_map(|d| {
                let id = d.id().unwrap_or_default();
                match document_to_task(d, id) {
                    Ok(t) => Some(t),
                    Err(e) => {
                        warn!(task_id = %id, error = %e, "Skipping unreadable task document");
                        None
                    }
                }
            })
            .collect())
    }

    // =========================================================================
    // Commit writes
    // =========================================================================

    pub fn create_write(&self, task: &Task) -> Write {
        Write::create(
            self.client.document_name(TASKS, task.id.as_str()),
            task_to_fields(task),
        )
    }

    pub fn delete_write(&self, id: &str, update_time: Option<&str>) -> Write {
        Write::delete(self.client.document_name(TASKS, id)).if_unchanged_since(update_time)
    }

    /// Set the open quantity, guarded on the version it was computed from.
    pub fn quantity_write(&self, id: &str, task_quantity: u32, update_time: Option<&str>) -> Write {
        let mut fields = HashMap::new();
        fields.insert("task_quantity".to_string(), task_quantity.to_firestore_value());
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());
        Write::patch(self.client.document_name(TASKS, id), fields).if_unchanged_since(update_time)
    }
}

fn task_to_fields(task: &Task) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("task_title".to_string(), task.task_title.to_firestore_value());
    fields.insert("task_detail".to_string(), task.task_detail.to_firestore_value());
    fields.insert("task_quantity".to_string(), task.task_quantity.to_firestore_value());
    fields.insert("payable_amount".to_string(), task.payable_amount.to_firestore_value());
    fields.insert("completion_date".to_string(), task.completion_date.to_firestore_value());
    fields.insert("submission_info".to_string(), task.submission_info.to_firestore_value());
    fields.insert("task_image_url".to_string(), task.task_image_url.to_firestore_value());
    fields.insert("creator_email".to_string(), task.creator_email.to_firestore_value());
    fields.insert("creator_name".to_string(), task.creator_name.to_firestore_value());
    fields.insert("created_at".to_string(), task.created_at.to_firestore_value());
    fields.insert("updated_at".to_string(), task.updated_at.to_firestore_value());
    fields
}

fn document_to_task(doc: &Document, id: &str) -> FirestoreResult<Task> {
    Ok(Task {
        id: TaskId::from(id),
        task_title: doc.require("task_title")?,
        task_detail: doc.get("task_detail").unwrap_or_default(),
        task_quantity: doc.require("task_quantity")?,
        payable_amount: doc.require("payable_amount")?,
        completion_date: doc.get("completion_date").unwrap_or_default(),
        submission_info: doc.get("submission_info").unwrap_or_default(),
        task_image_url: doc.get("task_image_url"),
        creator_email: doc.require("creator_email")?,
        creator_name: doc.get("creator_name").unwrap_or_default(),
        created_at: doc.get("created_at").unwrap_or_else(Utc::now),
        updated_at: doc.get("updated_at").unwrap_or_else(Utc::now),
    })
}
