//! Per-user notifications under `users/{email}/notifications`.

use std::collections::HashMap;

use chrono::Utc;

use rabbit_models::Notification;

use crate::client::FirestoreClient;
use crate::error::FirestoreResult;
use crate::types::{Document, StructuredQuery, ToFirestoreValue, Value, Write};
use crate::user_repo::USERS;

pub const NOTIFICATIONS: &str = "notifications";

#[derive(Clone)]
pub struct NotificationRepository {
    client: FirestoreClient,
}

impl NotificationRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Most recent notifications for `email`, newest first.
    pub async fn list_recent(&self, email: &str, limit: i32) -> FirestoreResult<Vec<Notification>> {
        let query = StructuredQuery::collection(NOTIFICATIONS)
            .order_by("created_at", true)
            .limit(limit);
        let parent = format!("{}/{}", USERS, urlencoding::encode(email));
        let docs = self.client.run_query(&parent, query).await?;
        Ok(docs.iter().map(document_to_notification).collect())
    }
}

/// Insert of a notification for `email`, for inclusion in a commit.
pub fn notification_write(client: &FirestoreClient, email: &str, n: &Notification) -> Write {
    let collection = format!("{}/{}/{}", USERS, email, NOTIFICATIONS);
    let mut fields: HashMap<String, Value> = HashMap::new();
    fields.insert("message".to_string(), n.message.to_firestore_value());
    fields.insert("action_route".to_string(), n.action_route.to_firestore_value());
    fields.insert("created_at".to_string(), n.created_at.to_firestore_value());
    Write::create(client.document_name(&collection, &n.id), fields)
}

fn document_to_notification(doc: &Document) -> Notification {
    Notification {
        id: doc.id().unwrap_or_default().to_string(),
        message: doc.get("message").unwrap_or_default(),
        action_route: doc.get("action_route").unwrap_or_default(),
        created_at: doc.get("created_at").unwrap_or_else(Utc::now),
    }
}
