//! In-app notifications, stored under `users/{email}/notifications`.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Notification {
    pub id: String,
    pub message: String,
    /// Client route the notification links to (e.g. `/dashboard/my-submissions`)
    pub action_route: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(message: impl Into<String>, action_route: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message: message.into(),
            action_route: action_route.into(),
            created_at: Utc::now(),
        }
    }
}
