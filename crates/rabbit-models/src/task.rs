//! Paid micro-tasks posted by task creators.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Generate a new random task ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Task document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Task {
    pub id: TaskId,

    pub task_title: String,

    pub task_detail: String,

    /// Units of work still open for submission.
    pub task_quantity: u32,

    /// Coins paid to a worker per approved unit.
    pub payable_amount: u32,

    /// Deadline as entered by the creator (free-form date string).
    pub completion_date: String,

    /// What the worker must provide as proof of completion.
    pub submission_info: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_image_url: Option<String>,

    pub creator_email: String,

    pub creator_name: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Coins still reserved by this task (open units times unit price).
    pub fn total_cost(&self) -> i64 {
        total_cost(self.task_quantity, self.payable_amount)
    }

    /// Whether a worker can still submit against this task.
    pub fn has_open_units(&self) -> bool {
        self.task_quantity > 0
    }
}

/// Cost of `quantity` units paid `payable_amount` coins each.
pub fn total_cost(quantity: u32, payable_amount: u32) -> i64 {
    i64::from(quantity) * i64::from(payable_amount)
}
