//! Worker submissions against tasks.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::{Task, TaskId};

/// Review state of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SubmissionStatus::Pending),
            "approved" => Some(SubmissionStatus::Approved),
            "rejected" => Some(SubmissionStatus::Rejected),
            _ => None,
        }
    }

    /// Only pending submissions can be reviewed.
    pub fn is_reviewable(&self) -> bool {
        matches!(self, SubmissionStatus::Pending)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A worker's claim of having completed one unit of a task.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Submission {
    pub id: String,
    pub task_id: TaskId,
    pub task_title: String,
    /// Coins the worker receives on approval (copied from the task at submit time).
    pub payable_amount: u32,
    pub worker_email: String,
    pub worker_name: String,
    pub creator_email: String,
    pub creator_name: String,
    pub submission_details: String,
    #[serde(default)]
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Submission {
    /// Create a pending submission for `task`.
    pub fn new(
        task: &Task,
        worker_email: impl Into<String>,
        worker_name: impl Into<String>,
        submission_details: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            task_id: task.id.clone(),
            task_title: task.task_title.clone(),
            payable_amount: task.payable_amount,
            worker_email: worker_email.into(),
            worker_name: worker_name.into(),
            creator_email: task.creator_email.clone(),
            creator_name: task.creator_name.clone(),
            submission_details: submission_details.into(),
            status: SubmissionStatus::Pending,
            created_at: Utc::now(),
            reviewed_at: None,
        }
    }
}
