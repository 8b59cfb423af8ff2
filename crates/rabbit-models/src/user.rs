//! User accounts and roles.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coins granted to a new worker.
pub const WORKER_SIGNUP_COINS: i64 = 10;

/// Coins granted to any other new account.
pub const CREATOR_SIGNUP_COINS: i64 = 50;

/// Account role.
///
/// Stored and serialized with the same spelling the web client sends
/// (`"Worker"`, `"TaskCreator"`, `"Admin"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum UserRole {
    #[default]
    Worker,
    TaskCreator,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Worker => "Worker",
            UserRole::TaskCreator => "TaskCreator",
            UserRole::Admin => "Admin",
        }
    }

    /// Coins credited when an account with this role registers.
    pub fn signup_coins(&self) -> i64 {
        match self {
            UserRole::Worker => WORKER_SIGNUP_COINS,
            UserRole::TaskCreator | UserRole::Admin => CREATOR_SIGNUP_COINS,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown role string.
#[derive(Debug, Clone, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for UserRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Worker" | "worker" => Ok(UserRole::Worker),
            "TaskCreator" | "task_creator" | "Task Creator" => Ok(UserRole::TaskCreator),
            "Admin" | "admin" => Ok(UserRole::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// User document. The lowercased email doubles as the document id.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct User {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub coins: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with the signup balance for `role`.
    pub fn new(
        email: impl AsRef<str>,
        name: impl Into<String>,
        role: UserRole,
        image_url: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            email: normalize_email(email.as_ref()),
            name: name.into(),
            role,
            image_url,
            coins: role.signup_coins(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Canonical form of an email used as a document id.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
