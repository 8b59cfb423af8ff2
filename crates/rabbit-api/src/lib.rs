//! Axum HTTP API server for the Task Rabbit marketplace.
//!
//! This crate provides:
//! - Account, task, submission, payment and withdrawal endpoints
//! - Firebase ID token verification
//! - Rate limiting and security headers
//! - Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{PurchaseService, TaskService, UserService, WithdrawalService};
pub use state::AppState;
