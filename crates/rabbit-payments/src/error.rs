//! Payment provider error types.

use thiserror::Error;

pub type PaymentResult<T> = Result<T, PaymentError>;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payments are not configured: {0}")]
    NotConfigured(String),

    #[error("Provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PaymentError {
    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::Network(_) => true,
            PaymentError::Provider { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// The provider does not know the requested object.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PaymentError::Provider { status: 404, .. })
    }
}
