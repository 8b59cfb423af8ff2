//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use rabbit_firestore::{FirestoreError, LedgerError};
use rabbit_payments::PaymentError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Insufficient coins")]
    InsufficientCoins { balance: i64, required: i64 },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Payment provider error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Firestore error: {0}")]
    Firestore(#[from] FirestoreError),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) | ApiError::InsufficientCoins { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) | ApiError::Firestore(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::InsufficientCoins { .. } => Some("insufficient_coins"),
            ApiError::Conflict(_) => Some("conflict"),
            ApiError::Validation(_) => Some("validation"),
            _ => None,
        }
    }

    fn is_internal(&self) -> bool {
        matches!(self, ApiError::Internal(_) | ApiError::Firestore(_))
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::UserNotFound(email) => ApiError::NotFound(format!("User {}", email)),
            LedgerError::InsufficientCoins { balance, required } => {
                ApiError::InsufficientCoins { balance, required }
            }
            LedgerError::NotFound(what) => ApiError::NotFound(what),
            LedgerError::Forbidden(msg) => ApiError::Forbidden(msg),
            LedgerError::Rejected(msg) => ApiError::BadRequest(msg),
            LedgerError::AlreadyApplied(msg) => ApiError::Conflict(msg),
            LedgerError::Conflict { attempts } => ApiError::Conflict(format!(
                "Too much concurrent activity on this account ({} attempts), please retry",
                attempts
            )),
            LedgerError::Firestore(e) => ApiError::Firestore(e),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::NotConfigured(msg) => ApiError::Unavailable(msg),
            PaymentError::InvalidSignature(msg) => ApiError::BadRequest(format!("Invalid signature: {}", msg)),
            PaymentError::InvalidPayload(msg) => ApiError::BadRequest(msg),
            PaymentError::Provider { status: 404, .. } => {
                ApiError::NotFound("Payment intent".to_string())
            }
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if self.is_internal() {
            error!(error = %self, "Request failed with internal error");
        }

        // Don't expose internal error details in production
        let detail = if self.is_internal()
            && std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            detail,
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_errors_map_to_http_statuses() {
        let cases = [
            (
                LedgerError::InsufficientCoins { balance: 1, required: 5 },
                StatusCode::BAD_REQUEST,
            ),
            (LedgerError::Conflict { attempts: 5 }, StatusCode::CONFLICT),
            (LedgerError::UserNotFound("a@b.io".into()), StatusCode::NOT_FOUND),
            (LedgerError::NotFound("Task".into()), StatusCode::NOT_FOUND),
            (LedgerError::Forbidden("not yours".into()), StatusCode::FORBIDDEN),
            (LedgerError::Rejected("already reviewed".into()), StatusCode::BAD_REQUEST),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_insufficient_coins_message() {
        let err = ApiError::from(LedgerError::InsufficientCoins { balance: 1, required: 5 });
        assert_eq!(err.to_string(), "Insufficient coins");
        assert_eq!(err.code(), Some("insufficient_coins"));
    }

    #[test]
    fn test_payment_errors() {
        assert_eq!(
            ApiError::from(PaymentError::NotConfigured("no key".into())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(PaymentError::Provider {
                status: 404,
                message: "No such payment_intent".into()
            })
            .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(PaymentError::Provider {
                status: 500,
                message: "boom".into()
            })
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
    }
}
