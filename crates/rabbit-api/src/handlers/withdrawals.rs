//! Worker withdrawal handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use rabbit_models::{UserRole, Withdrawal, MIN_WITHDRAWAL_COINS};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::security::sanitize_title;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWithdrawalRequest {
    #[validate(range(min = 1, max = 100000000))]
    pub withdrawal_coin: i64,
    #[validate(length(min = 1, max = 64))]
    pub payment_system: String,
    #[validate(length(min = 1, max = 64))]
    pub account_number: String,
}

pub async fn create_withdrawal(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateWithdrawalRequest>,
) -> ApiResult<(StatusCode, Json<Withdrawal>)> {
    request.validate()?;
    if request.withdrawal_coin < MIN_WITHDRAWAL_COINS {
        return Err(ApiError::bad_request(format!(
            "Minimum withdrawal is {} coins",
            MIN_WITHDRAWAL_COINS
        )));
    }
    let worker = state
        .user_service
        .require_role(&user.email, &[UserRole::Worker])
        .await?;

    let payment_system = sanitize_title(&request.payment_system);
    let account_number = sanitize_title(&request.account_number);
    if payment_system.is_empty() || account_number.is_empty() {
        return Err(ApiError::bad_request("Payment system and account number are required"));
    }

    let withdrawal = state
        .withdrawal_service
        .request(&worker, request.withdrawal_coin, &payment_system, &account_number)
        .await?;
    Ok((StatusCode::CREATED, Json(withdrawal)))
}

pub async fn my_withdrawals(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Withdrawal>>> {
    let worker = state
        .user_service
        .require_role(&user.email, &[UserRole::Worker])
        .await?;
    Ok(Json(
        state
            .withdrawal_service
            .withdrawals()
            .list_by_worker(&worker.email)
            .await?,
    ))
}
