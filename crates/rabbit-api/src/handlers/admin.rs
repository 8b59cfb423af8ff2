//! Admin-only handlers: user management, moderation, payouts and stats.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use rabbit_models::{
    normalize_email, CoinContext, CoinOperationType, Task, User, UserRole, Withdrawal,
    WithdrawalStatus,
};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::tasks::ensure_task_id;
use crate::metrics;
use crate::security::{is_valid_document_id, is_valid_email, sanitize_title};
use crate::state::AppState;

fn path_email(raw: &str) -> ApiResult<String> {
    let email = normalize_email(raw);
    if is_valid_email(&email) {
        Ok(email)
    } else {
        Err(ApiError::bad_request("Invalid email"))
    }
}

pub async fn list_users(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<User>>> {
    state.user_service.require_admin(&user.email).await?;
    Ok(Json(state.user_service.list_all().await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

pub async fn update_user_role(
    State(state): State<AppState>,
    user: AuthUser,
    Path(email): Path<String>,
    Json(request): Json<UpdateRoleRequest>,
) -> ApiResult<Json<User>> {
    let admin = state.user_service.require_admin(&user.email).await?;
    let email = path_email(&email)?;
    if email == admin.email {
        return Err(ApiError::bad_request("You cannot change your own role"));
    }

    let updated = state.user_service.update_role(&email, request.role).await?;
    info!(admin = %admin.email, email = %email, role = %request.role, "User role changed");
    Ok(Json(updated))
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(email): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let admin = state.user_service.require_admin(&user.email).await?;
    let email = path_email(&email)?;
    if email == admin.email {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }

    // Surface a 404 rather than silently deleting nothing.
    state.user_service.get(&email).await?;

    // Open tasks hold the creator's coins and pending payouts still owe the
    // worker; both must be settled while the account exists.
    let (tasks, withdrawals) = tokio::try_join!(
        async {
            state
                .task_service
                .tasks()
                .list_by_creator(&email)
                .await
                .map_err(ApiError::from)
        },
        async {
            state
                .withdrawal_service
                .withdrawals()
                .list_by_worker(&email)
                .await
                .map_err(ApiError::from)
        }
    )?;
    if !tasks.is_empty() {
        return Err(ApiError::Conflict(format!(
            "User still has {} task(s); delete them first",
            tasks.len()
        )));
    }
    if withdrawals.iter().any(|w| w.status == WithdrawalStatus::Pending) {
        return Err(ApiError::Conflict(
            "User has a pending withdrawal; approve or reject it first".to_string(),
        ));
    }

    let removed = state.user_service.delete(&email).await?;
    info!(admin = %admin.email, email = %email, history = removed, "User deleted");

    Ok(Json(MessageResponse {
        message: "User deleted".to_string(),
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdjustCoinsRequest {
    #[validate(range(min = -1000000, max = 1000000))]
    pub delta: i64,
    #[validate(length(min = 1, max = 200, message = "A reason is required"))]
    pub reason: String,
}

#[derive(Serialize)]
pub struct AdjustCoinsResponse {
    pub email: String,
    pub delta: i64,
    pub coins: i64,
}

/// Manual balance correction, recorded in the user's ledger history.
pub async fn adjust_coins(
    State(state): State<AppState>,
    user: AuthUser,
    Path(email): Path<String>,
    Json(request): Json<AdjustCoinsRequest>,
) -> ApiResult<Json<AdjustCoinsResponse>> {
    request.validate()?;
    if request.delta == 0 {
        return Err(ApiError::bad_request("Adjustment must be non-zero"));
    }
    let admin = state.user_service.require_admin(&user.email).await?;
    let email = path_email(&email)?;

    let context = CoinContext::new(
        CoinOperationType::AdminAdjustment,
        format!("{} (by {})", sanitize_title(&request.reason), admin.email),
    );
    let receipt = state
        .ledger
        .apply(&email, request.delta, context, Vec::new())
        .await?;
    metrics::record_coins_moved("admin_adjustment", request.delta);

    Ok(Json(AdjustCoinsResponse {
        email,
        delta: request.delta,
        coins: receipt.balance,
    }))
}

pub async fn list_tasks(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Task>>> {
    state.user_service.require_admin(&user.email).await?;
    Ok(Json(state.task_service.tasks().list_all().await?))
}

#[derive(Serialize)]
pub struct AdminDeleteTaskResponse {
    pub message: String,
    pub refunded: i64,
}

/// Remove any task, refunding its creator as a creator delete would.
pub async fn admin_delete_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(task_id): Path<String>,
) -> ApiResult<Json<AdminDeleteTaskResponse>> {
    ensure_task_id(&task_id)?;
    let admin = state.user_service.require_admin(&user.email).await?;

    let receipt = state.task_service.delete(&admin, &task_id).await?;
    metrics::record_coins_moved("task_refund", receipt.transaction.delta);

    Ok(Json(AdminDeleteTaskResponse {
        message: "Task deleted".to_string(),
        refunded: receipt.transaction.delta,
    }))
}

pub async fn list_pending_withdrawals(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Withdrawal>>> {
    state.user_service.require_admin(&user.email).await?;
    Ok(Json(
        state.withdrawal_service.withdrawals().list_pending().await?,
    ))
}

#[derive(Serialize)]
pub struct WithdrawalDecision {
    pub message: String,
    pub withdrawal_id: String,
}

pub async fn approve_withdrawal(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<WithdrawalDecision>> {
    ensure_withdrawal_id(&id)?;
    let admin = state.user_service.require_admin(&user.email).await?;

    let receipt = state.withdrawal_service.approve(&admin, &id).await?;
    metrics::record_coins_moved("withdrawal", receipt.transaction.delta);

    Ok(Json(WithdrawalDecision {
        message: "Withdrawal approved".to_string(),
        withdrawal_id: id,
    }))
}

pub async fn reject_withdrawal(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<WithdrawalDecision>> {
    ensure_withdrawal_id(&id)?;
    let admin = state.user_service.require_admin(&user.email).await?;

    let withdrawal = state.withdrawal_service.reject(&admin, &id).await?;
    Ok(Json(WithdrawalDecision {
        message: "Withdrawal rejected".to_string(),
        withdrawal_id: withdrawal.id,
    }))
}

fn ensure_withdrawal_id(id: &str) -> ApiResult<()> {
    if is_valid_document_id(id) {
        Ok(())
    } else {
        Err(ApiError::bad_request("Invalid withdrawal id"))
    }
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub total_users: usize,
    pub total_coins: i64,
    pub total_payments_cents: i64,
    pub users_by_role: BTreeMap<&'static str, usize>,
}

/// Platform totals. Computed by scanning, which is fine at marketplace scale.
pub async fn stats(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<StatsResponse>> {
    state.user_service.require_admin(&user.email).await?;

    let (users, payments) = tokio::try_join!(
        state.user_service.list_all(),
        async {
            state
                .purchase_service
                .payments()
                .list_all()
                .await
                .map_err(ApiError::from)
        }
    )?;

    let mut users_by_role = BTreeMap::new();
    for u in &users {
        *users_by_role.entry(u.role.as_str()).or_insert(0) += 1;
    }

    Ok(Json(StatsResponse {
        total_users: users.len(),
        total_coins: users.iter().map(|u| u.coins).sum(),
        total_payments_cents: payments.iter().map(|p| p.amount_cents).sum(),
        users_by_role,
    }))
}
