//! Task handlers for creators (post, edit, delete) and workers (browse).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use rabbit_firestore::TaskTextUpdate;
use rabbit_models::{Task, UserRole};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::security::{
    is_valid_document_id, sanitize_text, sanitize_title, validate_optional_image_url,
    MAX_TEXT_LENGTH,
};
use crate::services::NewTask;
use crate::state::AppState;

/// New task body. Any client-sent `total_cost` is ignored; the cost is
/// always derived from quantity and pay.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200))]
    pub task_title: String,
    #[validate(length(min = 1, max = 5000))]
    pub task_detail: String,
    #[validate(range(min = 1, max = 10000))]
    pub task_quantity: u32,
    #[validate(range(min = 1, max = 100000))]
    pub payable_amount: u32,
    #[validate(length(min = 1, max = 64))]
    pub completion_date: String,
    #[validate(length(min = 1, max = 2000))]
    pub submission_info: String,
    #[serde(default)]
    pub task_image_url: Option<String>,
}

#[derive(Serialize)]
pub struct CreateTaskResponse {
    pub task: Task,
    pub total_cost: i64,
    /// Creator balance after the debit.
    pub coins: i64,
}

pub async fn create_task(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<CreateTaskResponse>)> {
    request.validate()?;
    let creator = state
        .user_service
        .require_role(&user.email, &[UserRole::TaskCreator])
        .await?;

    let input = NewTask {
        task_title: sanitize_title(&request.task_title),
        task_detail: sanitize_text(&request.task_detail, MAX_TEXT_LENGTH),
        task_quantity: request.task_quantity,
        payable_amount: request.payable_amount,
        completion_date: sanitize_title(&request.completion_date),
        submission_info: sanitize_text(&request.submission_info, MAX_TEXT_LENGTH),
        task_image_url: validate_optional_image_url(request.task_image_url.as_deref())
            .map_err(ApiError::Validation)?,
    };

    let (task, receipt) = state.task_service.create(&creator, input).await?;
    metrics::record_task_created();
    metrics::record_coins_moved("task_created", receipt.transaction.delta);

    Ok((
        StatusCode::CREATED,
        Json(CreateTaskResponse {
            total_cost: task.total_cost(),
            task,
            coins: receipt.balance,
        }),
    ))
}

/// The creator's own tasks, newest first.
pub async fn my_tasks(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Task>>> {
    let creator = state
        .user_service
        .require_role(&user.email, &[UserRole::TaskCreator])
        .await?;
    Ok(Json(state.task_service.tasks().list_by_creator(&creator.email).await?))
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 200))]
    pub task_title: Option<String>,
    #[validate(length(min = 1, max = 5000))]
    pub task_detail: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub submission_info: Option<String>,
}

/// Edit a task's text fields. Quantity and pay cannot change after posting.
pub async fn update_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(task_id): Path<String>,
    Json(request): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    ensure_task_id(&task_id)?;
    request.validate()?;
    let creator = state
        .user_service
        .require_role(&user.email, &[UserRole::TaskCreator])
        .await?;

    let update = TaskTextUpdate {
        task_title: request.task_title.as_deref().map(sanitize_title),
        task_detail: request
            .task_detail
            .as_deref()
            .map(|s| sanitize_text(s, MAX_TEXT_LENGTH)),
        submission_info: request
            .submission_info
            .as_deref()
            .map(|s| sanitize_text(s, MAX_TEXT_LENGTH)),
    };

    Ok(Json(
        state
            .task_service
            .update_text(&creator, &task_id, &update)
            .await?,
    ))
}

#[derive(Serialize)]
pub struct DeleteTaskResponse {
    pub message: String,
    pub refunded: i64,
    /// Creator balance after the refund.
    pub coins: i64,
}

/// Delete one of the caller's tasks and refund its open units.
pub async fn delete_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(task_id): Path<String>,
) -> ApiResult<Json<DeleteTaskResponse>> {
    ensure_task_id(&task_id)?;
    let creator = state
        .user_service
        .require_role(&user.email, &[UserRole::TaskCreator])
        .await?;

    let receipt = state.task_service.delete(&creator, &task_id).await?;
    metrics::record_coins_moved("task_refund", receipt.transaction.delta);

    Ok(Json(DeleteTaskResponse {
        message: "Task deleted".to_string(),
        refunded: receipt.transaction.delta,
        coins: receipt.balance,
    }))
}

/// Tasks that still accept submissions.
pub async fn available_tasks(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Task>>> {
    state.user_service.require_user(&user.email).await?;
    Ok(Json(state.task_service.tasks().list_available().await?))
}

pub async fn get_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(task_id): Path<String>,
) -> ApiResult<Json<Task>> {
    ensure_task_id(&task_id)?;
    state.user_service.require_user(&user.email).await?;
    Ok(Json(state.task_service.get(&task_id).await?))
}

pub(crate) fn ensure_task_id(id: &str) -> ApiResult<()> {
    if is_valid_document_id(id) {
        Ok(())
    } else {
        Err(ApiError::bad_request("Invalid task id"))
    }
}
