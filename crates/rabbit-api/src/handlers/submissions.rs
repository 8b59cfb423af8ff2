//! Submission handlers: workers submit, creators review.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use rabbit_models::{Submission, UserRole};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::tasks::ensure_task_id;
use crate::metrics;
use crate::security::{is_valid_document_id, sanitize_text, MAX_TEXT_LENGTH};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubmissionRequest {
    #[validate(length(min = 1, max = 128))]
    pub task_id: String,
    #[validate(length(min = 1, max = 5000, message = "Submission details are required"))]
    pub submission_details: String,
}

pub async fn create_submission(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateSubmissionRequest>,
) -> ApiResult<(StatusCode, Json<Submission>)> {
    request.validate()?;
    ensure_task_id(&request.task_id)?;
    let worker = state
        .user_service
        .require_role(&user.email, &[UserRole::Worker])
        .await?;

    let details = sanitize_text(&request.submission_details, MAX_TEXT_LENGTH);
    if details.is_empty() {
        return Err(ApiError::bad_request("Submission details are required"));
    }

    let submission = state
        .task_service
        .submit(&worker, &request.task_id, &details)
        .await?;
    metrics::record_submission("submitted");

    Ok((StatusCode::CREATED, Json(submission)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PageQuery {
    #[serde(default)]
    #[validate(range(max = 10000))]
    pub page: u32,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u32,
}

fn default_page_size() -> u32 {
    10
}

#[derive(Serialize)]
pub struct SubmissionPageResponse {
    pub submissions: Vec<Submission>,
    pub page: u32,
    pub limit: u32,
    pub has_more: bool,
}

/// The caller's submissions, newest first, one page at a time.
pub async fn my_submissions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<SubmissionPageResponse>> {
    query.validate()?;
    let worker = state
        .user_service
        .require_role(&user.email, &[UserRole::Worker])
        .await?;

    let page = state
        .task_service
        .submissions()
        .list_by_worker(&worker.email, query.page, query.limit)
        .await?;

    Ok(Json(SubmissionPageResponse {
        submissions: page.items,
        page: page.page,
        limit: page.limit,
        has_more: page.has_more,
    }))
}

/// Pending submissions on the caller's tasks.
pub async fn review_queue(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Submission>>> {
    let creator = state
        .user_service
        .require_role(&user.email, &[UserRole::TaskCreator])
        .await?;
    Ok(Json(
        state
            .task_service
            .submissions()
            .list_pending_for_creator(&creator.email)
            .await?,
    ))
}

#[derive(Serialize)]
pub struct ReviewResponse {
    pub message: String,
    pub submission_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coins_paid: Option<i64>,
}

pub async fn approve_submission(
    State(state): State<AppState>,
    user: AuthUser,
    Path(submission_id): Path<String>,
) -> ApiResult<Json<ReviewResponse>> {
    ensure_submission_id(&submission_id)?;
    let creator = state
        .user_service
        .require_role(&user.email, &[UserRole::TaskCreator])
        .await?;

    let receipt = state.task_service.approve(&creator, &submission_id).await?;
    metrics::record_submission("approved");
    metrics::record_coins_moved("submission_approved", receipt.transaction.delta);

    Ok(Json(ReviewResponse {
        message: "Submission approved".to_string(),
        submission_id,
        coins_paid: Some(receipt.transaction.delta),
    }))
}

pub async fn reject_submission(
    State(state): State<AppState>,
    user: AuthUser,
    Path(submission_id): Path<String>,
) -> ApiResult<Json<ReviewResponse>> {
    ensure_submission_id(&submission_id)?;
    let creator = state
        .user_service
        .require_role(&user.email, &[UserRole::TaskCreator])
        .await?;

    let submission = state.task_service.reject(&creator, &submission_id).await?;
    metrics::record_submission("rejected");

    Ok(Json(ReviewResponse {
        message: "Submission rejected".to_string(),
        submission_id: submission.id,
        coins_paid: None,
    }))
}

fn ensure_submission_id(id: &str) -> ApiResult<()> {
    if is_valid_document_id(id) {
        Ok(())
    } else {
        Err(ApiError::bad_request("Invalid submission id"))
    }
}
