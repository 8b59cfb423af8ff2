//! Account handlers: registration, profile lookups and coin history.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use rabbit_firestore::{split_cursor, CoinTransactionRepository};
use rabbit_models::{normalize_email, CoinTransaction, User, UserRole};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::security::{
    is_valid_document_id, is_valid_email, sanitize_title, validate_optional_image_url,
};
use crate::services::GoogleLogin;
use crate::state::AppState;

/// Number of workers on the leaderboard.
const TOP_WORKERS: i32 = 6;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    pub role: UserRole,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Serialize)]
pub struct AccountResponse {
    pub message: String,
    pub user: User,
}

/// Register the caller's account.
pub async fn register(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AccountResponse>)> {
    request.validate()?;
    let image_url =
        validate_optional_image_url(request.image_url.as_deref()).map_err(ApiError::Validation)?;

    let account = state
        .user_service
        .register(&user, &sanitize_title(&request.name), request.role, image_url)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            message: "User registered successfully".to_string(),
            user: account,
        }),
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct GoogleLoginRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Sign in with a Google identity, creating a Worker account on first use.
pub async fn google_login(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<GoogleLoginRequest>,
) -> ApiResult<Json<AccountResponse>> {
    let name = request
        .name
        .as_deref()
        .or(user.name.as_deref())
        .map(sanitize_title)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| user.email.split('@').next().unwrap_or_default().to_string());
    let image_url = validate_optional_image_url(request.image_url.as_deref().or(user.picture.as_deref()))
        .map_err(ApiError::Validation)?;

    let response = match state.user_service.google_login(&user, &name, image_url).await? {
        GoogleLogin::Existing(account) => AccountResponse {
            message: "User already exists, logged in successfully".to_string(),
            user: account,
        },
        GoogleLogin::Created(account) => AccountResponse {
            message: "User created successfully".to_string(),
            user: account,
        },
    };
    Ok(Json(response))
}

/// Fetch a user document. Callers may read their own; admins may read any.
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(email): Path<String>,
) -> ApiResult<Json<User>> {
    let email = normalize_email(&email);
    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email"));
    }
    if email != user.email {
        state.user_service.require_admin(&user.email).await?;
    }
    Ok(Json(state.user_service.get(&email).await?))
}

#[derive(Serialize)]
pub struct CoinBalanceResponse {
    pub email: String,
    pub coins: i64,
}

pub async fn my_coins(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<CoinBalanceResponse>> {
    let account = state.user_service.require_user(&user.email).await?;
    Ok(Json(CoinBalanceResponse {
        email: account.email,
        coins: account.coins,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct TransactionQuery {
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct TransactionPage {
    pub transactions: Vec<CoinTransaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// The caller's ledger history, newest first.
pub async fn my_transactions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TransactionQuery>,
) -> ApiResult<Json<TransactionPage>> {
    query.validate()?;
    if let Some(cursor) = &query.cursor {
        let (timestamp, id) = split_cursor(cursor);
        let valid = chrono::DateTime::parse_from_rfc3339(timestamp).is_ok()
            && id.map_or(true, is_valid_document_id);
        if !valid {
            return Err(ApiError::bad_request("Invalid cursor"));
        }
    }

    let repo = CoinTransactionRepository::new((*state.firestore).clone(), &user.email);
    let (transactions, next_cursor) = repo.list_page(query.limit, query.cursor.as_deref()).await?;

    Ok(Json(TransactionPage {
        transactions,
        next_cursor,
    }))
}

#[derive(Serialize)]
pub struct TopWorker {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub coins: i64,
}

/// Workers with the highest balances.
pub async fn top_workers(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ApiResult<Json<Vec<TopWorker>>> {
    let workers = state.user_service.top_workers(TOP_WORKERS).await?;
    Ok(Json(
        workers
            .into_iter()
            .map(|u| TopWorker {
                name: u.name,
                image_url: u.image_url,
                coins: u.coins,
            })
            .collect(),
    ))
}
