use axum::extract::State;
use axum::Json;

use rabbit_models::Notification;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

const NOTIFICATION_LIMIT: i32 = 50;

/// The caller's most recent notifications, newest first.
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Notification>>> {
    let account = state.user_service.require_user(&user.email).await?;
    Ok(Json(
        state
            .notifications
            .list_recent(&account.email, NOTIFICATION_LIMIT)
            .await?,
    ))
}
