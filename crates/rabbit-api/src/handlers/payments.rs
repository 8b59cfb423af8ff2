//! Coin purchase handlers and the payment provider webhook.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use rabbit_models::{CoinPackage, Payment, COIN_PACKAGES};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::services::CreditOutcome;
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "stripe-signature";

/// The fixed coin package catalogue.
pub async fn list_packages(_user: AuthUser) -> Json<Vec<CoinPackage>> {
    Json(COIN_PACKAGES.to_vec())
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateIntentRequest {
    #[validate(length(min = 1, max = 64))]
    pub package_id: String,
}

#[derive(Serialize)]
pub struct CreateIntentResponse {
    pub payment_intent_id: String,
    pub client_secret: Option<String>,
    pub amount_cents: i64,
    pub coins: i64,
}

pub async fn create_intent(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateIntentRequest>,
) -> ApiResult<Json<CreateIntentResponse>> {
    request.validate()?;
    let buyer = state.user_service.require_user(&user.email).await?;

    let (intent, package) = state
        .purchase_service
        .create_intent(&buyer, request.package_id.trim())
        .await?;

    Ok(Json(CreateIntentResponse {
        payment_intent_id: intent.id,
        client_secret: intent.client_secret,
        amount_cents: package.price_cents,
        coins: package.coins,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ConfirmPaymentRequest {
    #[validate(length(min = 1, max = 255))]
    pub payment_intent_id: String,
}

#[derive(Serialize)]
pub struct ConfirmPaymentResponse {
    pub message: String,
    pub credited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coins_added: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coins: Option<i64>,
}

impl From<CreditOutcome> for ConfirmPaymentResponse {
    fn from(outcome: CreditOutcome) -> Self {
        match outcome {
            CreditOutcome::Credited { coins, balance } => Self {
                message: "Coins added to your account".to_string(),
                credited: true,
                coins_added: Some(coins),
                coins: Some(balance),
            },
            CreditOutcome::AlreadyCredited => Self {
                message: "Payment was already credited".to_string(),
                credited: false,
                coins_added: None,
                coins: None,
            },
        }
    }
}

/// Client-side confirmation after the card flow completes.
pub async fn confirm_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ConfirmPaymentRequest>,
) -> ApiResult<Json<ConfirmPaymentResponse>> {
    request.validate()?;
    let buyer = state.user_service.require_user(&user.email).await?;

    let outcome = state
        .purchase_service
        .confirm(&buyer, request.payment_intent_id.trim())
        .await?;
    if let CreditOutcome::Credited { coins, .. } = outcome {
        metrics::record_coins_moved("purchase", coins);
    }
    Ok(Json(outcome.into()))
}

/// The caller's payment history.
pub async fn my_payments(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Payment>>> {
    let buyer = state.user_service.require_user(&user.email).await?;
    Ok(Json(
        state
            .purchase_service
            .payments()
            .list_by_email(&buyer.email)
            .await?,
    ))
}

#[derive(Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Signed event delivery from the payment provider. Unauthenticated; the
/// signature header is the credential.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            metrics::record_webhook_event("missing_signature");
            ApiError::bad_request("Missing signature header")
        })?;

    let (event, outcome) = match state.purchase_service.handle_webhook(&body, signature).await {
        Ok(result) => result,
        Err(e) => {
            metrics::record_webhook_event("rejected");
            return Err(e);
        }
    };

    match outcome {
        Some(CreditOutcome::Credited { coins, .. }) => {
            metrics::record_webhook_event("credited");
            metrics::record_coins_moved("purchase", coins);
        }
        Some(CreditOutcome::AlreadyCredited) => metrics::record_webhook_event("duplicate"),
        None => metrics::record_webhook_event("ignored"),
    }
    info!(event_id = %event.id, event_type = %event.event_type, "Webhook processed");

    Ok(Json(WebhookAck { received: true }))
}
