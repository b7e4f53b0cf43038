use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use marquee_reserve::ReserveError;
use marquee_shared::models::events::HoldActivity;
use serde::Deserialize;
use uuid::Uuid;

use crate::holds::publish_activity;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StripeWebhook {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: PaymentIntentObject,
}

#[derive(Debug, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    pub status: String,
    pub metadata: Option<serde_json::Value>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/webhooks/payments/stripe", post(handle_stripe_webhook))
}

/// Payment collaborator signal: success confirms the hold named in the
/// intent metadata, failure/cancel releases it.
///
/// Business rejections (expired hold, duplicate delivery) are logged and
/// acknowledged with 200 so the provider stops retrying; only storage
/// trouble is surfaced as a 5xx.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    Json(payload): Json<StripeWebhook>,
) -> Result<StatusCode, StatusCode> {
    tracing::info!(
        "Received webhook: {} for intent {}",
        payload.type_,
        payload.data.object.id
    );

    let relevant = matches!(
        payload.type_.as_str(),
        "payment_intent.succeeded" | "payment_intent.payment_failed" | "payment_intent.canceled"
    );
    if !relevant {
        return Ok(StatusCode::OK);
    }

    let metadata = payload
        .data
        .object
        .metadata
        .ok_or(StatusCode::BAD_REQUEST)?;
    let hold_id = metadata
        .get("hold_id")
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(StatusCode::BAD_REQUEST)?;
    let owner_id = metadata
        .get("owner_id")
        .and_then(|v| v.as_str())
        .ok_or(StatusCode::BAD_REQUEST)?
        .to_string();

    if payload.type_ == "payment_intent.succeeded" {
        match state.manager.confirm_hold(hold_id, &owner_id).await {
            Ok(hold) => {
                tracing::info!("Hold {} confirmed via payment webhook", hold.id);
                publish_activity(&state, &hold, HoldActivity::Confirmed).await;
            }
            Err(ReserveError::Expired) => {
                // Payment landed after the TTL; refund flow picks this up
                tracing::warn!("Payment succeeded for expired hold {}", hold_id);
            }
            Err(ReserveError::AlreadyFinalized) => {
                tracing::info!("Duplicate webhook delivery for hold {}", hold_id);
            }
            Err(ReserveError::StorageUnavailable(e)) => {
                tracing::error!("Webhook confirm failed for hold {}: {}", hold_id, e);
                return Err(StatusCode::INTERNAL_SERVER_ERROR);
            }
            Err(e) => {
                tracing::warn!("Webhook confirm rejected for hold {}: {}", hold_id, e);
            }
        }
    } else {
        match state.manager.release_hold(hold_id, &owner_id).await {
            Ok(hold) => {
                tracing::info!(
                    "Hold {} released via payment webhook ({})",
                    hold.id,
                    payload.type_
                );
                publish_activity(&state, &hold, HoldActivity::Released).await;
            }
            Err(ReserveError::StorageUnavailable(e)) => {
                tracing::error!("Webhook release failed for hold {}: {}", hold_id, e);
                return Err(StatusCode::INTERNAL_SERVER_ERROR);
            }
            Err(e) => {
                tracing::warn!("Webhook release rejected for hold {}: {}", hold_id, e);
            }
        }
    }

    Ok(StatusCode::OK)
}
