use axum::{
    extract::{Extension, Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures_util::{Stream, StreamExt};
use marquee_reserve::{Hold, HoldState};
use marquee_shared::models::events::{HoldActivity, HoldActivityEvent};
use marquee_shared::pii::Masked;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tracing::info;
use uuid::Uuid;

use crate::error::{reserve_error, AppError};
use crate::middleware::auth::SessionClaims;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CreateHoldRequest {
    unit_id: Uuid,
    quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct HoldResponse {
    pub hold_id: Uuid,
    pub unit_id: Uuid,
    pub quantity: i32,
    pub state: HoldState,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<Hold> for HoldResponse {
    fn from(hold: Hold) -> Self {
        Self {
            hold_id: hold.id,
            unit_id: hold.unit_id,
            quantity: hold.quantity,
            state: hold.state,
            created_at: hold.created_at,
            expires_at: hold.expires_at,
        }
    }
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/holds", post(create_hold).get(list_holds))
        .route("/v1/holds/{hold_id}/confirm", post(confirm_hold))
        .route("/v1/holds/{hold_id}/release", post(release_hold))
        .route("/v1/events/{event_id}/stream", get(stream_hold_activity))
        .layer(axum::middleware::from_fn_with_state(
            state,
            crate::middleware::auth::session_auth_middleware,
        ))
}

async fn create_hold(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(req): Json<CreateHoldRequest>,
) -> Result<Json<HoldResponse>, AppError> {
    if req.quantity > state.business_rules.max_quantity_per_hold {
        return Err(AppError::ValidationError(format!(
            "quantity {} exceeds the per-hold limit of {}",
            req.quantity, state.business_rules.max_quantity_per_hold
        )));
    }

    let hold = state
        .manager
        .request_hold(req.unit_id, &claims.sub, req.quantity)
        .await
        .map_err(reserve_error)?;

    if let Some(email) = &claims.email {
        info!("Hold {} placed by {}", hold.id, Masked(email));
    }

    publish_activity(&state, &hold, HoldActivity::Created).await;

    Ok(Json(hold.into()))
}

async fn confirm_hold(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(hold_id): Path<Uuid>,
) -> Result<Json<HoldResponse>, AppError> {
    let hold = state
        .manager
        .confirm_hold(hold_id, &claims.sub)
        .await
        .map_err(reserve_error)?;

    info!("Hold {} confirmed", hold.id);
    publish_activity(&state, &hold, HoldActivity::Confirmed).await;

    Ok(Json(hold.into()))
}

async fn release_hold(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(hold_id): Path<Uuid>,
) -> Result<Json<HoldResponse>, AppError> {
    let hold = state
        .manager
        .release_hold(hold_id, &claims.sub)
        .await
        .map_err(reserve_error)?;

    if hold.state == HoldState::Released {
        publish_activity(&state, &hold, HoldActivity::Released).await;
    }

    Ok(Json(hold.into()))
}

async fn list_holds(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<Vec<HoldResponse>>, AppError> {
    let holds = state
        .manager
        .holds_for_owner(&claims.sub)
        .await
        .map_err(reserve_error)?;

    Ok(Json(holds.into_iter().map(HoldResponse::from).collect()))
}

/// SSE feed of hold activity for one event page, so open browsers can
/// refresh seat maps without polling.
async fn stream_hold_activity(
    State(state): State<AppState>,
    Extension(_claims): Extension<SessionClaims>,
    Path(event_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.sse_tx.subscribe();

    let stream = tokio_stream::wrappers::BroadcastStream::new(rx).filter_map(move |result| {
        async move {
            match result {
                Ok(activity) if activity.event_id == event_id => {
                    let data = serde_json::to_string(&activity).ok()?;
                    Some(Ok::<_, Infallible>(
                        Event::default().event("hold_activity").data(data),
                    ))
                }
                // Other events' activity, or a lagged receiver: skip
                _ => None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Push a lifecycle change to Kafka and to SSE subscribers. Best effort on
/// both legs; the reservation itself has already committed.
pub(crate) async fn publish_activity(state: &AppState, hold: &Hold, activity: HoldActivity) {
    let snapshot = match state.manager.unit_availability(hold.unit_id).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!("Skipping activity publish for hold {}: {}", hold.id, e);
            return;
        }
    };

    let event = HoldActivityEvent {
        hold_id: hold.id,
        event_id: snapshot.event_id,
        unit_id: hold.unit_id,
        tier_name: snapshot.tier_name.clone(),
        activity,
        quantity: hold.quantity,
        available_quantity: snapshot.available_quantity,
        occurred_at: Utc::now().timestamp(),
    };

    if let Ok(payload) = serde_json::to_string(&event) {
        let _ = state
            .kafka
            .publish(activity.topic(), &hold.unit_id.to_string(), &payload)
            .await;
    }

    let _ = state.sse_tx.send(event);
}
