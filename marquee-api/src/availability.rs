use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use marquee_reserve::{TierAvailability, UnitAvailability};
use uuid::Uuid;

use crate::error::{reserve_error, AppError};
use crate::state::AppState;

/// Public read-only availability endpoints. No auth: event pages render
/// these before a session exists.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/events/{event_id}/tiers", get(list_event_tiers))
        .route(
            "/v1/events/{event_id}/tiers/{tier_name}/units",
            get(list_tier_units),
        )
        .route("/v1/units/{unit_id}/availability", get(get_unit_availability))
}

async fn list_event_tiers(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Vec<TierAvailability>>, AppError> {
    let tiers = state
        .manager
        .list_tier_availability(event_id)
        .await
        .map_err(reserve_error)?;
    Ok(Json(tiers))
}

async fn list_tier_units(
    State(state): State<AppState>,
    Path((event_id, tier_name)): Path<(Uuid, String)>,
) -> Result<Json<Vec<UnitAvailability>>, AppError> {
    let units = state
        .manager
        .tier_unit_availability(event_id, &tier_name)
        .await
        .map_err(reserve_error)?;
    Ok(Json(units))
}

async fn get_unit_availability(
    State(state): State<AppState>,
    Path(unit_id): Path<Uuid>,
) -> Result<Json<UnitAvailability>, AppError> {
    let snapshot = state
        .manager
        .unit_availability(unit_id)
        .await
        .map_err(reserve_error)?;
    Ok(Json(snapshot))
}
