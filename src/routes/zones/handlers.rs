use axum::{
    extract::{Path, State},
    Json,
};
use std::collections::HashMap;

use crate::common::AppState;
use crate::error::AppResult;
use crate::routes::{resolve_zone, AppJson};

use super::types::{ZoneResponse, ZoneTargetRequest, ZoneTargetResponse};

/// List all zones with their daily targets
#[utoipa::path(
    get,
    path = "/api/zones",
    responses(
        (status = 200, description = "Zones retrieved successfully", body = Vec<ZoneResponse>),
    ),
    tag = "zones"
)]
pub async fn list_zones(State(state): State<AppState>) -> AppResult<Json<Vec<ZoneResponse>>> {
    let (zones_list, targets) =
        futures::try_join!(state.store.list_zones(), state.store.list_zone_targets())?;

    let targets: HashMap<_, _> = targets
        .into_iter()
        .map(|t| (t.zone_id, t.daily_target_occupancy))
        .collect();

    let response: Vec<ZoneResponse> = zones_list
        .into_iter()
        .map(|z| ZoneResponse {
            daily_target_occupancy: targets.get(&z.id).copied(),
            id: z.id,
            facility_id: z.facility_id,
            name: z.name,
            description: z.description,
        })
        .collect();

    Ok(Json(response))
}

/// Set the daily occupancy target of a zone
#[utoipa::path(
    put,
    path = "/api/zones/{zone_id}/target",
    params(
        ("zone_id" = String, Path, description = "Zone UUID or name"),
    ),
    request_body = ZoneTargetRequest,
    responses(
        (status = 200, description = "Target stored", body = ZoneTargetResponse),
        (status = 400, description = "Negative target"),
        (status = 404, description = "Zone not found"),
    ),
    tag = "zones"
)]
pub async fn set_zone_target(
    State(state): State<AppState>,
    Path(zone_id): Path<String>,
    AppJson(request): AppJson<ZoneTargetRequest>,
) -> AppResult<Json<ZoneTargetResponse>> {
    let zone = resolve_zone(&state, &zone_id).await?;

    let target = state
        .aggregation
        .set_zone_target(zone.id, request.daily_target_occupancy)
        .await?;

    Ok(Json(ZoneTargetResponse {
        zone_id: target.zone_id,
        zone_name: zone.name,
        daily_target_occupancy: target.daily_target_occupancy,
        updated_at: target.updated_at,
    }))
}
