use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::AppState;
use crate::entity::occupancy_events;
use crate::error::AppResult;
use crate::routes::AppJson;
use crate::services::ingestion::OccupancySubmission;

#[derive(Debug, Serialize, ToSchema)]
pub struct OccupancyEventResponse {
    pub id: Uuid,
    pub device_id: Uuid,
    pub is_occupied: bool,
    pub timestamp: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
}

impl From<occupancy_events::Model> for OccupancyEventResponse {
    fn from(e: occupancy_events::Model) -> Self {
        Self {
            id: e.id,
            device_id: e.device_id,
            is_occupied: e.is_occupied,
            timestamp: e.timestamp,
            received_at: e.received_at,
        }
    }
}

/// Record a slot becoming occupied or free
#[utoipa::path(
    post,
    path = "/api/occupancy-events",
    request_body = OccupancySubmission,
    responses(
        (status = 201, description = "Event stored", body = OccupancyEventResponse),
        (status = 400, description = "Malformed event"),
        (status = 404, description = "Unknown device"),
        (status = 422, description = "Device is inactive"),
    ),
    tag = "ingest"
)]
pub async fn create_occupancy_event(
    State(state): State<AppState>,
    AppJson(submission): AppJson<OccupancySubmission>,
) -> AppResult<(StatusCode, Json<OccupancyEventResponse>)> {
    let event = state.ingestion.submit_occupancy_event(submission).await?;
    Ok((StatusCode::CREATED, Json(event.into())))
}
