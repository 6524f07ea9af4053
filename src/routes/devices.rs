use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::routes::telemetry::TelemetryResponse;
use crate::services::aggregation::DeviceStatusReport;
use crate::store::TelemetryFilter;

const MAX_TELEMETRY_ROWS: u64 = 1000;

#[derive(Debug, Deserialize, IntoParams)]
pub struct DeviceTelemetryQuery {
    /// Start of time range (ISO 8601, inclusive)
    pub start: Option<DateTime<Utc>>,
    /// End of time range (ISO 8601, inclusive)
    pub end: Option<DateTime<Utc>>,
}

/// Liveness of every active device
#[utoipa::path(
    get,
    path = "/api/devices",
    responses(
        (status = 200, description = "Device statuses", body = Vec<DeviceStatusReport>),
    ),
    tag = "devices"
)]
pub async fn list_devices(State(state): State<AppState>) -> AppResult<Json<Vec<DeviceStatusReport>>> {
    Ok(Json(state.aggregation.device_statuses().await?))
}

/// Telemetry of one device, newest first
#[utoipa::path(
    get,
    path = "/api/devices/{code}/telemetry",
    params(
        ("code" = String, Path, description = "Device code"),
        DeviceTelemetryQuery,
    ),
    responses(
        (status = 200, description = "Readings, at most 1000", body = Vec<TelemetryResponse>),
        (status = 400, description = "Invalid time range"),
        (status = 404, description = "Device not found"),
    ),
    tag = "devices"
)]
pub async fn list_device_telemetry(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<DeviceTelemetryQuery>,
) -> AppResult<Json<Vec<TelemetryResponse>>> {
    if let (Some(start), Some(end)) = (query.start, query.end) {
        if start > end {
            return Err(AppError::Validation("start must be before end".to_string()));
        }
    }

    let device = state
        .store
        .find_device_by_code(&code)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Device '{code}' not found")))?;

    let readings = state
        .store
        .list_telemetry(&TelemetryFilter {
            device_id: Some(device.id),
            start: query.start,
            end: query.end,
            limit: Some(MAX_TELEMETRY_ROWS),
        })
        .await?;

    Ok(Json(readings.into_iter().map(Into::into).collect()))
}
