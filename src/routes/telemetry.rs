use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::AppState;
use crate::entity::telemetry_readings;
use crate::error::{AppError, AppResult};
use crate::routes::AppJson;
use crate::services::ingestion::{BatchFailure, TelemetrySubmission};

/// Stored telemetry reading
#[derive(Debug, Serialize, ToSchema)]
pub struct TelemetryResponse {
    pub id: Uuid,
    pub device_id: Uuid,
    pub voltage: f64,
    pub current: f64,
    pub power_factor: f64,
    pub timestamp: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
}

impl From<telemetry_readings::Model> for TelemetryResponse {
    fn from(r: telemetry_readings::Model) -> Self {
        Self {
            id: r.id,
            device_id: r.device_id,
            voltage: r.voltage,
            current: r.current,
            power_factor: r.power_factor,
            timestamp: r.timestamp,
            received_at: r.received_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkTelemetrySuccess {
    /// Position in the submitted array
    pub index: usize,
    #[serde(flatten)]
    pub reading: TelemetryResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkTelemetryResponse {
    pub success: Vec<BulkTelemetrySuccess>,
    pub errors: Vec<BatchFailure>,
}

/// Submit one telemetry reading
#[utoipa::path(
    post,
    path = "/api/telemetry",
    request_body = TelemetrySubmission,
    responses(
        (status = 201, description = "Reading stored", body = TelemetryResponse),
        (status = 400, description = "Malformed reading"),
        (status = 404, description = "Unknown device"),
        (status = 409, description = "Reading already recorded for this timestamp"),
        (status = 422, description = "Device is inactive"),
    ),
    tag = "ingest"
)]
pub async fn create_telemetry(
    State(state): State<AppState>,
    AppJson(submission): AppJson<TelemetrySubmission>,
) -> AppResult<(StatusCode, Json<TelemetryResponse>)> {
    let reading = state.ingestion.submit_telemetry(submission).await?;
    Ok((StatusCode::CREATED, Json(reading.into())))
}

/// Submit a list of telemetry readings
///
/// Each item is processed on its own. The response lists stored readings and
/// rejected items by their index; 207 is returned when anything was rejected.
#[utoipa::path(
    post,
    path = "/api/telemetry/bulk",
    request_body = Vec<TelemetrySubmission>,
    responses(
        (status = 201, description = "All readings stored", body = BulkTelemetryResponse),
        (status = 207, description = "Some readings rejected", body = BulkTelemetryResponse),
        (status = 400, description = "Body is not a list"),
    ),
    tag = "ingest"
)]
pub async fn create_telemetry_bulk(
    State(state): State<AppState>,
    AppJson(body): AppJson<serde_json::Value>,
) -> AppResult<(StatusCode, Json<BulkTelemetryResponse>)> {
    let serde_json::Value::Array(items) = body else {
        return Err(AppError::Validation(
            "Expected a list of telemetry records.".to_string(),
        ));
    };

    let submissions = items.into_iter().map(|item| {
        serde_json::from_value::<TelemetrySubmission>(item)
            .map_err(|e| AppError::Validation(e.to_string()))
    });

    let outcome = state.ingestion.submit_telemetry_batch(submissions).await;

    let status = if outcome.has_failures() {
        StatusCode::MULTI_STATUS
    } else {
        StatusCode::CREATED
    };

    let response = BulkTelemetryResponse {
        success: outcome
            .succeeded
            .into_iter()
            .map(|s| BulkTelemetrySuccess {
                index: s.index,
                reading: s.record.into(),
            })
            .collect(),
        errors: outcome.failed,
    };

    Ok((status, Json(response)))
}
