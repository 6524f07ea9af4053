use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::store::AlertFilter;

use super::types::{AcknowledgeResponse, AlertResponse, AlertsQuery};

/// List alerts, newest first
#[utoipa::path(
    get,
    path = "/api/alerts",
    params(AlertsQuery),
    responses(
        (status = 200, description = "Alerts retrieved successfully", body = Vec<AlertResponse>),
        (status = 404, description = "Device not found"),
    ),
    tag = "alerts"
)]
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> AppResult<Json<Vec<AlertResponse>>> {
    let device_id = match query.device.as_deref() {
        Some(code) => Some(
            state
                .store
                .find_device_by_code(code)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Device '{code}' not found")))?
                .id,
        ),
        None => None,
    };

    let filter = AlertFilter {
        severity: query.severity,
        is_acknowledged: query.is_acknowledged,
        device_id,
        open_only: query.open.unwrap_or(false),
    };

    let alerts = state.alerts.list(&filter).await?;
    Ok(Json(alerts.into_iter().map(Into::into).collect()))
}

/// Get a single alert
#[utoipa::path(
    get,
    path = "/api/alerts/{alert_id}",
    params(
        ("alert_id" = Uuid, Path, description = "Alert UUID"),
    ),
    responses(
        (status = 200, description = "Alert retrieved successfully", body = AlertResponse),
        (status = 404, description = "Alert not found"),
    ),
    tag = "alerts"
)]
pub async fn get_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<Uuid>,
) -> AppResult<Json<AlertResponse>> {
    Ok(Json(state.alerts.get(alert_id).await?.into()))
}

/// Acknowledge an alert, which also resolves it
#[utoipa::path(
    patch,
    path = "/api/alerts/{alert_id}/acknowledge",
    params(
        ("alert_id" = Uuid, Path, description = "Alert UUID"),
    ),
    responses(
        (status = 200, description = "Alert acknowledged", body = AcknowledgeResponse),
        (status = 404, description = "Alert not found"),
    ),
    tag = "alerts"
)]
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<Uuid>,
) -> AppResult<Json<AcknowledgeResponse>> {
    let alert = state
        .alerts
        .acknowledge(alert_id, state.clock.now())
        .await?;

    Ok(Json(AcknowledgeResponse {
        status: "acknowledged".to_string(),
        alert: alert.into(),
    }))
}
