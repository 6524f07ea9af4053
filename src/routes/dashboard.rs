use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::routes::resolve_zone;
use crate::services::aggregation::{DashboardSummary, HourlyUsage};

#[derive(Debug, Deserialize, IntoParams)]
pub struct SummaryQuery {
    /// Day to summarise (YYYY-MM-DD). Defaults to today; unparseable values are ignored.
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HourlyQuery {
    /// Zone UUID or name (required)
    pub zone: Option<String>,
    /// Day to bucket (YYYY-MM-DD). Defaults to today.
    pub date: Option<String>,
}

/// Daily occupancy, activity and per-zone efficiency
#[utoipa::path(
    get,
    path = "/api/dashboard/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Summary computed", body = DashboardSummary),
    ),
    tag = "dashboard"
)]
pub async fn get_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> AppResult<Json<DashboardSummary>> {
    let summary = state
        .aggregation
        .dashboard_summary(query.date.as_deref())
        .await?;
    Ok(Json(summary))
}

/// Occupied events per hour for one zone
#[utoipa::path(
    get,
    path = "/api/dashboard/hourly",
    params(HourlyQuery),
    responses(
        (status = 200, description = "Hourly buckets, ascending; empty hours omitted", body = Vec<HourlyUsage>),
        (status = 400, description = "Missing zone parameter"),
        (status = 404, description = "Zone not found"),
    ),
    tag = "dashboard"
)]
pub async fn get_hourly(
    State(state): State<AppState>,
    Query(query): Query<HourlyQuery>,
) -> AppResult<Json<Vec<HourlyUsage>>> {
    let zone_param = query
        .zone
        .as_deref()
        .filter(|z| !z.trim().is_empty())
        .ok_or_else(|| AppError::Validation("zone parameter required".to_string()))?;

    let zone = resolve_zone(&state, zone_param).await?;
    let usage = state
        .aggregation
        .hourly_usage(zone.id, query.date.as_deref())
        .await?;
    Ok(Json(usage))
}
