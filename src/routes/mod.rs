pub mod alerts;
pub mod dashboard;
pub mod devices;
mod extract;
pub mod health;
pub mod occupancy;
mod rate_limit;
pub mod telemetry;
pub mod zones;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use uuid::Uuid;

pub use extract::AppJson;
use rate_limit::FallbackIpKeyExtractor;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::common::AppState;
use crate::config::ConfigError;
use crate::entity::zones as zone_entity;
use crate::error::{AppError, AppResult};

/// Resolve a zone by UUID or name (case-insensitive)
pub async fn resolve_zone(state: &AppState, id_or_name: &str) -> AppResult<zone_entity::Model> {
    let not_found = || AppError::NotFound(format!("Zone '{id_or_name}' not found"));

    // Try UUID first
    if let Ok(uuid) = id_or_name.parse::<Uuid>() {
        return state.store.find_zone(uuid).await?.ok_or_else(not_found);
    }

    let wanted = id_or_name.trim().to_lowercase();
    state
        .store
        .list_zones()
        .await?
        .into_iter()
        .find(|z| z.name.to_lowercase() == wanted)
        .ok_or_else(not_found)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthz,
        telemetry::create_telemetry,
        telemetry::create_telemetry_bulk,
        occupancy::create_occupancy_event,
        dashboard::get_summary,
        dashboard::get_hourly,
        devices::list_devices,
        devices::list_device_telemetry,
        alerts::list_alerts,
        alerts::get_alert,
        alerts::acknowledge_alert,
        zones::list_zones,
        zones::set_zone_target,
    ),
    components(
        schemas(
            health::HealthResponse,
            crate::services::ingestion::TelemetrySubmission,
            crate::services::ingestion::OccupancySubmission,
            crate::services::ingestion::BatchFailure,
            crate::services::aggregation::DashboardSummary,
            crate::services::aggregation::ZoneSummary,
            crate::services::aggregation::HourlyUsage,
            crate::services::aggregation::DeviceStatus,
            crate::services::aggregation::DeviceStatusReport,
            crate::entity::alerts::Severity,
            telemetry::TelemetryResponse,
            telemetry::BulkTelemetrySuccess,
            telemetry::BulkTelemetryResponse,
            occupancy::OccupancyEventResponse,
            alerts::AlertResponse,
            alerts::AcknowledgeResponse,
            zones::ZoneResponse,
            zones::ZoneTargetRequest,
            zones::ZoneTargetResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "ingest", description = "Telemetry and occupancy submissions from devices"),
        (name = "dashboard", description = "Daily summary and hourly usage"),
        (name = "devices", description = "Device liveness and telemetry history"),
        (name = "alerts", description = "Alert listing and acknowledgment"),
        (name = "zones", description = "Zones and daily occupancy targets"),
    ),
    info(
        title = "Parkwatch API",
        description = "Parking-lot telemetry ingestion, alerting and occupancy dashboard",
        version = "0.1.0"
    )
)]
struct ApiDoc;

/// Build the application router.
///
/// # Errors
///
/// Fails if a rate limit is configured with a zero rate or burst.
pub fn build_router(state: AppState) -> AppResult<Router> {
    let config = &state.config;

    if config.disable_rate_limiting {
        tracing::warn!("Rate limiting DISABLED");
    } else {
        tracing::info!(
            ingest_rate = %format!("{}/s burst {}", config.rate_limit_ingest_per_second, config.rate_limit_ingest_burst),
            dashboard_rate = %format!("{}/s burst {}", config.rate_limit_dashboard_per_second, config.rate_limit_dashboard_burst),
            "Rate limiting configured"
        );
    }

    // Device submissions: high volume, small bodies
    let ingest_routes_base = Router::new()
        .route("/telemetry", post(telemetry::create_telemetry))
        .route("/telemetry/bulk", post(telemetry::create_telemetry_bulk))
        .route("/occupancy-events", post(occupancy::create_occupancy_event));

    // Operator-facing reads and actions
    let dashboard_routes_base = Router::new()
        .route("/dashboard/summary", get(dashboard::get_summary))
        .route("/dashboard/hourly", get(dashboard::get_hourly))
        .route("/devices", get(devices::list_devices))
        .route("/devices/{code}/telemetry", get(devices::list_device_telemetry))
        .route("/alerts", get(alerts::list_alerts))
        .route("/alerts/{alert_id}", get(alerts::get_alert))
        .route("/alerts/{alert_id}/acknowledge", patch(alerts::acknowledge_alert))
        .route("/zones", get(zones::list_zones))
        .route("/zones/{zone_id}/target", put(zones::set_zone_target));

    // Combine API routes, conditionally applying rate limiting
    let api_routes = if config.disable_rate_limiting {
        Router::new()
            .merge(ingest_routes_base)
            .merge(dashboard_routes_base)
    } else {
        let limiter = |name: &'static str, per_second: u64, burst: u32| {
            GovernorConfigBuilder::default()
                .key_extractor(FallbackIpKeyExtractor)
                .per_second(per_second)
                .burst_size(burst)
                .finish()
                .map(|limiter| GovernorLayer {
                    config: Arc::new(limiter),
                })
                .ok_or_else(|| {
                    AppError::Config(ConfigError::Invalid(
                        name,
                        format!("{per_second}/s burst {burst}"),
                    ))
                })
        };

        let ingest_limiter = limiter(
            "RATE_LIMIT_INGEST_PER_SECOND",
            config.rate_limit_ingest_per_second,
            config.rate_limit_ingest_burst,
        )?;
        let dashboard_limiter = limiter(
            "RATE_LIMIT_DASHBOARD_PER_SECOND",
            config.rate_limit_dashboard_per_second,
            config.rate_limit_dashboard_burst,
        )?;

        Router::new()
            .merge(ingest_routes_base.layer(ingest_limiter))
            .merge(dashboard_routes_base.layer(dashboard_limiter))
    }
    .layer(RequestBodyLimitLayer::new(1024 * 1024)); // 1MB body limit

    // Health check routes (NO rate limiting)
    let health_routes = Router::new().route("/healthz", get(health::healthz));

    // OpenAPI documentation
    let docs_routes = Router::new().merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    Ok(Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(docs_routes)
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
