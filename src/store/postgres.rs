//! sea-orm backed [`Store`] for PostgreSQL.
//!
//! Aggregates are plain SQL run through `query_all`, mapped with
//! `FromQueryResult`. Device lookups by code go through a short-lived moka
//! cache since every ingested record resolves its device first.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use sea_orm::{
    sea_query::OnConflict, ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait,
    DatabaseBackend, DatabaseConnection, DbErr, EntityTrait, FromQueryResult, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, Statement,
};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use super::{
    AlertFilter, AlertUpdate, DeviceFilter, NewAlert, NewOccupancyEvent, NewTelemetry,
    OccupancyFilter, Store, TelemetryFilter, TimeWindow,
};
use crate::config::Config;
use crate::entity::alerts::Severity;
use crate::entity::{alerts, devices, occupancy_events, telemetry_readings, zone_targets, zones};
use crate::error::{AppError, AppResult};

#[derive(Debug, FromQueryResult)]
struct LatestTimeRow {
    device_id: Uuid,
    latest: DateTime<Utc>,
}

#[derive(Debug, FromQueryResult)]
struct LatestStateRow {
    device_id: Uuid,
    is_occupied: bool,
}

#[derive(Debug, FromQueryResult)]
struct DeviceCountRow {
    device_id: Uuid,
    total: i64,
}

#[derive(Clone)]
pub struct PgStore {
    db: DatabaseConnection,
    devices_by_code: Cache<String, devices::Model>,
}

impl PgStore {
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &Config) -> Self {
        let devices_by_code = Cache::builder()
            .max_capacity(config.device_cache_max_entries)
            .time_to_live(Duration::from_secs(config.device_cache_ttl_seconds))
            .build();

        Self {
            db,
            devices_by_code,
        }
    }

    /// A guarded insert matched no active device. The cached lookup that let
    /// the write through is stale, so the cache is dropped.
    fn rejected_write(&self, device_id: Uuid) -> AppError {
        self.devices_by_code.invalidate_all();
        tracing::info!(device_id = %device_id, "Write rejected for inactive device");
        AppError::Inactive(format!("Device {device_id} is inactive"))
    }

    async fn counts_by_device(&self, stmt: Statement) -> AppResult<HashMap<Uuid, u64>> {
        let rows = self.db.query_all(stmt).await?;
        let mut counts = HashMap::with_capacity(rows.len());
        for row in rows {
            let row = DeviceCountRow::from_query_result(&row, "")?;
            counts.insert(row.device_id, u64::try_from(row.total).unwrap_or(0));
        }
        Ok(counts)
    }
}

/// Maps a unique index violation to `Conflict`, everything else to `Database`.
fn conflict_or_db(err: DbErr, message: impl FnOnce() -> String) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(message()),
        _ => AppError::Database(err),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn list_zones(&self) -> AppResult<Vec<zones::Model>> {
        Ok(zones::Entity::find()
            .order_by_asc(zones::Column::Name)
            .all(&self.db)
            .await?)
    }

    async fn find_zone(&self, id: Uuid) -> AppResult<Option<zones::Model>> {
        Ok(zones::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn list_devices(&self, filter: &DeviceFilter) -> AppResult<Vec<devices::Model>> {
        let mut query = devices::Entity::find();
        if let Some(zone_id) = filter.zone_id {
            query = query.filter(devices::Column::ZoneId.eq(zone_id));
        }
        if let Some(is_active) = filter.is_active {
            query = query.filter(devices::Column::IsActive.eq(is_active));
        }

        Ok(query
            .order_by_asc(devices::Column::Code)
            .all(&self.db)
            .await?)
    }

    async fn find_device_by_code(&self, code: &str) -> AppResult<Option<devices::Model>> {
        if let Some(device) = self.devices_by_code.get(code).await {
            return Ok(Some(device));
        }

        let device = devices::Entity::find()
            .filter(devices::Column::Code.eq(code))
            .one(&self.db)
            .await?;

        if let Some(ref found) = device {
            self.devices_by_code
                .insert(code.to_string(), found.clone())
                .await;
        }

        Ok(device)
    }

    async fn list_zone_targets(&self) -> AppResult<Vec<zone_targets::Model>> {
        Ok(zone_targets::Entity::find().all(&self.db).await?)
    }

    async fn upsert_zone_target(
        &self,
        zone_id: Uuid,
        daily_target_occupancy: i32,
        updated_at: DateTime<Utc>,
    ) -> AppResult<zone_targets::Model> {
        let model = zone_targets::ActiveModel {
            zone_id: Set(zone_id),
            daily_target_occupancy: Set(daily_target_occupancy),
            updated_at: Set(updated_at),
        };

        Ok(zone_targets::Entity::insert(model)
            .on_conflict(
                OnConflict::column(zone_targets::Column::ZoneId)
                    .update_columns([
                        zone_targets::Column::DailyTargetOccupancy,
                        zone_targets::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_with_returning(&self.db)
            .await?)
    }

    async fn exists_telemetry(&self, device_id: Uuid, timestamp: DateTime<Utc>) -> AppResult<bool> {
        let count = telemetry_readings::Entity::find()
            .filter(telemetry_readings::Column::DeviceId.eq(device_id))
            .filter(telemetry_readings::Column::Timestamp.eq(timestamp))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn insert_telemetry(
        &self,
        reading: NewTelemetry,
    ) -> AppResult<telemetry_readings::Model> {
        let timestamp = reading.timestamp;
        let device_id = reading.device_id;

        // Inserts nothing when the device has been disabled since it was cached
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            "INSERT INTO telemetry_readings \
                 (id, device_id, voltage, \"current\", power_factor, \"timestamp\", received_at) \
             SELECT $1, d.id, $3, $4, $5, $6, $7 FROM devices d \
             WHERE d.id = $2 AND d.is_active \
             RETURNING id, device_id, voltage, \"current\", power_factor, \"timestamp\", received_at",
            vec![
                Uuid::new_v4().into(),
                reading.device_id.into(),
                reading.voltage.into(),
                reading.current.into(),
                reading.power_factor.into(),
                reading.timestamp.into(),
                reading.received_at.into(),
            ],
        );

        let inserted = telemetry_readings::Entity::find()
            .from_raw_sql(stmt)
            .one(&self.db)
            .await
            .map_err(|e| {
                conflict_or_db(e, || {
                    format!("Telemetry already recorded for this device at {timestamp}")
                })
            })?;

        match inserted {
            Some(model) => Ok(model),
            None => Err(self.rejected_write(device_id)),
        }
    }

    async fn list_telemetry(
        &self,
        filter: &TelemetryFilter,
    ) -> AppResult<Vec<telemetry_readings::Model>> {
        let mut query = telemetry_readings::Entity::find();
        if let Some(device_id) = filter.device_id {
            query = query.filter(telemetry_readings::Column::DeviceId.eq(device_id));
        }
        if let Some(start) = filter.start {
            query = query.filter(telemetry_readings::Column::Timestamp.gte(start));
        }
        if let Some(end) = filter.end {
            query = query.filter(telemetry_readings::Column::Timestamp.lte(end));
        }

        Ok(query
            .order_by_desc(telemetry_readings::Column::Timestamp)
            .limit(filter.limit)
            .all(&self.db)
            .await?)
    }

    async fn latest_telemetry_by_device(&self) -> AppResult<HashMap<Uuid, DateTime<Utc>>> {
        let rows = self
            .db
            .query_all(Statement::from_string(
                DatabaseBackend::Postgres,
                "SELECT device_id, MAX(\"timestamp\") AS latest \
                 FROM telemetry_readings GROUP BY device_id",
            ))
            .await?;

        let mut latest = HashMap::with_capacity(rows.len());
        for row in rows {
            let row = LatestTimeRow::from_query_result(&row, "")?;
            latest.insert(row.device_id, row.latest);
        }
        Ok(latest)
    }

    async fn insert_occupancy_event(
        &self,
        event: NewOccupancyEvent,
    ) -> AppResult<occupancy_events::Model> {
        let device_id = event.device_id;
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            "INSERT INTO occupancy_events \
                 (id, device_id, is_occupied, \"timestamp\", received_at) \
             SELECT $1, d.id, $3, $4, $5 FROM devices d \
             WHERE d.id = $2 AND d.is_active \
             RETURNING id, device_id, is_occupied, \"timestamp\", received_at",
            vec![
                Uuid::new_v4().into(),
                event.device_id.into(),
                event.is_occupied.into(),
                event.timestamp.into(),
                event.received_at.into(),
            ],
        );

        match occupancy_events::Entity::find()
            .from_raw_sql(stmt)
            .one(&self.db)
            .await?
        {
            Some(model) => Ok(model),
            None => Err(self.rejected_write(device_id)),
        }
    }

    async fn list_occupancy_events(
        &self,
        filter: &OccupancyFilter,
    ) -> AppResult<Vec<occupancy_events::Model>> {
        let mut query = occupancy_events::Entity::find();
        if let Some(ids) = &filter.device_ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            query = query.filter(occupancy_events::Column::DeviceId.is_in(ids.clone()));
        }
        if let Some(window) = filter.window {
            query = query
                .filter(occupancy_events::Column::Timestamp.gte(window.start))
                .filter(occupancy_events::Column::Timestamp.lt(window.end));
        }

        Ok(query
            .order_by_desc(occupancy_events::Column::Timestamp)
            .all(&self.db)
            .await?)
    }

    async fn occupancy_counts_by_device(
        &self,
        window: TimeWindow,
    ) -> AppResult<HashMap<Uuid, u64>> {
        self.counts_by_device(Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            "SELECT device_id, COUNT(*) AS total FROM occupancy_events \
             WHERE \"timestamp\" >= $1 AND \"timestamp\" < $2 \
             GROUP BY device_id",
            vec![window.start.into(), window.end.into()],
        ))
        .await
    }

    async fn latest_occupancy_by_device(&self) -> AppResult<HashMap<Uuid, bool>> {
        let rows = self
            .db
            .query_all(Statement::from_string(
                DatabaseBackend::Postgres,
                "SELECT DISTINCT ON (device_id) device_id, is_occupied \
                 FROM occupancy_events \
                 ORDER BY device_id, \"timestamp\" DESC, received_at DESC",
            ))
            .await?;

        let mut latest = HashMap::with_capacity(rows.len());
        for row in rows {
            let row = LatestStateRow::from_query_result(&row, "")?;
            latest.insert(row.device_id, row.is_occupied);
        }
        Ok(latest)
    }

    async fn insert_alert(&self, alert: NewAlert) -> AppResult<Option<alerts::Model>> {
        // The partial unique index makes this a single check-and-insert
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            "INSERT INTO alerts \
                 (id, device_id, severity, rule_category, message, is_acknowledged, created_at) \
             VALUES ($1, $2, $3, $4, $5, FALSE, $6) \
             ON CONFLICT (device_id, severity, rule_category) WHERE resolved_at IS NULL \
             DO NOTHING \
             RETURNING id, device_id, severity, rule_category, message, \
                 is_acknowledged, created_at, resolved_at",
            vec![
                Uuid::new_v4().into(),
                alert.device_id.into(),
                alert.severity.to_value().into(),
                alert.rule_category.into(),
                alert.message.into(),
                alert.created_at.into(),
            ],
        );

        Ok(alerts::Entity::find()
            .from_raw_sql(stmt)
            .one(&self.db)
            .await?)
    }

    async fn find_open_alert(
        &self,
        device_id: Option<Uuid>,
        severity: Severity,
        rule_category: &str,
    ) -> AppResult<Option<alerts::Model>> {
        let mut query = alerts::Entity::find()
            .filter(alerts::Column::Severity.eq(severity))
            .filter(alerts::Column::RuleCategory.eq(rule_category))
            .filter(alerts::Column::ResolvedAt.is_null());

        query = match device_id {
            Some(id) => query.filter(alerts::Column::DeviceId.eq(id)),
            None => query.filter(alerts::Column::DeviceId.is_null()),
        };

        Ok(query.one(&self.db).await?)
    }

    async fn find_alert(&self, id: Uuid) -> AppResult<Option<alerts::Model>> {
        Ok(alerts::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn update_alert(
        &self,
        id: Uuid,
        update: AlertUpdate,
    ) -> AppResult<Option<alerts::Model>> {
        let Some(existing) = alerts::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let mut model: alerts::ActiveModel = existing.into();
        model.is_acknowledged = Set(update.is_acknowledged);
        model.resolved_at = Set(update.resolved_at);

        Ok(Some(model.update(&self.db).await?))
    }

    async fn list_alerts(&self, filter: &AlertFilter) -> AppResult<Vec<alerts::Model>> {
        let mut query = alerts::Entity::find();
        if let Some(severity) = filter.severity {
            query = query.filter(alerts::Column::Severity.eq(severity));
        }
        if let Some(is_acknowledged) = filter.is_acknowledged {
            query = query.filter(alerts::Column::IsAcknowledged.eq(is_acknowledged));
        }
        if let Some(device_id) = filter.device_id {
            query = query.filter(alerts::Column::DeviceId.eq(device_id));
        }
        if filter.open_only {
            query = query.filter(alerts::Column::ResolvedAt.is_null());
        }

        Ok(query
            .order_by_desc(alerts::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    async fn count_alerts(&self, window: TimeWindow) -> AppResult<u64> {
        Ok(alerts::Entity::find()
            .filter(alerts::Column::CreatedAt.gte(window.start))
            .filter(alerts::Column::CreatedAt.lt(window.end))
            .count(&self.db)
            .await?)
    }

    async fn alert_counts_by_device(&self, since: DateTime<Utc>) -> AppResult<HashMap<Uuid, u64>> {
        self.counts_by_device(Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            "SELECT device_id, COUNT(*) AS total FROM alerts \
             WHERE device_id IS NOT NULL AND created_at > $1 \
             GROUP BY device_id",
            vec![since.into()],
        ))
        .await
    }
}
