//! Persistence seam for the ingestion, alerting and aggregation services.
//!
//! [`Store`] is implemented by [`PgStore`] (sea-orm on PostgreSQL) and by
//! [`MemoryStore`] (in-process tables, used by the test-suite).
//!
//! Two operations carry invariants rather than plain CRUD:
//!
//! - [`Store::insert_telemetry`] rejects a second reading for the same
//!   `(device, timestamp)` with [`AppError::Conflict`](crate::error::AppError::Conflict).
//! - [`Store::insert_alert`] inserts only if no open alert with the same
//!   `(device, severity, rule_category)` exists, as one atomic step.
//! - [`Store::insert_telemetry`] and [`Store::insert_occupancy_event`] check
//!   that the device is still active as part of the write, so a stale device
//!   lookup cannot store data for a disabled device.
//!
//! The per-device aggregate queries (`latest_*_by_device`, `*_counts_by_device`)
//! exist so dashboards are computed from a fixed number of queries instead of
//! one query per device.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::entity::alerts::Severity;
use crate::entity::{alerts, devices, occupancy_events, telemetry_readings, zone_targets, zones};
use crate::error::AppResult;

/// Half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    #[must_use]
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t < self.end
    }
}

#[derive(Debug, Clone)]
pub struct NewTelemetry {
    pub device_id: Uuid,
    pub voltage: f64,
    pub current: f64,
    pub power_factor: f64,
    pub timestamp: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOccupancyEvent {
    pub device_id: Uuid,
    pub is_occupied: bool,
    pub timestamp: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAlert {
    pub device_id: Option<Uuid>,
    pub severity: Severity,
    pub rule_category: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Mutable fields of an alert.
#[derive(Debug, Clone, Copy)]
pub struct AlertUpdate {
    pub is_acknowledged: bool,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct DeviceFilter {
    pub zone_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

impl DeviceFilter {
    #[must_use]
    pub fn active() -> Self {
        Self {
            zone_id: None,
            is_active: Some(true),
        }
    }

    pub(crate) fn matches(&self, device: &devices::Model) -> bool {
        self.zone_id.is_none_or(|z| device.zone_id == z)
            && self.is_active.is_none_or(|a| device.is_active == a)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub severity: Option<Severity>,
    pub is_acknowledged: Option<bool>,
    pub device_id: Option<Uuid>,
    /// Only alerts with `resolved_at` unset
    pub open_only: bool,
}

impl AlertFilter {
    pub(crate) fn matches(&self, alert: &alerts::Model) -> bool {
        self.severity.is_none_or(|s| alert.severity == s)
            && self.is_acknowledged.is_none_or(|a| alert.is_acknowledged == a)
            && self.device_id.is_none_or(|d| alert.device_id == Some(d))
            && (!self.open_only || alert.is_open())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TelemetryFilter {
    pub device_id: Option<Uuid>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
}

impl TelemetryFilter {
    pub(crate) fn matches(&self, reading: &telemetry_readings::Model) -> bool {
        self.device_id.is_none_or(|d| reading.device_id == d)
            && self.start.is_none_or(|s| reading.timestamp >= s)
            && self.end.is_none_or(|e| reading.timestamp <= e)
    }
}

#[derive(Debug, Clone, Default)]
pub struct OccupancyFilter {
    pub device_ids: Option<Vec<Uuid>>,
    pub window: Option<TimeWindow>,
}

impl OccupancyFilter {
    pub(crate) fn matches(&self, event: &occupancy_events::Model) -> bool {
        self.device_ids
            .as_ref()
            .is_none_or(|ids| ids.contains(&event.device_id))
            && self.window.is_none_or(|w| w.contains(event.timestamp))
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    // ---- Hierarchy ----

    async fn list_zones(&self) -> AppResult<Vec<zones::Model>>;

    async fn find_zone(&self, id: Uuid) -> AppResult<Option<zones::Model>>;

    async fn list_devices(&self, filter: &DeviceFilter) -> AppResult<Vec<devices::Model>>;

    async fn find_device_by_code(&self, code: &str) -> AppResult<Option<devices::Model>>;

    async fn list_zone_targets(&self) -> AppResult<Vec<zone_targets::Model>>;

    async fn upsert_zone_target(
        &self,
        zone_id: Uuid,
        daily_target_occupancy: i32,
        updated_at: DateTime<Utc>,
    ) -> AppResult<zone_targets::Model>;

    // ---- Telemetry ----

    async fn exists_telemetry(&self, device_id: Uuid, timestamp: DateTime<Utc>) -> AppResult<bool>;

    /// Fails with `Conflict` if `(device_id, timestamp)` is already stored and
    /// with `Inactive` if the device is not active at write time.
    async fn insert_telemetry(&self, reading: NewTelemetry)
    -> AppResult<telemetry_readings::Model>;

    /// Newest first.
    async fn list_telemetry(
        &self,
        filter: &TelemetryFilter,
    ) -> AppResult<Vec<telemetry_readings::Model>>;

    /// Latest reading timestamp of every device that has any telemetry.
    async fn latest_telemetry_by_device(&self) -> AppResult<HashMap<Uuid, DateTime<Utc>>>;

    // ---- Occupancy ----

    /// Fails with `Inactive` if the device is not active at write time.
    async fn insert_occupancy_event(
        &self,
        event: NewOccupancyEvent,
    ) -> AppResult<occupancy_events::Model>;

    /// Newest first.
    async fn list_occupancy_events(
        &self,
        filter: &OccupancyFilter,
    ) -> AppResult<Vec<occupancy_events::Model>>;

    async fn occupancy_counts_by_device(&self, window: TimeWindow)
    -> AppResult<HashMap<Uuid, u64>>;

    /// `is_occupied` of each device's most recent event, over all time.
    async fn latest_occupancy_by_device(&self) -> AppResult<HashMap<Uuid, bool>>;

    // ---- Alerts ----

    /// Insert unless an open alert with the same device, severity and rule
    /// category exists. Returns `None` when the insert was skipped.
    async fn insert_alert(&self, alert: NewAlert) -> AppResult<Option<alerts::Model>>;

    async fn find_open_alert(
        &self,
        device_id: Option<Uuid>,
        severity: Severity,
        rule_category: &str,
    ) -> AppResult<Option<alerts::Model>>;

    async fn find_alert(&self, id: Uuid) -> AppResult<Option<alerts::Model>>;

    async fn update_alert(&self, id: Uuid, update: AlertUpdate)
    -> AppResult<Option<alerts::Model>>;

    /// Newest first.
    async fn list_alerts(&self, filter: &AlertFilter) -> AppResult<Vec<alerts::Model>>;

    async fn count_alerts(&self, window: TimeWindow) -> AppResult<u64>;

    /// Alerts created strictly after `since`, per device. Device-less alerts are skipped.
    async fn alert_counts_by_device(&self, since: DateTime<Utc>) -> AppResult<HashMap<Uuid, u64>>;
}
