//! In-process [`Store`] backed by plain vectors behind a `RwLock`.
//!
//! Used by the test-suite and for running the services without a database.
//! Every trait method takes the lock once, so check-then-write operations
//! such as [`Store::insert_alert`] are atomic here too.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AlertFilter, AlertUpdate, DeviceFilter, NewAlert, NewOccupancyEvent, NewTelemetry,
    OccupancyFilter, Store, TelemetryFilter, TimeWindow,
};
use crate::entity::alerts::Severity;
use crate::entity::{
    alerts, devices, facilities, occupancy_events, telemetry_readings, zone_targets, zones,
};
use crate::error::{AppError, AppResult};

#[derive(Debug, Default)]
struct Tables {
    facilities: Vec<facilities::Model>,
    zones: Vec<zones::Model>,
    devices: Vec<devices::Model>,
    telemetry: Vec<telemetry_readings::Model>,
    occupancy: Vec<occupancy_events::Model>,
    alerts: Vec<alerts::Model>,
    zone_targets: HashMap<Uuid, zone_targets::Model>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_facility(&self, name: &str, location: Option<&str>) -> facilities::Model {
        let facility = facilities::Model {
            id: Uuid::new_v4(),
            name: name.to_string(),
            location: location.map(str::to_string),
        };
        self.tables.write().await.facilities.push(facility.clone());
        facility
    }

    pub async fn add_zone(&self, facility_id: Uuid, name: &str) -> zones::Model {
        let zone = zones::Model {
            id: Uuid::new_v4(),
            facility_id,
            name: name.to_string(),
            description: None,
        };
        self.tables.write().await.zones.push(zone.clone());
        zone
    }

    pub async fn add_device(
        &self,
        zone_id: Uuid,
        code: &str,
        is_active: bool,
        installed_at: DateTime<Utc>,
    ) -> devices::Model {
        let device = devices::Model {
            id: Uuid::new_v4(),
            code: code.to_string(),
            zone_id,
            is_active,
            installed_at,
        };
        self.tables.write().await.devices.push(device.clone());
        device
    }

    /// Flip a device's active flag, as an operator would in the database.
    pub async fn set_device_active(&self, device_id: Uuid, is_active: bool) {
        let mut tables = self.tables.write().await;
        if let Some(device) = tables.devices.iter_mut().find(|d| d.id == device_id) {
            device.is_active = is_active;
        }
    }
}

impl Tables {
    fn ensure_active(&self, device_id: Uuid) -> AppResult<()> {
        match self.devices.iter().find(|d| d.id == device_id) {
            Some(device) if device.is_active => Ok(()),
            Some(device) => Err(AppError::Inactive(format!(
                "Device '{}' is inactive",
                device.code
            ))),
            None => Err(AppError::NotFound(format!("Device {device_id} not found"))),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_zones(&self) -> AppResult<Vec<zones::Model>> {
        let mut zones = self.tables.read().await.zones.clone();
        zones.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(zones)
    }

    async fn find_zone(&self, id: Uuid) -> AppResult<Option<zones::Model>> {
        let tables = self.tables.read().await;
        Ok(tables.zones.iter().find(|z| z.id == id).cloned())
    }

    async fn list_devices(&self, filter: &DeviceFilter) -> AppResult<Vec<devices::Model>> {
        let tables = self.tables.read().await;
        let mut devices: Vec<_> = tables
            .devices
            .iter()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        devices.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(devices)
    }

    async fn find_device_by_code(&self, code: &str) -> AppResult<Option<devices::Model>> {
        let tables = self.tables.read().await;
        Ok(tables.devices.iter().find(|d| d.code == code).cloned())
    }

    async fn list_zone_targets(&self) -> AppResult<Vec<zone_targets::Model>> {
        Ok(self
            .tables
            .read()
            .await
            .zone_targets
            .values()
            .cloned()
            .collect())
    }

    async fn upsert_zone_target(
        &self,
        zone_id: Uuid,
        daily_target_occupancy: i32,
        updated_at: DateTime<Utc>,
    ) -> AppResult<zone_targets::Model> {
        let mut tables = self.tables.write().await;
        if !tables.zones.iter().any(|z| z.id == zone_id) {
            return Err(AppError::NotFound(format!("Zone {zone_id} not found")));
        }

        let target = zone_targets::Model {
            zone_id,
            daily_target_occupancy,
            updated_at,
        };
        tables.zone_targets.insert(zone_id, target.clone());
        Ok(target)
    }

    async fn exists_telemetry(&self, device_id: Uuid, timestamp: DateTime<Utc>) -> AppResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .telemetry
            .iter()
            .any(|r| r.device_id == device_id && r.timestamp == timestamp))
    }

    async fn insert_telemetry(
        &self,
        reading: NewTelemetry,
    ) -> AppResult<telemetry_readings::Model> {
        let mut tables = self.tables.write().await;
        tables.ensure_active(reading.device_id)?;
        if tables
            .telemetry
            .iter()
            .any(|r| r.device_id == reading.device_id && r.timestamp == reading.timestamp)
        {
            return Err(AppError::Conflict(format!(
                "Telemetry already recorded for this device at {}",
                reading.timestamp
            )));
        }

        let model = telemetry_readings::Model {
            id: Uuid::new_v4(),
            device_id: reading.device_id,
            voltage: reading.voltage,
            current: reading.current,
            power_factor: reading.power_factor,
            timestamp: reading.timestamp,
            received_at: reading.received_at,
        };
        tables.telemetry.push(model.clone());
        Ok(model)
    }

    async fn list_telemetry(
        &self,
        filter: &TelemetryFilter,
    ) -> AppResult<Vec<telemetry_readings::Model>> {
        let tables = self.tables.read().await;
        let mut readings: Vec<_> = tables
            .telemetry
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        readings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = filter.limit {
            readings.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(readings)
    }

    async fn latest_telemetry_by_device(&self) -> AppResult<HashMap<Uuid, DateTime<Utc>>> {
        let tables = self.tables.read().await;
        let mut latest: HashMap<Uuid, DateTime<Utc>> = HashMap::new();
        for reading in &tables.telemetry {
            latest
                .entry(reading.device_id)
                .and_modify(|t| *t = (*t).max(reading.timestamp))
                .or_insert(reading.timestamp);
        }
        Ok(latest)
    }

    async fn insert_occupancy_event(
        &self,
        event: NewOccupancyEvent,
    ) -> AppResult<occupancy_events::Model> {
        let model = occupancy_events::Model {
            id: Uuid::new_v4(),
            device_id: event.device_id,
            is_occupied: event.is_occupied,
            timestamp: event.timestamp,
            received_at: event.received_at,
        };
        let mut tables = self.tables.write().await;
        tables.ensure_active(event.device_id)?;
        tables.occupancy.push(model.clone());
        Ok(model)
    }

    async fn list_occupancy_events(
        &self,
        filter: &OccupancyFilter,
    ) -> AppResult<Vec<occupancy_events::Model>> {
        let tables = self.tables.read().await;
        let mut events: Vec<_> = tables
            .occupancy
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(events)
    }

    async fn occupancy_counts_by_device(
        &self,
        window: TimeWindow,
    ) -> AppResult<HashMap<Uuid, u64>> {
        let tables = self.tables.read().await;
        let mut counts: HashMap<Uuid, u64> = HashMap::new();
        for event in tables.occupancy.iter().filter(|e| window.contains(e.timestamp)) {
            *counts.entry(event.device_id).or_default() += 1;
        }
        Ok(counts)
    }

    async fn latest_occupancy_by_device(&self) -> AppResult<HashMap<Uuid, bool>> {
        let tables = self.tables.read().await;
        let mut latest: HashMap<Uuid, &occupancy_events::Model> = HashMap::new();
        for event in &tables.occupancy {
            latest
                .entry(event.device_id)
                .and_modify(|current| {
                    if (event.timestamp, event.received_at)
                        >= (current.timestamp, current.received_at)
                    {
                        *current = event;
                    }
                })
                .or_insert(event);
        }
        Ok(latest
            .into_iter()
            .map(|(device_id, event)| (device_id, event.is_occupied))
            .collect())
    }

    async fn insert_alert(&self, alert: NewAlert) -> AppResult<Option<alerts::Model>> {
        let mut tables = self.tables.write().await;
        let duplicate = tables.alerts.iter().any(|a| {
            a.is_open()
                && a.device_id == alert.device_id
                && a.severity == alert.severity
                && a.rule_category == alert.rule_category
        });
        if duplicate {
            return Ok(None);
        }

        let model = alerts::Model {
            id: Uuid::new_v4(),
            device_id: alert.device_id,
            severity: alert.severity,
            rule_category: alert.rule_category,
            message: alert.message,
            is_acknowledged: false,
            created_at: alert.created_at,
            resolved_at: None,
        };
        tables.alerts.push(model.clone());
        Ok(Some(model))
    }

    async fn find_open_alert(
        &self,
        device_id: Option<Uuid>,
        severity: Severity,
        rule_category: &str,
    ) -> AppResult<Option<alerts::Model>> {
        let tables = self.tables.read().await;
        Ok(tables
            .alerts
            .iter()
            .find(|a| {
                a.is_open()
                    && a.device_id == device_id
                    && a.severity == severity
                    && a.rule_category == rule_category
            })
            .cloned())
    }

    async fn find_alert(&self, id: Uuid) -> AppResult<Option<alerts::Model>> {
        let tables = self.tables.read().await;
        Ok(tables.alerts.iter().find(|a| a.id == id).cloned())
    }

    async fn update_alert(
        &self,
        id: Uuid,
        update: AlertUpdate,
    ) -> AppResult<Option<alerts::Model>> {
        let mut tables = self.tables.write().await;
        let Some(alert) = tables.alerts.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        alert.is_acknowledged = update.is_acknowledged;
        alert.resolved_at = update.resolved_at;
        Ok(Some(alert.clone()))
    }

    async fn list_alerts(&self, filter: &AlertFilter) -> AppResult<Vec<alerts::Model>> {
        let tables = self.tables.read().await;
        let mut alerts: Vec<_> = tables
            .alerts
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(alerts)
    }

    async fn count_alerts(&self, window: TimeWindow) -> AppResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .alerts
            .iter()
            .filter(|a| window.contains(a.created_at))
            .count() as u64)
    }

    async fn alert_counts_by_device(&self, since: DateTime<Utc>) -> AppResult<HashMap<Uuid, u64>> {
        let tables = self.tables.read().await;
        let mut counts: HashMap<Uuid, u64> = HashMap::new();
        for alert in tables.alerts.iter().filter(|a| a.created_at > since) {
            if let Some(device_id) = alert.device_id {
                *counts.entry(device_id).or_default() += 1;
            }
        }
        Ok(counts)
    }
}
