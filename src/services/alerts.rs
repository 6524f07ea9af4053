//! Alert rules and the open-alert dedup discipline.
//!
//! Every rule goes through [`AlertEngine::raise`], which creates an alert only
//! if no open alert with the same `(device, severity, rule_category)` exists.
//! The final check-and-insert is a single [`Store::insert_alert`] call, so
//! concurrent triggers for one device and rule still produce one alert.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::common::Clock;
use crate::entity::alerts::{self, Severity};
use crate::entity::{devices, telemetry_readings};
use crate::error::{AppError, AppResult};
use crate::store::{AlertFilter, AlertUpdate, DeviceFilter, NewAlert, Store};

pub const RULE_OFFLINE: &str = "offline";
pub const RULE_ABNORMAL_POWER: &str = "abnormal_power";

pub const MAX_VOLTAGE: f64 = 250.0;
pub const MAX_CURRENT: f64 = 10.0;

/// A device is offline once its latest reading is at least this old.
#[must_use]
pub fn offline_after() -> Duration {
    Duration::minutes(2)
}

#[derive(Clone)]
pub struct AlertEngine {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl AlertEngine {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Raise a CRITICAL `offline` alert for every active device whose latest
    /// telemetry is older than [`offline_after`] (or missing).
    ///
    /// Returns the alerts created by this sweep. The first store error aborts
    /// the sweep.
    pub async fn evaluate_offline_devices(
        &self,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<alerts::Model>> {
        let threshold = now - offline_after();
        let active = DeviceFilter::active();

        let (devices, latest) = futures::try_join!(
            self.store.list_devices(&active),
            self.store.latest_telemetry_by_device(),
        )?;

        let mut created = Vec::new();
        for device in devices {
            let is_online = latest.get(&device.id).is_some_and(|ts| *ts > threshold);
            if is_online {
                continue;
            }

            let message = format!("Device {} offline (no data for >2 minutes).", device.code);
            if let Some(alert) = self
                .raise_for_device(Some(device.id), Severity::Critical, RULE_OFFLINE, message, now)
                .await?
            {
                created.push(alert);
            }
        }

        if !created.is_empty() {
            tracing::info!(count = created.len(), "Raised offline alerts");
        }

        Ok(created)
    }

    /// Raise a WARNING `abnormal_power` alert when the reading exceeds
    /// [`MAX_VOLTAGE`] or [`MAX_CURRENT`].
    pub async fn evaluate_abnormal_power(
        &self,
        reading: &telemetry_readings::Model,
    ) -> AppResult<Option<alerts::Model>> {
        if reading.voltage <= MAX_VOLTAGE && reading.current <= MAX_CURRENT {
            return Ok(None);
        }

        let message = format!(
            "Abnormal power usage: V={}, I={}",
            reading.voltage, reading.current
        );
        self.raise_for_device(
            Some(reading.device_id),
            Severity::Warning,
            RULE_ABNORMAL_POWER,
            message,
            self.clock.now(),
        )
        .await
    }

    /// Create an alert unless an open one with the same device, severity and
    /// rule category already exists. Returns `None` if deduplicated.
    pub async fn raise(
        &self,
        device: Option<&devices::Model>,
        severity: Severity,
        rule_category: &str,
        message: String,
    ) -> AppResult<Option<alerts::Model>> {
        self.raise_for_device(
            device.map(|d| d.id),
            severity,
            rule_category,
            message,
            self.clock.now(),
        )
        .await
    }

    async fn raise_for_device(
        &self,
        device_id: Option<Uuid>,
        severity: Severity,
        rule_category: &str,
        message: String,
        created_at: DateTime<Utc>,
    ) -> AppResult<Option<alerts::Model>> {
        // Cheap read first; the insert below is the authoritative check
        if self
            .store
            .find_open_alert(device_id, severity, rule_category)
            .await?
            .is_some()
        {
            return Ok(None);
        }

        let created = self
            .store
            .insert_alert(NewAlert {
                device_id,
                severity,
                rule_category: rule_category.to_string(),
                message,
                created_at,
            })
            .await?;

        if let Some(alert) = &created {
            tracing::info!(
                alert_id = %alert.id,
                device_id = ?alert.device_id,
                severity = %alert.severity,
                rule = %alert.rule_category,
                "Alert raised"
            );
        }

        Ok(created)
    }

    /// Mark an alert acknowledged and resolved at `now`.
    ///
    /// Acknowledging twice moves `resolved_at` to the later time.
    pub async fn acknowledge(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<alerts::Model> {
        let update = AlertUpdate {
            is_acknowledged: true,
            resolved_at: Some(now),
        };

        let alert = self
            .store
            .update_alert(id, update)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Alert {id} not found")))?;

        tracing::info!(alert_id = %id, "Alert acknowledged");
        Ok(alert)
    }

    pub async fn list(&self, filter: &AlertFilter) -> AppResult<Vec<alerts::Model>> {
        self.store.list_alerts(filter).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<alerts::Model> {
        self.store
            .find_alert(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Alert {id} not found")))
    }
}
