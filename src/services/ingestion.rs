//! Device submissions: telemetry (single and batch) and occupancy events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::common::Clock;
use crate::entity::{devices, occupancy_events, telemetry_readings};
use crate::error::{AppError, AppResult};
use crate::services::alerts::AlertEngine;
use crate::store::{NewOccupancyEvent, NewTelemetry, Store};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TelemetrySubmission {
    pub device_code: String,
    pub voltage: f64,
    pub current: f64,
    pub power_factor: f64,
    /// Device-reported sample time
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OccupancySubmission {
    pub device_code: String,
    pub is_occupied: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
pub struct BatchSuccess {
    pub index: usize,
    pub record: telemetry_readings::Model,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchFailure {
    pub index: usize,
    /// Error tag, e.g. `not_found` or `conflict`
    pub kind: &'static str,
    #[serde(rename = "error")]
    pub reason: String,
}

/// Per-item results of a batch, each list in input order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub succeeded: Vec<BatchSuccess>,
    pub failed: Vec<BatchFailure>,
}

impl BatchOutcome {
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

#[derive(Clone)]
pub struct IngestionService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    alerts: AlertEngine,
}

impl IngestionService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, alerts: AlertEngine) -> Self {
        Self {
            store,
            clock,
            alerts,
        }
    }

    /// Store one reading and run the abnormal-power rule on it.
    ///
    /// # Errors
    ///
    /// `Validation` for malformed values, `NotFound`/`Inactive` for an
    /// unusable device, `Conflict` if the device already reported this
    /// timestamp. Store failures, including those raised while persisting an
    /// alert, are returned as-is.
    pub async fn submit_telemetry(
        &self,
        submission: TelemetrySubmission,
    ) -> AppResult<telemetry_readings::Model> {
        validate_telemetry(&submission)?;
        let device = self.resolve_device(&submission.device_code).await?;

        if self
            .store
            .exists_telemetry(device.id, submission.timestamp)
            .await?
        {
            return Err(duplicate_reading(&device, submission.timestamp));
        }

        let reading = self
            .store
            .insert_telemetry(NewTelemetry {
                device_id: device.id,
                voltage: submission.voltage,
                current: submission.current,
                power_factor: submission.power_factor,
                timestamp: submission.timestamp,
                received_at: self.clock.now(),
            })
            .await?;

        self.alerts.evaluate_abnormal_power(&reading).await?;

        Ok(reading)
    }

    /// Submit each item in order. A failing item never stops the rest.
    ///
    /// Items that could not be decoded are passed in as `Err` and reported at
    /// their index.
    pub async fn submit_telemetry_batch<I>(&self, items: I) -> BatchOutcome
    where
        I: IntoIterator<Item = AppResult<TelemetrySubmission>>,
    {
        let mut outcome = BatchOutcome::default();

        for (index, item) in items.into_iter().enumerate() {
            let result = match item {
                Ok(submission) => self.submit_telemetry(submission).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(record) => outcome.succeeded.push(BatchSuccess { index, record }),
                Err(e) => {
                    tracing::debug!(index, error = %e, "Batch telemetry item rejected");
                    outcome.failed.push(BatchFailure {
                        index,
                        kind: e.kind(),
                        reason: e.public_message(),
                    });
                }
            }
        }

        if outcome.has_failures() {
            tracing::info!(
                succeeded = outcome.succeeded.len(),
                failed = outcome.failed.len(),
                "Telemetry batch partially rejected"
            );
        }

        outcome
    }

    pub async fn submit_occupancy_event(
        &self,
        submission: OccupancySubmission,
    ) -> AppResult<occupancy_events::Model> {
        validate_device_code(&submission.device_code)?;
        let device = self.resolve_device(&submission.device_code).await?;

        self.store
            .insert_occupancy_event(NewOccupancyEvent {
                device_id: device.id,
                is_occupied: submission.is_occupied,
                timestamp: submission.timestamp,
                received_at: self.clock.now(),
            })
            .await
    }

    async fn resolve_device(&self, code: &str) -> AppResult<devices::Model> {
        let device = self
            .store
            .find_device_by_code(code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Device '{code}' not found")))?;

        if !device.is_active {
            return Err(AppError::Inactive(format!("Device '{code}' is inactive")));
        }

        Ok(device)
    }
}

fn duplicate_reading(device: &devices::Model, timestamp: DateTime<Utc>) -> AppError {
    AppError::Conflict(format!(
        "Telemetry for device '{}' at {timestamp} already exists",
        device.code
    ))
}

fn validate_device_code(code: &str) -> AppResult<()> {
    if code.trim().is_empty() {
        return Err(AppError::Validation(
            "device_code cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_telemetry(submission: &TelemetrySubmission) -> AppResult<()> {
    validate_device_code(&submission.device_code)?;

    for (field, value) in [
        ("voltage", submission.voltage),
        ("current", submission.current),
        ("power_factor", submission.power_factor),
    ] {
        if !value.is_finite() {
            return Err(AppError::Validation(format!(
                "{field} must be a finite number"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn submission(code: &str, voltage: f64) -> TelemetrySubmission {
        TelemetrySubmission {
            device_code: code.to_string(),
            voltage,
            current: 1.0,
            power_factor: 0.9,
            timestamp: Utc.with_ymd_and_hms(2026, 10, 17, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn accepts_well_formed_reading() {
        assert!(validate_telemetry(&submission("P-01", 230.0)).is_ok());
    }

    #[test]
    fn rejects_blank_device_code() {
        let err = validate_telemetry(&submission("  ", 230.0)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn rejects_non_finite_values() {
        let err = validate_telemetry(&submission("P-01", f64::NAN)).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("voltage")));

        let err = validate_telemetry(&submission("P-01", f64::INFINITY)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
