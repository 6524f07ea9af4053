//! Shared fixtures: a memory-backed state with one facility and zone, and a
//! clock pinned to a known instant.

// Not every test binary uses every helper
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

use parkwatch::common::{AppState, Clock, FixedClock};
use parkwatch::config::Config;
use parkwatch::entity::{devices, telemetry_readings, zones};
use parkwatch::store::{MemoryStore, NewOccupancyEvent, NewTelemetry, Store};

/// 2026-10-17 12:00:00 UTC
pub fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
}

pub fn test_config() -> Config {
    Config {
        disable_rate_limiting: true,
        ..Config::default()
    }
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub state: AppState,
    pub zone: zones::Model,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(noon()));

        let facility = store.add_facility("Central Garage", Some("Main St 1")).await;
        let zone = store.add_zone(facility.id, "Level A").await;

        let shared_store: Arc<dyn Store> = store.clone();
        let shared_clock: Arc<dyn Clock> = clock.clone();
        let state = AppState::new(shared_store, shared_clock, config);

        Self {
            store,
            clock,
            state,
            zone,
        }
    }

    pub async fn add_zone(&self, name: &str) -> zones::Model {
        self.store.add_zone(self.zone.facility_id, name).await
    }

    pub async fn device(&self, code: &str) -> devices::Model {
        self.device_in(&self.zone, code).await
    }

    pub async fn device_in(&self, zone: &zones::Model, code: &str) -> devices::Model {
        self.store
            .add_device(zone.id, code, true, noon() - Duration::days(30))
            .await
    }

    pub async fn inactive_device(&self, code: &str) -> devices::Model {
        self.store
            .add_device(self.zone.id, code, false, noon() - Duration::days(30))
            .await
    }

    /// Store a reading directly, bypassing ingestion and alert rules.
    pub async fn reading(
        &self,
        device: &devices::Model,
        voltage: f64,
        current: f64,
        timestamp: DateTime<Utc>,
    ) -> telemetry_readings::Model {
        self.store
            .insert_telemetry(NewTelemetry {
                device_id: device.id,
                voltage,
                current,
                power_factor: 0.95,
                timestamp,
                received_at: timestamp,
            })
            .await
            .unwrap()
    }

    pub async fn occupancy(&self, device: &devices::Model, is_occupied: bool, timestamp: DateTime<Utc>) {
        self.store
            .insert_occupancy_event(NewOccupancyEvent {
                device_id: device.id,
                is_occupied,
                timestamp,
                received_at: timestamp,
            })
            .await
            .unwrap();
    }
}
