//! Dashboard aggregates: daily summary, hourly usage and device liveness.
//!
//! Day windows are `[00:00, 24:00)` of a calendar date in the configured UTC
//! offset. Each aggregate issues a fixed set of store queries (run
//! concurrently) and folds them in memory, so the query count does not grow
//! with the number of devices.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::Clock;
use crate::entity::{devices, zone_targets};
use crate::error::{AppError, AppResult};
use crate::services::health::device_health;
use crate::store::{DeviceFilter, OccupancyFilter, Store, TimeWindow};

/// A device counts as reporting if it sent telemetry this recently.
const ACTIVE_WINDOW_MINUTES: i64 = 5;
const STATUS_OK_SECONDS: i64 = 120;
const STATUS_WARNING_SECONDS: i64 = 300;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardSummary {
    /// Calendar date the window was cut from
    pub date: NaiveDate,
    pub total_parking_events: u64,
    pub current_occupancy: u64,
    pub active_devices: u64,
    pub alerts_today: u64,
    pub zones: Vec<ZoneSummary>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ZoneSummary {
    pub zone_id: Uuid,
    /// Zone name
    pub zone: String,
    pub current_occupancy: u64,
    pub daily_target: i32,
    pub actual_events: u64,
    /// Percent of the daily target reached, 0 when no target is set
    pub efficiency: f64,
    pub avg_health: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct HourlyUsage {
    /// Start of the hour in the dashboard offset
    pub hour: DateTime<FixedOffset>,
    pub occupied_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceStatus {
    Ok,
    Warning,
    Critical,
    NoData,
}

impl DeviceStatus {
    #[must_use]
    pub fn classify(last_seen: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let Some(last_seen) = last_seen else {
            return Self::NoData;
        };

        let age = now - last_seen;
        if age < Duration::seconds(STATUS_OK_SECONDS) {
            Self::Ok
        } else if age < Duration::seconds(STATUS_WARNING_SECONDS) {
            Self::Warning
        } else {
            Self::Critical
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeviceStatusReport {
    pub code: String,
    /// Zone name
    pub zone: String,
    pub last_seen: Option<DateTime<Utc>>,
    pub status: DeviceStatus,
}

#[derive(Clone)]
pub struct AggregationEngine {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    tz: FixedOffset,
}

impl AggregationEngine {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, tz: FixedOffset) -> Self {
        Self { store, clock, tz }
    }

    /// Parse `YYYY-MM-DD`; anything else (or nothing) means today in the
    /// dashboard offset.
    #[must_use]
    pub fn resolve_date(&self, date: Option<&str>) -> NaiveDate {
        date.and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
            .unwrap_or_else(|| self.clock.now().with_timezone(&self.tz).date_naive())
    }

    #[must_use]
    pub fn day_window(&self, date: NaiveDate) -> TimeWindow {
        let local_midnight = date.and_time(NaiveTime::MIN).and_utc();
        let start = local_midnight - Duration::seconds(i64::from(self.tz.local_minus_utc()));
        TimeWindow {
            start,
            end: start + Duration::days(1),
        }
    }

    pub async fn dashboard_summary(&self, date: Option<&str>) -> AppResult<DashboardSummary> {
        let now = self.clock.now();
        let date = self.resolve_date(date);
        let window = self.day_window(date);
        let all_devices = DeviceFilter::default();

        let (
            zones,
            devices,
            targets,
            event_counts,
            latest_occupancy,
            latest_telemetry,
            alert_counts,
            alerts_today,
        ) = futures::try_join!(
            self.store.list_zones(),
            self.store.list_devices(&all_devices),
            self.store.list_zone_targets(),
            self.store.occupancy_counts_by_device(window),
            self.store.latest_occupancy_by_device(),
            self.store.latest_telemetry_by_device(),
            self.store.alert_counts_by_device(now - Duration::hours(24)),
            self.store.count_alerts(window),
        )?;

        let is_occupied = |device: &devices::Model| {
            device.is_active && latest_occupancy.get(&device.id).copied().unwrap_or(false)
        };
        let health = |device: &devices::Model| {
            device_health(
                alert_counts.get(&device.id).copied().unwrap_or(0),
                latest_telemetry.get(&device.id).copied(),
                now,
            )
        };

        let targets: HashMap<Uuid, i32> = targets
            .into_iter()
            .map(|t| (t.zone_id, t.daily_target_occupancy))
            .collect();

        let mut devices_by_zone: HashMap<Uuid, Vec<&devices::Model>> = HashMap::new();
        for device in &devices {
            devices_by_zone.entry(device.zone_id).or_default().push(device);
        }

        let zones = zones
            .into_iter()
            .map(|zone| {
                let members = devices_by_zone
                    .get(&zone.id)
                    .map(Vec::as_slice)
                    .unwrap_or_default();

                let daily_target = targets.get(&zone.id).copied().unwrap_or(0);
                let actual_events: u64 = members
                    .iter()
                    .map(|d| event_counts.get(&d.id).copied().unwrap_or(0))
                    .sum();

                ZoneSummary {
                    zone_id: zone.id,
                    zone: zone.name,
                    current_occupancy: count(members.iter().filter(|d| is_occupied(d))),
                    daily_target,
                    actual_events,
                    efficiency: efficiency(actual_events, daily_target),
                    avg_health: average_health(members.iter().map(|d| health(d))),
                }
            })
            .collect();

        let active_since = now - Duration::minutes(ACTIVE_WINDOW_MINUTES);

        Ok(DashboardSummary {
            date,
            total_parking_events: event_counts.values().sum(),
            current_occupancy: count(devices.iter().filter(|d| is_occupied(d))),
            active_devices: count(latest_telemetry.values().filter(|ts| **ts > active_since)),
            alerts_today,
            zones,
        })
    }

    /// Occupied events per local hour for one zone. Hours without occupied
    /// events are left out.
    pub async fn hourly_usage(
        &self,
        zone_id: Uuid,
        date: Option<&str>,
    ) -> AppResult<Vec<HourlyUsage>> {
        let window = self.day_window(self.resolve_date(date));

        let zone = self
            .store
            .find_zone(zone_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Zone {zone_id} not found")))?;

        let devices = self
            .store
            .list_devices(&DeviceFilter {
                zone_id: Some(zone.id),
                is_active: None,
            })
            .await?;

        let events = self
            .store
            .list_occupancy_events(&OccupancyFilter {
                device_ids: Some(devices.iter().map(|d| d.id).collect()),
                window: Some(window),
            })
            .await?;

        let mut buckets: BTreeMap<DateTime<FixedOffset>, u64> = BTreeMap::new();
        for event in events.iter().filter(|e| e.is_occupied) {
            let hour = hour_start(event.timestamp.with_timezone(&self.tz));
            *buckets.entry(hour).or_default() += 1;
        }

        Ok(buckets
            .into_iter()
            .map(|(hour, occupied_count)| HourlyUsage {
                hour,
                occupied_count,
            })
            .collect())
    }

    /// Set the expected number of occupancy events per day for a zone.
    pub async fn set_zone_target(
        &self,
        zone_id: Uuid,
        daily_target_occupancy: i32,
    ) -> AppResult<zone_targets::Model> {
        if daily_target_occupancy < 0 {
            return Err(AppError::Validation(
                "daily_target_occupancy cannot be negative".to_string(),
            ));
        }

        if self.store.find_zone(zone_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Zone {zone_id} not found")));
        }

        let target = self
            .store
            .upsert_zone_target(zone_id, daily_target_occupancy, self.clock.now())
            .await?;

        tracing::info!(zone_id = %zone_id, daily_target_occupancy, "Zone target updated");
        Ok(target)
    }

    /// Liveness of every active device, by age of its latest telemetry.
    pub async fn device_statuses(&self) -> AppResult<Vec<DeviceStatusReport>> {
        let now = self.clock.now();
        let active = DeviceFilter::active();

        let (devices, zones, latest) = futures::try_join!(
            self.store.list_devices(&active),
            self.store.list_zones(),
            self.store.latest_telemetry_by_device(),
        )?;

        let zone_names: HashMap<Uuid, String> =
            zones.into_iter().map(|z| (z.id, z.name)).collect();

        Ok(devices
            .into_iter()
            .map(|device| {
                let last_seen = latest.get(&device.id).copied();
                DeviceStatusReport {
                    zone: zone_names.get(&device.zone_id).cloned().unwrap_or_default(),
                    code: device.code,
                    last_seen,
                    status: DeviceStatus::classify(last_seen, now),
                }
            })
            .collect())
    }
}

fn hour_start(t: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    t - Duration::seconds(i64::from(t.minute() * 60 + t.second()))
        - Duration::nanoseconds(i64::from(t.nanosecond()))
}

fn count<I: Iterator>(iter: I) -> u64 {
    iter.fold(0, |n, _| n + 1)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[allow(clippy::cast_precision_loss)]
fn efficiency(actual_events: u64, daily_target: i32) -> f64 {
    if daily_target <= 0 {
        return 0.0;
    }
    round2(actual_events as f64 / f64::from(daily_target) * 100.0)
}

#[allow(clippy::cast_precision_loss)]
fn average_health(scores: impl Iterator<Item = u8>) -> f64 {
    let (sum, n) = scores.fold((0u64, 0u64), |(sum, n), s| (sum + u64::from(s), n + 1));
    if n == 0 {
        return 0.0;
    }
    round2(sum as f64 / n as f64)
}
