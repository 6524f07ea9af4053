//! Dashboard summary, hourly usage, device statuses and zone targets.
//!
//! Run with: cargo test --test aggregation_test

mod common;

use chrono::{Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use common::{noon, test_config, Fixture};
use parkwatch::config::Config;
use parkwatch::entity::alerts::Severity;
use parkwatch::error::AppError;
use parkwatch::services::aggregation::DeviceStatus;
use uuid::Uuid;

#[tokio::test]
async fn empty_installation_summarises_to_zeroes() {
    let fx = Fixture::new().await;

    let summary = fx.state.aggregation.dashboard_summary(None).await.unwrap();

    assert_eq!(summary.date, NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
    assert_eq!(summary.total_parking_events, 0);
    assert_eq!(summary.current_occupancy, 0);
    assert_eq!(summary.active_devices, 0);
    assert_eq!(summary.alerts_today, 0);

    assert_eq!(summary.zones.len(), 1);
    let zone = &summary.zones[0];
    assert_eq!(zone.zone, "Level A");
    assert_eq!(zone.daily_target, 0);
    assert!(zone.efficiency.abs() < f64::EPSILON);
    assert!(zone.avg_health.abs() < f64::EPSILON);
}

#[tokio::test]
async fn efficiency_is_events_over_target() {
    let fx = Fixture::new().await;
    let device = fx.device("P-001").await;
    fx.occupancy(&device, true, noon() - Duration::hours(3)).await;
    fx.occupancy(&device, false, noon() - Duration::hours(2)).await;
    fx.occupancy(&device, true, noon() - Duration::hours(1)).await;

    fx.state.aggregation.set_zone_target(fx.zone.id, 4).await.unwrap();
    let summary = fx.state.aggregation.dashboard_summary(None).await.unwrap();

    let zone = &summary.zones[0];
    assert_eq!(summary.total_parking_events, 3);
    assert_eq!(zone.actual_events, 3);
    assert_eq!(zone.daily_target, 4);
    assert!((zone.efficiency - 75.0).abs() < 1e-9);
}

#[tokio::test]
async fn zero_target_means_zero_efficiency_even_with_events() {
    let fx = Fixture::new().await;
    let device = fx.device("P-001").await;
    fx.occupancy(&device, true, noon() - Duration::hours(2)).await;
    fx.occupancy(&device, false, noon() - Duration::hours(1)).await;

    fx.state.aggregation.set_zone_target(fx.zone.id, 0).await.unwrap();
    let summary = fx.state.aggregation.dashboard_summary(None).await.unwrap();

    let zone = &summary.zones[0];
    assert_eq!(zone.daily_target, 0);
    assert_eq!(zone.actual_events, 2);
    assert!(zone.efficiency.abs() < f64::EPSILON);
}

#[tokio::test]
async fn events_outside_the_day_are_not_counted() {
    let fx = Fixture::new().await;
    let device = fx.device("P-001").await;
    let midnight = Utc.with_ymd_and_hms(2026, 10, 17, 0, 0, 0).unwrap();

    fx.occupancy(&device, true, midnight - Duration::seconds(1)).await;
    fx.occupancy(&device, true, midnight).await;
    fx.occupancy(&device, true, midnight + Duration::days(1)).await;

    let today = fx.state.aggregation.dashboard_summary(None).await.unwrap();
    let yesterday = fx
        .state
        .aggregation
        .dashboard_summary(Some("2026-10-16"))
        .await
        .unwrap();

    assert_eq!(today.total_parking_events, 1);
    assert_eq!(yesterday.total_parking_events, 1);
    assert_eq!(yesterday.date, NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
}

#[tokio::test]
async fn current_occupancy_follows_latest_event_of_active_devices() {
    let fx = Fixture::new().await;
    let left = fx.device("P-001").await;
    let parked = fx.device("P-002").await;
    let retired = fx.device("P-OLD").await;

    fx.occupancy(&left, true, noon() - Duration::hours(2)).await;
    fx.occupancy(&left, false, noon() - Duration::hours(1)).await;
    fx.occupancy(&parked, true, noon() - Duration::minutes(30)).await;
    fx.occupancy(&retired, true, noon() - Duration::minutes(30)).await;
    fx.store.set_device_active(retired.id, false).await;

    let summary = fx.state.aggregation.dashboard_summary(None).await.unwrap();

    assert_eq!(summary.current_occupancy, 1);
    assert_eq!(summary.zones[0].current_occupancy, 1);
}

#[tokio::test]
async fn active_devices_counts_recent_telemetry_only() {
    let fx = Fixture::new().await;
    let recent = fx.device("P-001").await;
    let stale = fx.device("P-002").await;
    fx.device("P-003").await;

    fx.reading(&recent, 230.0, 1.0, noon() - Duration::minutes(4)).await;
    fx.reading(&stale, 230.0, 1.0, noon() - Duration::minutes(5)).await;

    let summary = fx.state.aggregation.dashboard_summary(None).await.unwrap();
    assert_eq!(summary.active_devices, 1);
}

#[tokio::test]
async fn alerts_today_uses_the_day_window() {
    let fx = Fixture::new().await;
    let device = fx.device("P-001").await;

    fx.clock.set(noon() - Duration::days(1));
    fx.state
        .alerts
        .raise(Some(&device), Severity::Info, "tamper", "yesterday".into())
        .await
        .unwrap();
    fx.clock.set(noon());
    fx.state
        .alerts
        .raise(Some(&device), Severity::Warning, "tamper", "today".into())
        .await
        .unwrap();
    fx.state
        .alerts
        .raise(None, Severity::Info, "maintenance", "today, system-wide".into())
        .await
        .unwrap();

    let summary = fx.state.aggregation.dashboard_summary(None).await.unwrap();
    assert_eq!(summary.alerts_today, 2);
}

#[tokio::test]
async fn average_health_spans_every_zone_device() {
    let fx = Fixture::new().await;
    let reporting = fx.device("P-001").await;
    fx.device("P-002").await;
    let empty = fx.add_zone("Level B").await;

    // 0 alerts, 5 minutes silent: (100 + 90) / 2
    fx.reading(&reporting, 230.0, 1.0, noon() - Duration::minutes(5)).await;

    let summary = fx.state.aggregation.dashboard_summary(None).await.unwrap();

    let level_a = summary.zones.iter().find(|z| z.zone_id == fx.zone.id).unwrap();
    let level_b = summary.zones.iter().find(|z| z.zone_id == empty.id).unwrap();
    assert!((level_a.avg_health - 47.5).abs() < 1e-9);
    assert!(level_b.avg_health.abs() < f64::EPSILON);
}

#[tokio::test]
async fn zones_are_listed_by_name() {
    let fx = Fixture::new().await;
    fx.add_zone("Basement").await;
    fx.add_zone("Roof").await;

    let summary = fx.state.aggregation.dashboard_summary(None).await.unwrap();
    let names: Vec<_> = summary.zones.iter().map(|z| z.zone.as_str()).collect();

    assert_eq!(names, vec!["Basement", "Level A", "Roof"]);
}

#[tokio::test]
async fn unparseable_date_falls_back_to_today() {
    let fx = Fixture::new().await;
    let today = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();

    for raw in ["yesterday", "2026-13-01", "", "17/10/2026"] {
        assert_eq!(fx.state.aggregation.resolve_date(Some(raw)), today);
    }
    assert_eq!(fx.state.aggregation.resolve_date(None), today);
}

#[tokio::test]
async fn day_window_follows_configured_offset() {
    let config = Config {
        time_zone: FixedOffset::east_opt(2 * 3600).unwrap(),
        ..test_config()
    };
    let fx = Fixture::with_config(config).await;
    let device = fx.device("P-001").await;

    // 2026-10-17 local starts at 2026-10-16 22:00 UTC
    let local_midnight = Utc.with_ymd_and_hms(2026, 10, 16, 22, 0, 0).unwrap();
    fx.occupancy(&device, true, local_midnight - Duration::minutes(1)).await;
    fx.occupancy(&device, true, local_midnight + Duration::hours(1)).await;
    fx.occupancy(&device, true, local_midnight + Duration::hours(24)).await;

    let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
    let window = fx.state.aggregation.day_window(date);
    assert_eq!(window.start, local_midnight);
    assert_eq!(window.end, local_midnight + Duration::days(1));

    let summary = fx
        .state
        .aggregation
        .dashboard_summary(Some("2026-10-17"))
        .await
        .unwrap();
    assert_eq!(summary.total_parking_events, 1);
}

#[tokio::test]
async fn today_is_the_local_date() {
    let config = Config {
        time_zone: FixedOffset::east_opt(14 * 3600).unwrap(),
        ..test_config()
    };
    let fx = Fixture::with_config(config).await;

    // Noon UTC is already 02:00 on the 18th at +14:00
    assert_eq!(
        fx.state.aggregation.resolve_date(None),
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    );
}

#[tokio::test]
async fn hourly_usage_buckets_occupied_events_by_hour() {
    let fx = Fixture::new().await;
    let a = fx.device("P-001").await;
    let b = fx.device("P-002").await;
    let elsewhere = fx.add_zone("Level B").await;
    let other = fx.device_in(&elsewhere, "Q-001").await;

    let at = |h, m| Utc.with_ymd_and_hms(2026, 10, 17, h, m, 0).unwrap();
    fx.occupancy(&a, true, at(9, 5)).await;
    fx.occupancy(&b, true, at(9, 55)).await;
    fx.occupancy(&a, false, at(10, 10)).await;
    fx.occupancy(&a, true, at(8, 30)).await;
    fx.occupancy(&other, true, at(9, 15)).await;

    let usage = fx
        .state
        .aggregation
        .hourly_usage(fx.zone.id, None)
        .await
        .unwrap();

    let rows: Vec<_> = usage
        .iter()
        .map(|u| (u.hour.with_timezone(&Utc), u.occupied_count))
        .collect();
    assert_eq!(rows, vec![(at(8, 0), 1), (at(9, 0), 2)]);
}

#[tokio::test]
async fn hourly_usage_reports_hours_in_local_offset() {
    let config = Config {
        time_zone: FixedOffset::east_opt(2 * 3600).unwrap(),
        ..test_config()
    };
    let fx = Fixture::with_config(config).await;
    let device = fx.device("P-001").await;
    fx.occupancy(&device, true, Utc.with_ymd_and_hms(2026, 10, 17, 10, 15, 0).unwrap())
        .await;

    let usage = fx
        .state
        .aggregation
        .hourly_usage(fx.zone.id, Some("2026-10-17"))
        .await
        .unwrap();

    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].hour.to_rfc3339(), "2026-10-17T12:00:00+02:00");
}

#[tokio::test]
async fn hourly_usage_for_unknown_zone_is_not_found() {
    let fx = Fixture::new().await;

    let err = fx
        .state
        .aggregation
        .hourly_usage(Uuid::new_v4(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn device_statuses_classify_by_age_of_last_telemetry() {
    let fx = Fixture::new().await;
    let ok = fx.device("P-001").await;
    let warning = fx.device("P-002").await;
    let critical = fx.device("P-003").await;
    fx.device("P-004").await;
    fx.inactive_device("P-OLD").await;

    fx.reading(&ok, 230.0, 1.0, noon() - Duration::seconds(119)).await;
    fx.reading(&warning, 230.0, 1.0, noon() - Duration::seconds(120)).await;
    fx.reading(&critical, 230.0, 1.0, noon() - Duration::seconds(300)).await;

    let statuses = fx.state.aggregation.device_statuses().await.unwrap();

    let got: Vec<_> = statuses
        .iter()
        .map(|s| (s.code.as_str(), s.status))
        .collect();
    assert_eq!(
        got,
        vec![
            ("P-001", DeviceStatus::Ok),
            ("P-002", DeviceStatus::Warning),
            ("P-003", DeviceStatus::Critical),
            ("P-004", DeviceStatus::NoData),
        ]
    );
    assert!(statuses.iter().all(|s| s.zone == "Level A"));
    assert!(statuses[3].last_seen.is_none());
}

#[tokio::test]
async fn zone_target_is_upserted() {
    let fx = Fixture::new().await;

    let first = fx.state.aggregation.set_zone_target(fx.zone.id, 40).await.unwrap();
    fx.clock.advance(Duration::minutes(5));
    let second = fx.state.aggregation.set_zone_target(fx.zone.id, 0).await.unwrap();

    assert_eq!(first.daily_target_occupancy, 40);
    assert_eq!(second.daily_target_occupancy, 0);
    assert_eq!(second.updated_at, noon() + Duration::minutes(5));

    let summary = fx.state.aggregation.dashboard_summary(None).await.unwrap();
    assert_eq!(summary.zones[0].daily_target, 0);
}

#[tokio::test]
async fn negative_zone_target_is_rejected() {
    let fx = Fixture::new().await;

    let err = fx
        .state
        .aggregation
        .set_zone_target(fx.zone.id, -1)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn target_for_unknown_zone_is_not_found() {
    let fx = Fixture::new().await;

    let err = fx
        .state
        .aggregation
        .set_zone_target(Uuid::new_v4(), 10)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}
