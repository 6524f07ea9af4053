//! Alert rules, dedup and acknowledgment against the memory store.
//!
//! Run with: cargo test --test alert_engine_test

mod common;

use chrono::Duration;
use common::{noon, Fixture};
use parkwatch::entity::alerts::Severity;
use parkwatch::error::AppError;
use parkwatch::services::alerts::{RULE_ABNORMAL_POWER, RULE_OFFLINE};
use parkwatch::store::{AlertFilter, Store};
use uuid::Uuid;

fn open_alerts() -> AlertFilter {
    AlertFilter {
        open_only: true,
        ..AlertFilter::default()
    }
}

#[tokio::test]
async fn abnormal_voltage_raises_one_warning_however_often_it_fires() {
    let fx = Fixture::new().await;
    let device = fx.device("P-001").await;

    let first = fx.reading(&device, 260.0, 2.0, noon() - Duration::seconds(20)).await;
    let second = fx.reading(&device, 261.0, 2.0, noon() - Duration::seconds(10)).await;

    let created = fx.state.alerts.evaluate_abnormal_power(&first).await.unwrap();
    let again = fx.state.alerts.evaluate_abnormal_power(&second).await.unwrap();

    let alert = created.expect("first trigger creates an alert");
    assert!(again.is_none());
    assert_eq!(alert.severity, Severity::Warning);
    assert_eq!(alert.rule_category, RULE_ABNORMAL_POWER);
    assert_eq!(alert.device_id, Some(device.id));
    assert_eq!(alert.message, "Abnormal power usage: V=260, I=2");

    let open = fx.store.list_alerts(&open_alerts()).await.unwrap();
    assert_eq!(open.len(), 1);
}

#[tokio::test]
async fn high_current_alone_is_abnormal() {
    let fx = Fixture::new().await;
    let device = fx.device("P-001").await;
    let reading = fx.reading(&device, 230.0, 10.5, noon()).await;

    let created = fx.state.alerts.evaluate_abnormal_power(&reading).await.unwrap();
    assert!(created.is_some());
}

#[tokio::test]
async fn readings_at_the_limits_are_normal() {
    let fx = Fixture::new().await;
    let device = fx.device("P-001").await;
    let reading = fx.reading(&device, 250.0, 10.0, noon()).await;

    let created = fx.state.alerts.evaluate_abnormal_power(&reading).await.unwrap();
    assert!(created.is_none());
    assert!(fx.store.list_alerts(&AlertFilter::default()).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_triggers_for_one_device_create_one_alert() {
    let fx = Fixture::new().await;
    let device = fx.device("P-001").await;
    let reading = fx.reading(&device, 300.0, 12.0, noon()).await;

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let engine = fx.state.alerts.clone();
            let reading = reading.clone();
            tokio::spawn(async move { engine.evaluate_abnormal_power(&reading).await })
        })
        .collect();

    let mut created = 0;
    for task in futures::future::join_all(tasks).await {
        if task.unwrap().unwrap().is_some() {
            created += 1;
        }
    }

    assert_eq!(created, 1);
    assert_eq!(fx.store.list_alerts(&open_alerts()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn offline_sweep_twice_leaves_one_critical_alert_per_device() {
    let fx = Fixture::new().await;
    let stale = fx.device("P-001").await;
    let silent = fx.device("P-002").await;
    fx.reading(&stale, 230.0, 1.0, noon() - Duration::minutes(10)).await;

    let first = fx.state.alerts.evaluate_offline_devices(noon()).await.unwrap();
    let second = fx.state.alerts.evaluate_offline_devices(noon()).await.unwrap();

    assert_eq!(first.len(), 2);
    assert!(second.is_empty());

    let open = fx.store.list_alerts(&open_alerts()).await.unwrap();
    assert_eq!(open.len(), 2);
    for alert in &open {
        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(alert.rule_category, RULE_OFFLINE);
    }

    let stale_alert = open
        .iter()
        .find(|a| a.device_id == Some(stale.id))
        .unwrap();
    assert_eq!(stale_alert.message, "Device P-001 offline (no data for >2 minutes).");
    assert!(open.iter().any(|a| a.device_id == Some(silent.id)));
}

#[tokio::test]
async fn offline_sweep_ignores_reporting_and_inactive_devices() {
    let fx = Fixture::new().await;
    let live = fx.device("P-001").await;
    let retired = fx.inactive_device("P-OLD").await;
    fx.reading(&live, 230.0, 1.0, noon() - Duration::seconds(90)).await;

    let created = fx.state.alerts.evaluate_offline_devices(noon()).await.unwrap();

    assert!(created.is_empty());
    let filter = AlertFilter {
        device_id: Some(retired.id),
        ..AlertFilter::default()
    };
    assert!(fx.store.list_alerts(&filter).await.unwrap().is_empty());
}

#[tokio::test]
async fn reading_exactly_two_minutes_old_counts_as_offline() {
    let fx = Fixture::new().await;
    let device = fx.device("P-001").await;
    fx.reading(&device, 230.0, 1.0, noon() - Duration::minutes(2)).await;

    let created = fx.state.alerts.evaluate_offline_devices(noon()).await.unwrap();
    assert_eq!(created.len(), 1);
}

#[tokio::test]
async fn acknowledge_resolves_the_alert() {
    let fx = Fixture::new().await;
    let device = fx.device("P-001").await;
    let reading = fx.reading(&device, 270.0, 1.0, noon()).await;
    let alert = fx
        .state
        .alerts
        .evaluate_abnormal_power(&reading)
        .await
        .unwrap()
        .unwrap();

    let later = noon() + Duration::minutes(15);
    let acked = fx.state.alerts.acknowledge(alert.id, later).await.unwrap();

    assert!(acked.is_acknowledged);
    assert_eq!(acked.resolved_at, Some(later));
    assert!(fx.store.list_alerts(&open_alerts()).await.unwrap().is_empty());

    // Second acknowledgment just moves resolved_at
    let even_later = later + Duration::minutes(1);
    let again = fx.state.alerts.acknowledge(alert.id, even_later).await.unwrap();
    assert_eq!(again.resolved_at, Some(even_later));
}

#[tokio::test]
async fn acknowledging_unknown_alert_is_not_found() {
    let fx = Fixture::new().await;

    let err = fx
        .state
        .alerts
        .acknowledge(Uuid::new_v4(), noon())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn resolved_alert_does_not_block_a_new_one() {
    let fx = Fixture::new().await;
    let device = fx.device("P-001").await;
    let reading = fx.reading(&device, 270.0, 1.0, noon()).await;

    let first = fx
        .state
        .alerts
        .evaluate_abnormal_power(&reading)
        .await
        .unwrap()
        .unwrap();
    fx.state.alerts.acknowledge(first.id, noon()).await.unwrap();

    let second = fx.state.alerts.evaluate_abnormal_power(&reading).await.unwrap();
    assert!(second.is_some_and(|a| a.id != first.id));
}

#[tokio::test]
async fn dedup_key_includes_severity_and_rule() {
    let fx = Fixture::new().await;
    let device = fx.device("P-001").await;

    let warning = fx
        .state
        .alerts
        .raise(Some(&device), Severity::Warning, "door_sensor", "Door ajar".into())
        .await
        .unwrap();
    let critical = fx
        .state
        .alerts
        .raise(Some(&device), Severity::Critical, "door_sensor", "Door ajar".into())
        .await
        .unwrap();
    let other_rule = fx
        .state
        .alerts
        .raise(Some(&device), Severity::Warning, "tamper", "Case opened".into())
        .await
        .unwrap();
    let repeat = fx
        .state
        .alerts
        .raise(Some(&device), Severity::Warning, "door_sensor", "Door still ajar".into())
        .await
        .unwrap();

    assert!(warning.is_some());
    assert!(critical.is_some());
    assert!(other_rule.is_some());
    assert!(repeat.is_none());
}

#[tokio::test]
async fn system_level_alerts_dedup_without_a_device() {
    let fx = Fixture::new().await;

    let first = fx
        .state
        .alerts
        .raise(None, Severity::Info, "maintenance", "Gateway firmware update".into())
        .await
        .unwrap();
    let second = fx
        .state
        .alerts
        .raise(None, Severity::Info, "maintenance", "Gateway firmware update".into())
        .await
        .unwrap();

    assert!(first.is_some_and(|a| a.device_id.is_none()));
    assert!(second.is_none());
}

#[tokio::test]
async fn alert_list_filters_and_orders_newest_first() {
    let fx = Fixture::new().await;
    let a = fx.device("P-001").await;
    let b = fx.device("P-002").await;

    fx.state
        .alerts
        .raise(Some(&a), Severity::Warning, "tamper", "first".into())
        .await
        .unwrap();
    fx.clock.advance(Duration::minutes(1));
    fx.state
        .alerts
        .raise(Some(&b), Severity::Critical, "tamper", "second".into())
        .await
        .unwrap();

    let all = fx.state.alerts.list(&AlertFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].message, "second");

    let critical = fx
        .state
        .alerts
        .list(&AlertFilter {
            severity: Some(Severity::Critical),
            ..AlertFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].device_id, Some(b.id));

    let unacked_for_a = fx
        .state
        .alerts
        .list(&AlertFilter {
            device_id: Some(a.id),
            is_acknowledged: Some(false),
            ..AlertFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(unacked_for_a.len(), 1);
}
