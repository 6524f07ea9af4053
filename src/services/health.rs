//! Device health scoring.

use chrono::{DateTime, Utc};

/// Alerts in the trailing window each cost this many points.
const POINTS_PER_ALERT: f64 = 10.0;
/// Each minute without telemetry costs this many points.
const POINTS_PER_SILENT_MINUTE: f64 = 2.0;

/// Score a device from 0 to 100.
///
/// `minutes_since_last` is `None` when the device never sent telemetry,
/// which scores 0 regardless of alerts.
#[must_use]
pub fn health_score(alerts_24h: u64, minutes_since_last: Option<f64>) -> u8 {
    let Some(minutes) = minutes_since_last else {
        return 0;
    };

    #[allow(clippy::cast_precision_loss)]
    let alert_score = (100.0 - POINTS_PER_ALERT * alerts_24h as f64).max(0.0);
    let recency_score = (100.0 - POINTS_PER_SILENT_MINUTE * minutes.max(0.0)).max(0.0);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = ((alert_score + recency_score) / 2.0).round().clamp(0.0, 100.0) as u8;
    score
}

/// [`health_score`] from the device's last telemetry timestamp.
#[must_use]
pub fn device_health(alerts_24h: u64, last_telemetry: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u8 {
    let minutes = last_telemetry.map(|last| minutes_between(last, now));
    health_score(alerts_24h, minutes)
}

#[allow(clippy::cast_precision_loss)]
fn minutes_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 60_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn no_telemetry_scores_zero() {
        for alerts in [0, 1, 5, 100] {
            assert_eq!(health_score(alerts, None), 0);
        }
    }

    #[test]
    fn fresh_device_without_alerts_is_perfect() {
        assert_eq!(health_score(0, Some(0.0)), 100);
    }

    #[test]
    fn score_combines_alert_and_recency_halves() {
        // alert 70, recency 80
        assert_eq!(health_score(3, Some(10.0)), 75);
        // alert 0, recency 0
        assert_eq!(health_score(20, Some(120.0)), 0);
        // alert 90, recency 99 -> 94.5 rounds up
        assert_eq!(health_score(1, Some(0.5)), 95);
    }

    #[test]
    fn score_never_increases_with_alerts_or_silence() {
        let mut previous = u8::MAX;
        for alerts in 0..15 {
            let score = health_score(alerts, Some(3.0));
            assert!(score <= previous);
            previous = score;
        }

        let mut previous = u8::MAX;
        for minutes in 0..80 {
            let score = health_score(2, Some(f64::from(minutes)));
            assert!(score <= previous);
            previous = score;
        }
    }

    #[test]
    fn device_health_measures_minutes_from_now() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();
        let last = now - Duration::minutes(5);
        assert_eq!(device_health(0, Some(last), now), 95);
        assert_eq!(device_health(0, None, now), 0);
    }
}
