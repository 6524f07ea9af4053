//! UTC offset parsing and configuration defaults.
//!
//! Run with: cargo test --test config_test

use chrono::{FixedOffset, Offset, Utc};
use parkwatch::config::{parse_utc_offset, Config, Deployment};

fn hours(h: i32) -> FixedOffset {
    FixedOffset::east_opt(h * 3600).unwrap()
}

#[test]
fn parses_common_offset_spellings() {
    assert_eq!(parse_utc_offset("+02:00"), Some(hours(2)));
    assert_eq!(parse_utc_offset("-05:00"), Some(hours(-5)));
    assert_eq!(parse_utc_offset("+3"), Some(hours(3)));
    assert_eq!(parse_utc_offset("  +01:00 "), Some(hours(1)));
    assert_eq!(
        parse_utc_offset("-0530"),
        FixedOffset::west_opt(5 * 3600 + 30 * 60)
    );
    assert_eq!(
        parse_utc_offset("+05:45"),
        FixedOffset::east_opt(5 * 3600 + 45 * 60)
    );
}

#[test]
fn utc_aliases_are_zero_offset() {
    for raw in ["UTC", "utc", "Z", "z"] {
        assert_eq!(parse_utc_offset(raw), Some(Utc.fix()), "{raw}");
    }
}

#[test]
fn rejects_malformed_offsets() {
    for raw in ["", "+", "02:00", "+24:00", "+02:60", "+-3", "+ab", "Europe/Zurich"] {
        assert_eq!(parse_utc_offset(raw), None, "{raw}");
    }
}

#[test]
fn defaults_are_usable_without_environment() {
    let config = Config::default();

    assert_eq!(config.time_zone, Utc.fix());
    assert!(!config.disable_rate_limiting);
    assert!(config.rate_limit_ingest_per_second > 0);
    assert!(config.rate_limit_dashboard_burst > 0);
    assert!(config.job_retry_max > 0);
    assert_eq!(config.bind_address(), "0.0.0.0:3000");
}

#[test]
fn deployment_names_are_case_insensitive() {
    assert!(matches!(Deployment::from_str("PRODUCTION"), Deployment::Prod));
    assert!(matches!(Deployment::from_str("staging"), Deployment::Stage));
    assert!(matches!(Deployment::from_str("dev"), Deployment::Dev));
    assert!(matches!(Deployment::from_str("anything"), Deployment::Local));
}
