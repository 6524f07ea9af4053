use chrono::{FixedOffset, Offset, Utc};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub enum Deployment {
    Local,
    Dev,
    Stage,
    Prod,
}

impl Deployment {
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Self::Dev,
            "stage" | "staging" => Self::Stage,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // API settings
    pub api_host: String,
    pub api_port: u16,

    // Dashboard day windows and hour buckets are cut in this offset
    pub time_zone: FixedOffset,

    // Offline check job
    pub offline_check_interval_seconds: u64,
    pub job_retry_max: u32,
    pub job_retry_delay_seconds: u64,

    // Rate limiting
    pub disable_rate_limiting: bool,
    pub rate_limit_ingest_per_second: u64,
    pub rate_limit_ingest_burst: u32,
    pub rate_limit_dashboard_per_second: u64,
    pub rate_limit_dashboard_burst: u32,

    // Device lookup cache
    /// Cached lookups may lag an `is_active` change by this long. Writes
    /// re-check the flag, so only reads see the stale value.
    pub device_cache_ttl_seconds: u64,
    pub device_cache_max_entries: u64,

    // Application metadata
    pub deployment: Deployment,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            api_host: "0.0.0.0".to_string(),
            api_port: 3000,
            time_zone: Utc.fix(),
            offline_check_interval_seconds: 60,
            job_retry_max: 3,
            job_retry_delay_seconds: 10,
            disable_rate_limiting: false,
            rate_limit_ingest_per_second: 50,
            rate_limit_ingest_burst: 200,
            rate_limit_dashboard_per_second: 5,
            rate_limit_dashboard_burst: 30,
            device_cache_ttl_seconds: 30,
            device_cache_max_entries: 10_000,
            deployment: Deployment::Local,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to the
    /// local defaults for anything optional.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `DATABASE_URL` is not set and
    /// `ConfigError::Invalid` if `DASHBOARD_UTC_OFFSET` cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let time_zone = match env::var("DASHBOARD_UTC_OFFSET") {
            Ok(raw) => parse_utc_offset(&raw).ok_or_else(|| {
                ConfigError::Invalid("DASHBOARD_UTC_OFFSET", raw.clone())
            })?,
            Err(_) => defaults.time_zone,
        };

        Ok(Self {
            // Database
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,

            // API settings
            api_host: env::var("API_HOST").unwrap_or(defaults.api_host),
            api_port: env_or("API_PORT", defaults.api_port),

            time_zone,

            // Offline check job
            offline_check_interval_seconds: env_or(
                "OFFLINE_CHECK_INTERVAL_SECONDS",
                defaults.offline_check_interval_seconds,
            ),
            job_retry_max: env_or("JOB_RETRY_MAX", defaults.job_retry_max),
            job_retry_delay_seconds: env_or(
                "JOB_RETRY_DELAY_SECONDS",
                defaults.job_retry_delay_seconds,
            ),

            // Rate limiting
            disable_rate_limiting: env_or("DISABLE_RATE_LIMITING", defaults.disable_rate_limiting),
            rate_limit_ingest_per_second: env_or(
                "RATE_LIMIT_INGEST_PER_SECOND",
                defaults.rate_limit_ingest_per_second,
            ),
            rate_limit_ingest_burst: env_or(
                "RATE_LIMIT_INGEST_BURST",
                defaults.rate_limit_ingest_burst,
            ),
            rate_limit_dashboard_per_second: env_or(
                "RATE_LIMIT_DASHBOARD_PER_SECOND",
                defaults.rate_limit_dashboard_per_second,
            ),
            rate_limit_dashboard_burst: env_or(
                "RATE_LIMIT_DASHBOARD_BURST",
                defaults.rate_limit_dashboard_burst,
            ),

            // Device lookup cache
            device_cache_ttl_seconds: env_or(
                "DEVICE_CACHE_TTL_SECONDS",
                defaults.device_cache_ttl_seconds,
            ),
            device_cache_max_entries: env_or(
                "DEVICE_CACHE_MAX_ENTRIES",
                defaults.device_cache_max_entries,
            ),

            // Application metadata
            deployment: Deployment::from_str(
                &env::var("DEPLOYMENT").unwrap_or_else(|_| "local".to_string()),
            ),
        })
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse a UTC offset such as `+02:00`, `-0530`, `+3`, `Z` or `UTC`.
#[must_use]
pub fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("utc") || raw.eq_ignore_ascii_case("z") {
        return Some(Utc.fix());
    }

    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit() || b == b':') {
        return None;
    }

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };

    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
