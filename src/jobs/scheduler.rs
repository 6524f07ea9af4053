use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

use crate::common::AppState;

/// Periodically raise offline alerts for silent devices.
///
/// A failed sweep is retried up to `job_retry_max` times, `job_retry_delay_seconds`
/// apart, then skipped until the next tick.
pub async fn run_offline_check(state: AppState) {
    let interval_secs = state.config.offline_check_interval_seconds;
    let retry_delay_secs = state.config.job_retry_delay_seconds;
    let max_retries = state.config.job_retry_max;

    tracing::info!(interval_secs, "Starting offline check scheduler");

    let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Run the first sweep immediately
    ticker.tick().await;

    loop {
        tracing::debug!("Running offline check...");

        let mut retries = 0;
        loop {
            match state
                .alerts
                .evaluate_offline_devices(state.clock.now())
                .await
            {
                Ok(created) => {
                    tracing::debug!(created = created.len(), "Offline check completed");
                    break;
                }
                Err(e) => {
                    retries += 1;
                    if retries <= max_retries {
                        tracing::error!(
                            error = %e,
                            retry = retries,
                            max_retries,
                            "Offline check failed, retrying"
                        );
                        tokio::time::sleep(Duration::from_secs(retry_delay_secs)).await;
                    } else {
                        tracing::error!(
                            error = %e,
                            max_retries,
                            "Offline check failed after max retries"
                        );
                        break;
                    }
                }
            }
        }

        // Wait for next tick
        ticker.tick().await;
    }
}
