use std::time::Duration;

use crate::config::PollingConfig;

/// Delay before the next status poll. Grows multiplicatively from the base
/// interval and is capped at the configured ceiling.
pub fn next_delay(attempt: u32, config: &PollingConfig) -> Duration {
    let grown = config.base_delay_ms as f64 * config.backoff_factor.powi(attempt as i32);
    let capped = grown.min(config.max_delay_ms as f64);
    Duration::from_millis(capped as u64)
}
