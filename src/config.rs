//! Rate-limit configuration parsed from environment variables.

use std::time::Duration;

const DEFAULT_MAX_CONNECTIONS_PER_USER: usize = 10;

const DEFAULT_MESSAGE_LIMIT: usize = 100;
const DEFAULT_MESSAGE_WINDOW_SECS: u64 = 60;

const DEFAULT_ALERT_LIMIT: usize = 5;
const DEFAULT_ALERT_WINDOW_SECS: u64 = 300;

const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 300;

/// Tuning knobs for the gateway's limiter instances, loaded from environment
/// variables. Invalid or absent values fall back to defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Concurrent WebSocket connections allowed per identity.
    pub max_connections_per_user: usize,
    /// Messages admitted per identity within `message_window`.
    pub message_limit: usize,
    pub message_window: Duration,
    /// Alerts admitted per event key within `alert_window`.
    pub alert_limit: usize,
    pub alert_window: Duration,
    /// How often the maintenance task sweeps expired events.
    pub cleanup_interval: Duration,
}

impl RateLimitConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `RATE_LIMIT_MAX_CONNECTIONS`: default 10
    /// - `RATE_LIMIT_MESSAGES`: default 100
    /// - `RATE_LIMIT_MESSAGE_WINDOW_SECS`: default 60
    /// - `RATE_LIMIT_ALERTS`: default 5
    /// - `RATE_LIMIT_ALERT_WINDOW_SECS`: default 300
    /// - `RATE_LIMIT_CLEANUP_INTERVAL_SECS`: default 300
    #[must_use]
    pub fn from_env() -> Self {
        let message_window_secs = env_parse("RATE_LIMIT_MESSAGE_WINDOW_SECS", DEFAULT_MESSAGE_WINDOW_SECS);
        let alert_window_secs = env_parse("RATE_LIMIT_ALERT_WINDOW_SECS", DEFAULT_ALERT_WINDOW_SECS);
        let cleanup_interval_secs = env_parse("RATE_LIMIT_CLEANUP_INTERVAL_SECS", DEFAULT_CLEANUP_INTERVAL_SECS);

        Self {
            max_connections_per_user: env_parse("RATE_LIMIT_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS_PER_USER),
            message_limit: env_parse("RATE_LIMIT_MESSAGES", DEFAULT_MESSAGE_LIMIT),
            message_window: Duration::from_secs(message_window_secs),
            alert_limit: env_parse("RATE_LIMIT_ALERTS", DEFAULT_ALERT_LIMIT),
            alert_window: Duration::from_secs(alert_window_secs),
            cleanup_interval: Duration::from_secs(cleanup_interval_secs),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_connections_per_user: DEFAULT_MAX_CONNECTIONS_PER_USER,
            message_limit: DEFAULT_MESSAGE_LIMIT,
            message_window: Duration::from_secs(DEFAULT_MESSAGE_WINDOW_SECS),
            alert_limit: DEFAULT_ALERT_LIMIT,
            alert_window: Duration::from_secs(DEFAULT_ALERT_WINDOW_SECS),
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
        }
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
