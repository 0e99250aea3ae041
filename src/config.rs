//! Tracker configuration from environment variables

use std::env;

const DEFAULT_DB_PATH: &str = "/var/lib/busflow/busflow.db";
const DEFAULT_FEED_BASE_URL: &str = "https://servizi.cotralspa.it:4444/mw-travelCotralBE";

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => {
                write!(f, "Missing environment variable: {}", var)
            }
            ConfigError::InvalidValue(msg) => {
                write!(f, "Invalid configuration value: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Runtime configuration for the tracker.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Path to the SQLite database file
    pub db_path: String,

    /// Base URL of the upstream feed
    pub feed_base_url: String,

    /// Stop identifiers polled by the discovery cycle
    pub stops: Vec<String>,

    /// Seconds between scheduled discovery passes
    pub poll_interval_secs: u64,

    /// Wall-clock budget one tracking batch is spread across
    pub pacing_budget_secs: u64,

    /// Lookahead window passed to the stop snapshot endpoint, in minutes
    pub lookahead_minutes: u32,
}

impl TrackerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `TRACKED_STOPS` (required, comma-separated stop ids)
    /// - `BUSFLOW_DB_PATH` (default: /var/lib/busflow/busflow.db)
    /// - `FEED_BASE_URL` (default: the Cotral travel backend)
    /// - `POLL_INTERVAL_SECS` (default: 180)
    /// - `PACING_BUDGET_SECS` (default: 140)
    /// - `LOOKAHEAD_MINUTES` (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        let stops_raw = env::var("TRACKED_STOPS")
            .map_err(|_| ConfigError::MissingVariable("TRACKED_STOPS".to_string()))?;

        let stops: Vec<String> = stops_raw
            .split(',')
            .map(|stop| stop.trim().to_string())
            .filter(|stop| !stop.is_empty())
            .collect();

        if stops.is_empty() {
            return Err(ConfigError::InvalidValue(
                "TRACKED_STOPS contains no stop ids".to_string(),
            ));
        }

        let feed_base_url =
            env::var("FEED_BASE_URL").unwrap_or_else(|_| DEFAULT_FEED_BASE_URL.to_string());

        if !feed_base_url.starts_with("http://") && !feed_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "FEED_BASE_URL must start with http:// or https://".to_string(),
            ));
        }

        Ok(Self {
            db_path: env::var("BUSFLOW_DB_PATH")
                .unwrap_or_else(|_| DEFAULT_DB_PATH.to_string()),

            feed_base_url,

            stops,

            poll_interval_secs: env::var("POLL_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(180),

            pacing_budget_secs: env::var("PACING_BUDGET_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(140),

            lookahead_minutes: env::var("LOOKAHEAD_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        })
    }
}
