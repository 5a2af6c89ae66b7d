//! Configuration management for the sync runtime.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Sync configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Base URL of the remote API
    pub api_url: String,
    /// Bearer token sent with remote calls
    pub auth_token: Option<String>,
    /// SQLite URL of the local key-value store
    pub database_url: String,
    /// Quiet period before a scorecard edit is persisted
    pub debounce: Duration,
    /// How long the "saved" indicator stays up
    pub saved_display: Duration,
    /// Failed attempts before a queued operation is evicted
    pub max_retries: u32,
    /// Timeout for one remote call
    pub request_timeout: Duration,
    /// Path probed to decide whether the API is reachable
    pub probe_path: String,
    /// Interval between connectivity probes
    pub probe_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            auth_token: None,
            database_url: "sqlite://scorecard.db".to_string(),
            debounce: Duration::from_millis(600),
            saved_display: Duration::from_millis(2_500),
            max_retries: scorecard_engine::MAX_RETRIES,
            request_timeout: Duration::from_secs(30),
            probe_path: "/api/health".to_string(),
            probe_interval: Duration::from_secs(5),
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_url = lookup("SCORECARD_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);

        let auth_token = lookup("SCORECARD_AUTH_TOKEN").filter(|token| !token.is_empty());

        let database_url = lookup("SCORECARD_DATABASE_URL").unwrap_or(defaults.database_url);

        let debounce = parse(&lookup, "SCORECARD_DEBOUNCE_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.debounce);

        let saved_display = parse(&lookup, "SCORECARD_SAVED_DISPLAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.saved_display);

        let max_retries = match parse::<u32, _>(&lookup, "SCORECARD_MAX_RETRIES")? {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    name: "SCORECARD_MAX_RETRIES",
                    value: "0".to_string(),
                })
            }
            Some(retries) => retries,
            None => defaults.max_retries,
        };

        let request_timeout = parse(&lookup, "SCORECARD_REQUEST_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let probe_path = lookup("SCORECARD_PROBE_PATH").unwrap_or(defaults.probe_path);

        let probe_interval = parse(&lookup, "SCORECARD_PROBE_INTERVAL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.probe_interval);

        Ok(Self {
            api_url,
            auth_token,
            database_url,
            debounce,
            saved_display,
            max_retries,
            request_timeout,
            probe_path,
            probe_interval,
        })
    }
}

fn parse<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}
