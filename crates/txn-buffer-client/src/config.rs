//! Client configuration with validation.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default time a request may stay pending before it fails with a timeout.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default granularity of the timeout sweep.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bound for both durations. Deadlines are computed as `now + timeout`,
/// which must stay representable as an instant.
pub const MAX_OPERATION_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("invalid environment value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
}

/// Transaction buffer client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxnBufferClientConfig {
    /// Time a request may stay pending. Must be the same for every request
    /// of one handler; the timeout sweep depends on it.
    #[serde(with = "humantime_serde")]
    pub operation_timeout: Duration,
    /// How often expired requests are swept. A request can outlive its deadline
    /// by up to one tick.
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
}

impl Default for TxnBufferClientConfig {
    fn default() -> Self {
        Self {
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

impl TxnBufferClientConfig {
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn with_tick_interval(mut self, tick: Duration) -> Self {
        self.tick_interval = tick;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.operation_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "operation_timeout cannot be 0".into(),
            ));
        }

        if self.tick_interval.is_zero() {
            return Err(ConfigError::InvalidTimeout("tick_interval cannot be 0".into()));
        }

        if self.operation_timeout > MAX_OPERATION_TIMEOUT {
            return Err(ConfigError::InvalidTimeout(format!(
                "operation_timeout ({}ms) exceeds maximum ({}ms)",
                self.operation_timeout.as_millis(),
                MAX_OPERATION_TIMEOUT.as_millis()
            )));
        }

        if self.tick_interval > self.operation_timeout {
            return Err(ConfigError::InvalidTimeout(format!(
                "tick_interval ({}ms) exceeds operation_timeout ({}ms)",
                self.tick_interval.as_millis(),
                self.operation_timeout.as_millis()
            )));
        }

        Ok(())
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TB_OPERATION_TIMEOUT_MS`: request timeout in milliseconds (default: 30000)
    /// - `TB_TICK_INTERVAL_MS`: sweep interval in milliseconds (default: 1000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(ms) = read_millis("TB_OPERATION_TIMEOUT_MS")? {
            config.operation_timeout = ms;
        }
        if let Some(ms) = read_millis("TB_TICK_INTERVAL_MS")? {
            config.tick_interval = ms;
        }

        config.validate()?;
        Ok(config)
    }
}

fn read_millis(name: &'static str) -> Result<Option<Duration>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| ConfigError::InvalidEnv { name, value }),
        Err(_) => Ok(None),
    }
}
