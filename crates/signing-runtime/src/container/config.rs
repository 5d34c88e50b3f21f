//! # Runtime Configuration
//!
//! Built once from the environment at startup and passed down explicitly.

use signing_pipeline::{PipelineConfig, DEFAULT_CONTEXT, DEFAULT_MIN_BROADCAST_DURATION};
use signing_telemetry::{is_truthy, TelemetryConfig};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The telemetry context label is blank.
    #[error("SIGNING_CONTEXT must not be empty")]
    EmptyContext,

    /// A numeric variable did not parse.
    #[error("{name} must be a whole number of milliseconds, got {value:?}")]
    InvalidDuration { name: &'static str, value: String },
}

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Stop every run after signing (`DISABLE_TRANSACTION_BROADCAST`).
    pub broadcast_disabled: bool,
    /// Floor on a successful broadcast's visible duration.
    pub min_broadcast_duration: Duration,
    /// Telemetry context label, e.g. `Send`.
    pub context: String,
    pub telemetry: TelemetryConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            broadcast_disabled: false,
            min_broadcast_duration: DEFAULT_MIN_BROADCAST_DURATION,
            context: DEFAULT_CONTEXT.to_string(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load from environment variables.
    ///
    /// - `DISABLE_TRANSACTION_BROADCAST`: `1` or `true` disables broadcasting
    /// - `SIGNING_MIN_BROADCAST_MS`: minimum broadcast duration (default 3000)
    /// - `SIGNING_CONTEXT`: telemetry context label (default `Send`)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed or the result does
    /// not validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            telemetry: TelemetryConfig::from_lookup(&lookup),
            ..Self::default()
        };

        if let Some(value) = lookup("DISABLE_TRANSACTION_BROADCAST") {
            config.broadcast_disabled = is_truthy(&value);
        }

        if let Some(value) = lookup("SIGNING_MIN_BROADCAST_MS") {
            let millis = value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidDuration {
                    name: "SIGNING_MIN_BROADCAST_MS",
                    value: value.clone(),
                })?;
            config.min_broadcast_duration = Duration::from_millis(millis);
        }

        if let Some(value) = lookup("SIGNING_CONTEXT") {
            config.context = value;
        }

        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// `ConfigError::EmptyContext` for a blank context label.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.context.trim().is_empty() {
            return Err(ConfigError::EmptyContext);
        }
        Ok(())
    }

    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_min_broadcast_duration(self.min_broadcast_duration)
            .with_context(self.context.clone())
    }
}
