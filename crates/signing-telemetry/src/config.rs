//! Telemetry configuration from environment variables.

use serde::{Deserialize, Serialize};
use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line
    pub service_name: String,

    /// Log filter directive (trace, debug, info, warn, error, or a full
    /// `EnvFilter` expression)
    pub log_level: String,

    /// Whether to write logs to stdout at all
    pub console_output: bool,

    /// JSON formatted logs instead of human-readable ones
    pub json_logs: bool,

    /// Whether Prometheus metrics are registered
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "device-signing".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            metrics_enabled: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SIGNING_SERVICE_NAME`: Service name (default: device-signing)
    /// - `SIGNING_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `SIGNING_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `SIGNING_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    /// - `SIGNING_METRICS`: Register Prometheus metrics (default: true)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        Self {
            service_name: lookup("SIGNING_SERVICE_NAME")
                .unwrap_or_else(|| "device-signing".to_string()),

            log_level: lookup("SIGNING_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or_else(|| "info".to_string()),

            console_output: lookup("SIGNING_CONSOLE_OUTPUT")
                .map(|v| !is_falsy(&v))
                .unwrap_or(true),

            json_logs: lookup("SIGNING_JSON_LOGS")
                .map(|v| is_truthy(&v))
                .unwrap_or(is_container),

            metrics_enabled: lookup("SIGNING_METRICS")
                .map(|v| !is_falsy(&v))
                .unwrap_or(true),
        }
    }

    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

/// `1` or `true`, case-insensitive.
pub fn is_truthy(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn is_falsy(value: &str) -> bool {
    value == "0" || value.eq_ignore_ascii_case("false")
}
