//! # Signing Telemetry
//!
//! Logging and metrics for the device signing workspace.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` with an `EnvFilter`, pretty or JSON
//! - **Metrics**: Prometheus counters and a broadcast-duration histogram
//!
//! ## Usage
//!
//! ```rust,ignore
//! use signing_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SIGNING_SERVICE_NAME` | `device-signing` | Service name in logs |
//! | `SIGNING_LOG_LEVEL` | `info` | Log filter (falls back to `RUST_LOG`) |
//! | `SIGNING_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `SIGNING_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//! | `SIGNING_METRICS` | `true` | Register Prometheus metrics |

mod config;
mod metrics;
mod tracing_setup;

pub use config::{is_truthy, TelemetryConfig};
pub use metrics::{
    encode_metrics, register_metrics, signing_metrics, MetricsHandle, SigningMetrics, REGISTRY,
};
pub use tracing_setup::{build_filter, init_tracing, TracingGuard};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing: {0}")]
    TracerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Install logging and register metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
///
/// # Errors
///
/// Fails if a global subscriber is already installed or the metric
/// definitions are invalid.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = if config.metrics_enabled {
        Some(register_metrics()?)
    } else {
        None
    };

    let tracing = init_tracing(&config)?;

    Ok(TelemetryGuard {
        _tracing: tracing,
        metrics,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _tracing: TracingGuard,
    metrics: Option<MetricsHandle>,
}

impl TelemetryGuard {
    /// Registered metrics, if enabled.
    #[must_use]
    pub fn metrics(&self) -> Option<&MetricsHandle> {
        self.metrics.as_ref()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry");
    }
}
