//! Prometheus metrics for signing runs.
//!
//! All metrics follow the naming convention: `signing_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: runs started, signed, broadcasted, refused, errored, cancelled
//! - **Histogram**: broadcast duration as seen by the caller

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    static ref METRICS: Result<SigningMetrics, String> =
        SigningMetrics::new().map_err(|e| e.to_string());
}

/// Counters and histograms of the signing pipeline.
#[derive(Clone)]
pub struct SigningMetrics {
    pub runs_started: IntCounter,
    pub runs_signed: IntCounter,
    pub runs_broadcasted: IntCounter,
    pub runs_refused: IntCounter,
    /// Labelled by error kind (`disconnected_device`, `broadcast_error`, ...)
    pub runs_errored: IntCounterVec,
    pub runs_cancelled: IntCounter,
    /// Seconds from signature to broadcast result
    pub broadcast_duration: Histogram,
}

impl SigningMetrics {
    fn new() -> Result<Self, prometheus::Error> {
        Ok(Self {
            runs_started: IntCounter::new(
                "signing_runs_started_total",
                "Signing runs that opened a device stream",
            )?,
            runs_signed: IntCounter::new(
                "signing_runs_signed_total",
                "Signing runs where the device produced a signature",
            )?,
            runs_broadcasted: IntCounter::new(
                "signing_runs_broadcasted_total",
                "Signed operations accepted by the network",
            )?,
            runs_refused: IntCounter::new(
                "signing_runs_refused_total",
                "Signing runs refused by the user on the device",
            )?,
            runs_errored: IntCounterVec::new(
                Opts::new("signing_runs_errored_total", "Signing runs that ended in error"),
                &["kind"],
            )?,
            runs_cancelled: IntCounter::new(
                "signing_runs_cancelled_total",
                "Signing runs cancelled before their outcome",
            )?,
            broadcast_duration: Histogram::with_opts(
                HistogramOpts::new(
                    "signing_broadcast_duration_seconds",
                    "Time from signature to broadcast result",
                )
                .buckets(exponential_buckets(0.25, 2.0, 8)?),
            )?,
        })
    }

    fn collectors(&self) -> Vec<Box<dyn prometheus::core::Collector>> {
        vec![
            Box::new(self.runs_started.clone()),
            Box::new(self.runs_signed.clone()),
            Box::new(self.runs_broadcasted.clone()),
            Box::new(self.runs_refused.clone()),
            Box::new(self.runs_errored.clone()),
            Box::new(self.runs_cancelled.clone()),
            Box::new(self.broadcast_duration.clone()),
        ]
    }
}

/// The process-wide metric set.
///
/// # Errors
///
/// `TelemetryError::MetricsInit` if the metric definitions are invalid.
pub fn signing_metrics() -> Result<&'static SigningMetrics, TelemetryError> {
    METRICS
        .as_ref()
        .map_err(|e| TelemetryError::MetricsInit(e.clone()))
}

/// Handle to the registered metrics
#[derive(Clone)]
pub struct MetricsHandle {
    metrics: &'static SigningMetrics,
}

impl MetricsHandle {
    #[must_use]
    pub fn metrics(&self) -> &'static SigningMetrics {
        self.metrics
    }
}

/// Register all metrics with the global registry. Safe to call twice.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics = signing_metrics()?;

    for collector in metrics.collectors() {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle { metrics })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
