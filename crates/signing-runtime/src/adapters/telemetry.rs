//! # Analytics Telemetry Sink
//!
//! Emits the named analytics events as structured `tracing` events on the
//! `analytics` target and keeps the Prometheus counters current.

use parking_lot::Mutex;
use signing_pipeline::{HookError, TelemetryPayload, TelemetrySink, TransitionPoint};
use signing_telemetry::SigningMetrics;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Signatures still awaiting a broadcast result after this long belong to
/// runs that ended without a terminal point and are dropped.
const PENDING_BROADCAST_TTL: Duration = Duration::from_secs(600);

pub struct AnalyticsSink {
    metrics: Option<&'static SigningMetrics>,
    signed_at: Mutex<HashMap<Uuid, Instant>>,
}

impl AnalyticsSink {
    /// A sink that only logs.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metrics: None,
            signed_at: Mutex::new(HashMap::new()),
        }
    }

    /// A sink that logs and updates `metrics`.
    #[must_use]
    pub fn with_metrics(metrics: &'static SigningMetrics) -> Self {
        Self {
            metrics: Some(metrics),
            signed_at: Mutex::new(HashMap::new()),
        }
    }

    /// Count a cancelled run. Cancellation is not a transition point, so
    /// the runtime reports it directly.
    pub fn record_cancelled(&self, run_id: Uuid) {
        self.signed_at.lock().remove(&run_id);
        if let Some(metrics) = self.metrics {
            metrics.runs_cancelled.inc();
        }
    }

    fn update_metrics(&self, point: TransitionPoint, payload: &TelemetryPayload) {
        let run_id = payload.run_id;
        let broadcast_elapsed = match point {
            TransitionPoint::Signed if payload.broadcast_pending => {
                let now = Instant::now();
                let mut signed_at = self.signed_at.lock();
                let tracked = signed_at.len();
                signed_at.retain(|_, at| now.duration_since(*at) < PENDING_BROADCAST_TTL);
                if signed_at.len() < tracked {
                    debug!(dropped = tracked - signed_at.len(), "Dropped stale pending broadcasts");
                }
                signed_at.insert(run_id, now);
                None
            }
            TransitionPoint::Signed => None,
            TransitionPoint::Broadcasted | TransitionPoint::Error => {
                self.signed_at.lock().remove(&run_id).map(|at| at.elapsed())
            }
            TransitionPoint::Start | TransitionPoint::Refused => None,
        };

        let Some(metrics) = self.metrics else {
            return;
        };
        match point {
            TransitionPoint::Start => metrics.runs_started.inc(),
            TransitionPoint::Signed => metrics.runs_signed.inc(),
            TransitionPoint::Broadcasted => metrics.runs_broadcasted.inc(),
            TransitionPoint::Refused => metrics.runs_refused.inc(),
            TransitionPoint::Error => {
                let kind = if broadcast_elapsed.is_some() {
                    "broadcast_error"
                } else {
                    "sign_error"
                };
                metrics.runs_errored.with_label_values(&[kind]).inc();
            }
        }
        if let Some(elapsed) = broadcast_elapsed {
            metrics.broadcast_duration.observe(elapsed.as_secs_f64());
        }
    }
}

impl Default for AnalyticsSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySink for AnalyticsSink {
    fn record(&self, point: TransitionPoint, payload: &TelemetryPayload) -> Result<(), HookError> {
        info!(
            target: "analytics",
            event = %payload.event_name,
            run_id = %payload.run_id,
            currency_name = %payload.currency_name,
            derivation_mode = %payload.derivation_mode,
            fresh_address_path = %payload.fresh_address_path,
            operations_length = payload.operations_length,
            error = payload.error.as_deref().unwrap_or(""),
            "Analytics event"
        );
        self.update_metrics(point, payload);
        Ok(())
    }
}
