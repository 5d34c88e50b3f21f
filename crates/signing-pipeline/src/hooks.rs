//! Telemetry hooks fired at run transition points.

use crate::ports::outbound::{TelemetryPayload, TelemetrySink, TransitionPoint};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// The telemetry sinks of a pipeline.
///
/// A sink that errors or panics is logged and skipped; the run continues.
#[derive(Clone, Default)]
pub struct TransitionHooks {
    sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl TransitionHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn add(&mut self, sink: Arc<dyn TelemetrySink>) {
        self.sinks.push(sink);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Notify every sink. Returns how many failed.
    pub fn fire(&self, point: TransitionPoint, payload: &TelemetryPayload) -> usize {
        let mut failures = 0;
        for sink in &self.sinks {
            match panic::catch_unwind(AssertUnwindSafe(|| sink.record(point, payload))) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    failures += 1;
                    warn!(
                        event = %payload.event_name,
                        error = %error,
                        "Telemetry hook failed"
                    );
                }
                Err(_) => {
                    failures += 1;
                    warn!(event = %payload.event_name, "Telemetry hook panicked");
                }
            }
        }
        failures
    }
}

impl fmt::Debug for TransitionHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionHooks")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}
