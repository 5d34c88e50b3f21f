//! # Simulated Device Transport
//!
//! Plays a scripted signing exchange onto the device bus, the way a HID or
//! BLE transport would publish what the device answers.

use device_bus::{DeviceFilter, DeviceMessage, DevicePayload, DevicePublisher, InMemoryDeviceBus};
use shared_types::{DeviceFailure, DeviceHandle, SignedOperation, SigningEvent};
use signing_pipeline::SigningEventStream;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, trace};

/// One scripted device answer, published after `delay`.
#[derive(Debug, Clone)]
pub struct ScriptStep {
    pub delay: Duration,
    pub payload: DevicePayload,
}

/// What the simulated device does during one exchange.
#[derive(Debug, Clone, Default)]
pub struct DeviceScript {
    steps: Vec<ScriptStep>,
}

impl DeviceScript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn then(mut self, delay: Duration, payload: DevicePayload) -> Self {
        self.steps.push(ScriptStep { delay, payload });
        self
    }

    #[must_use]
    pub fn event(self, delay: Duration, event: SigningEvent) -> Self {
        self.then(delay, DevicePayload::Event(event))
    }

    /// Stream `chunks` pieces of transaction data, reporting progress from
    /// 0 to 1 inclusive.
    #[must_use]
    pub fn streaming(mut self, chunks: u32, step: Duration) -> Self {
        let chunks = chunks.max(1);
        for index in 0..=chunks {
            let progress = f64::from(index) / f64::from(chunks);
            self = self.event(step, SigningEvent::streaming(progress, index, chunks));
        }
        self
    }

    /// Streams, asks for review, and the user approves.
    #[must_use]
    pub fn approve(signed_operation: SignedOperation, step: Duration) -> Self {
        Self::new()
            .streaming(4, step)
            .event(step, SigningEvent::DeviceSignatureRequested)
            .event(step, SigningEvent::DeviceSignatureGranted)
            .event(step, SigningEvent::Signed { signed_operation })
            .then(Duration::ZERO, DevicePayload::Completed)
    }

    /// Streams, asks for review, and the user rejects on screen.
    #[must_use]
    pub fn refuse(step: Duration) -> Self {
        Self::new()
            .streaming(4, step)
            .event(step, SigningEvent::DeviceSignatureRequested)
            .then(step, DevicePayload::Failure(DeviceFailure::user_refused()))
    }

    /// The device is unplugged partway through streaming.
    #[must_use]
    pub fn unplug(path: impl Into<String>, step: Duration) -> Self {
        Self::new()
            .streaming(4, step)
            .then(
                step,
                DevicePayload::Failure(DeviceFailure::Disconnected { path: path.into() }),
            )
    }

    #[must_use]
    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }
}

/// Device transport that answers every exchange with a script.
pub struct SimulatedTransport {
    bus: Arc<InMemoryDeviceBus>,
    script: DeviceScript,
}

impl SimulatedTransport {
    #[must_use]
    pub fn new(bus: Arc<InMemoryDeviceBus>, script: DeviceScript) -> Self {
        Self { bus, script }
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<InMemoryDeviceBus> {
        &self.bus
    }

    /// Subscribe to `device`, then start playing the script onto the bus.
    ///
    /// Playback stops as soon as nobody listens to the device any more.
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn open(&self, device: &DeviceHandle) -> SigningEventStream {
        let stream = self.bus.event_stream(DeviceFilter::device(device.path.clone()));

        let bus = self.bus.clone();
        let script = self.script.clone();
        let path = device.path.clone();
        tokio::spawn(async move {
            for step in script.steps {
                sleep(step.delay).await;
                if bus.subscribers_for(&path) == 0 {
                    debug!(device = %path, "Exchange abandoned, playback stopped");
                    return;
                }
                trace!(device = %path, "Publishing scripted device answer");
                bus.publish(DeviceMessage {
                    device_path: path.clone(),
                    payload: step.payload,
                })
                .await;
            }
        });

        Box::pin(stream)
    }
}
