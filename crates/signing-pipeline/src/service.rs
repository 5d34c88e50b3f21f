//! # Signing Pipeline Service
//!
//! Application service that implements the `SigningFlowApi` trait.
//!
//! ## Architecture
//!
//! - Implements the inbound port (`SigningFlowApi`)
//! - Drives the outbound ports (`AccountBridge`, `ProgressObserver`,
//!   `TelemetrySink`) from one task per run
//! - Delegates filtering, classification and timing to the domain layer

use crate::config::PipelineConfig;
use crate::domain::errors::SigningError;
use crate::domain::filter::{dispatch, Dispatch};
use crate::domain::outcome::FlowEvent;
use crate::domain::state::{RunState, RunStateMachine};
use crate::domain::timing::exec_and_wait_at_least;
use crate::handle::{RunController, RunHandle};
use crate::hooks::TransitionHooks;
use crate::ports::inbound::{SigningFlowApi, StartArgs};
use crate::ports::outbound::{SigningEventStream, TelemetryPayload, TransitionPoint};
use futures::StreamExt;
use shared_types::{DeviceFailure, SignedOperation, SigningEvent};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, trace, warn, Instrument};
use uuid::Uuid;

/// Signing pipeline.
///
/// Holds configuration and telemetry hooks shared by every run; each call to
/// [`SigningFlowApi::start`] gets its own task, state machine and handle.
#[derive(Debug, Clone, Default)]
pub struct SigningPipeline {
    config: PipelineConfig,
    hooks: TransitionHooks,
}

impl SigningPipeline {
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            hooks: TransitionHooks::new(),
        }
    }

    #[must_use]
    pub fn with_hooks(config: PipelineConfig, hooks: TransitionHooks) -> Self {
        Self { config, hooks }
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub fn hooks(&self) -> &TransitionHooks {
        &self.hooks
    }
}

impl SigningFlowApi for SigningPipeline {
    fn start(&self, args: StartArgs) -> RunHandle {
        let run_id = Uuid::new_v4();
        let controller = Arc::new(RunController::new());
        let signed = Arc::new(AtomicBool::new(false));
        let (events, receiver) = mpsc::unbounded_channel();
        let context = args
            .context
            .clone()
            .unwrap_or_else(|| self.config.context.clone());

        let span = info_span!(
            "signing_run",
            run_id = %run_id,
            context = %context,
            currency = %args.account.currency().id,
        );

        let mut run = SigningRun {
            run_id,
            context,
            machine: RunStateMachine::new(args.broadcast_disabled),
            args,
            config: self.config.clone(),
            hooks: self.hooks.clone(),
            controller: controller.clone(),
            signed: signed.clone(),
            events,
        };

        if run.args.device.is_none() {
            let _entered = span.enter();
            run.fail_without_device();
        } else {
            tokio::spawn(run.execute().instrument(span));
        }

        RunHandle::new(run_id, controller, signed, receiver)
    }
}

/// State owned by the task driving one run.
struct SigningRun {
    run_id: Uuid,
    context: String,
    args: StartArgs,
    config: PipelineConfig,
    hooks: TransitionHooks,
    machine: RunStateMachine,
    controller: Arc<RunController>,
    signed: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<FlowEvent>,
}

impl SigningRun {
    async fn execute(mut self) {
        let Some(device) = self.args.device.clone() else {
            self.fail_without_device();
            return;
        };
        if self.controller.is_cancelled() {
            self.on_cancelled();
            return;
        }

        info!(device = %device, "Signing run started");
        self.fire(TransitionPoint::Start, None);
        self.transition(RunState::Streaming);

        let stream =
            self.args
                .bridge
                .open_device_stream(&device, &self.args.account, &self.args.transaction);

        let Some(signed_operation) = self.stream_until_signed(stream).await else {
            return;
        };

        self.signed.store(true, Ordering::Release);
        self.transition(RunState::Signed);
        self.fire(TransitionPoint::Signed, None);
        info!(operation = %signed_operation.operation.id, "Transaction signed");

        if self.args.broadcast_disabled {
            debug!("Broadcast disabled, run ends at signature");
            self.finish(FlowEvent::Signed {
                signed_operation,
                broadcast_pending: false,
            });
            return;
        }

        self.emit(FlowEvent::Signed {
            signed_operation: signed_operation.clone(),
            broadcast_pending: true,
        });
        self.broadcast(signed_operation).await;
    }

    /// Consume the device stream until it yields a signature.
    ///
    /// Returns `None` when the run ended here (failure or cancellation). The
    /// stream is dropped on return either way.
    async fn stream_until_signed(&mut self, mut stream: SigningEventStream) -> Option<SignedOperation> {
        let token = self.controller.token();
        loop {
            let item = tokio::select! {
                biased;
                () = token.cancelled() => {
                    self.on_cancelled();
                    return None;
                }
                item = stream.next() => item,
            };

            match item {
                Some(Ok(event)) => {
                    let decision = dispatch(event, |e| self.observer_accepts(e));
                    match decision {
                        Dispatch::Skip => trace!("Device event filtered"),
                        Dispatch::Progress(event) => {
                            self.transition(RunState::Streaming);
                            self.emit(FlowEvent::Progress(event));
                        }
                        Dispatch::Signed(signed_operation) => return Some(signed_operation),
                    }
                }
                Some(Err(failure)) => {
                    self.fail_signing(SigningError::from_device_failure(failure));
                    return None;
                }
                None => {
                    self.fail_signing(SigningError::GenericSignError(DeviceFailure::Other(
                        "Device stream ended before a signature was produced".to_string(),
                    )));
                    return None;
                }
            }
        }
    }

    async fn broadcast(&mut self, signed_operation: SignedOperation) {
        let token = self.controller.token();
        let min = self.config.min_broadcast_duration;

        let result = {
            let bridge = &self.args.bridge;
            let account = &self.args.account;
            let signed_operation = &signed_operation;
            tokio::select! {
                biased;
                () = token.cancelled() => None,
                result = exec_and_wait_at_least(min, || bridge.broadcast(account, signed_operation)) => Some(result),
            }
        };

        match result {
            None => self.on_cancelled(),
            Some(Ok(operation)) => {
                self.transition(RunState::Broadcasted);
                self.fire(TransitionPoint::Broadcasted, None);
                info!(operation = %operation.id, hash = %operation.hash, "Transaction broadcasted");
                self.finish(FlowEvent::Broadcasted { operation });
            }
            Some(Err(failure)) => {
                let error = SigningError::BroadcastError(failure);
                self.transition(RunState::BroadcastFailed);
                self.fire(TransitionPoint::Error, Some(&error));
                warn!(error = %error, "Broadcast failed");
                self.finish(FlowEvent::Failed(error));
            }
        }
    }

    fn fail_without_device(&mut self) {
        warn!("No device connected, run not started");
        self.transition(RunState::SignError);
        self.finish(FlowEvent::Failed(SigningError::DisconnectedDevice));
    }

    fn fail_signing(&mut self, error: SigningError) {
        let point = if error == SigningError::UserRefusedOnDevice {
            TransitionPoint::Refused
        } else {
            TransitionPoint::Error
        };
        self.transition(RunState::SignError);
        self.fire(point, Some(&error));
        warn!(error = %error, kind = error.label(), "Signing failed");
        self.finish(FlowEvent::Failed(error));
    }

    fn on_cancelled(&mut self) {
        let from = self.machine.state();
        self.transition(RunState::Cancelled);
        info!(state = from.as_str(), "Signing run cancelled");
    }

    fn transition(&mut self, next: RunState) {
        let from = self.machine.state();
        match self.machine.advance(next) {
            Ok(_) if from != next => {
                debug!(from = from.as_str(), to = next.as_str(), "Run state changed");
            }
            Ok(_) => {}
            Err(error) => warn!(error = %error, "Run state change rejected"),
        }
    }

    fn fire(&self, point: TransitionPoint, error: Option<&SigningError>) {
        if self.hooks.is_empty() {
            return;
        }
        let mut payload = TelemetryPayload::new(self.run_id, point, &self.context, &self.args.account)
            .with_broadcast_pending(!self.args.broadcast_disabled);
        if let Some(error) = error {
            payload = payload.with_error(error);
        }
        self.hooks.fire(point, &payload);
    }

    /// Forward a non-terminal event unless the run was cancelled.
    fn emit(&self, event: FlowEvent) {
        if self.controller.is_cancelled() {
            return;
        }
        self.deliver(event);
    }

    /// Deliver the terminal event, if cancellation did not get there first.
    fn finish(&self, event: FlowEvent) {
        if !self.controller.mark_terminated() {
            debug!("Run was cancelled, outcome discarded");
            return;
        }
        self.deliver(event);
    }

    /// Observer predicate for informational events. A panicking predicate
    /// counts as accepting.
    fn observer_accepts(&self, event: &SigningEvent) -> bool {
        let Some(observer) = &self.args.observer else {
            return true;
        };
        panic::catch_unwind(AssertUnwindSafe(|| observer.accepts(event))).unwrap_or_else(|_| {
            warn!(kind = ?event.kind(), "Progress observer panicked in accepts");
            true
        })
    }

    fn deliver(&self, event: FlowEvent) {
        if let Some(observer) = &self.args.observer {
            let notified = panic::catch_unwind(AssertUnwindSafe(|| match &event {
                FlowEvent::Progress(progress) => observer.on_progress(progress),
                other => observer.on_outcome(other),
            }));
            if notified.is_err() {
                warn!(terminal = event.is_terminal(), "Progress observer panicked");
            }
        }
        if self.events.send(event).is_err() {
            trace!("Run handle gone, event dropped");
        }
    }
}
