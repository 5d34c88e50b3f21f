//! # Run Handle
//!
//! The caller's side of a run: its event feed, its cancel switch and the
//! sticky has-signed flag.

use crate::domain::errors::SigningError;
use crate::domain::outcome::{FlowEvent, RunOutcome};
use shared_types::{DeviceFailure, SignedOperation};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

const ACTIVE: u8 = 0;
const TERMINATED: u8 = 1;
const CANCELLED: u8 = 2;

/// Decides, once, whether a run terminates or is cancelled.
///
/// Whichever of [`cancel`](Self::cancel) and `mark_terminated` wins the
/// race owns the run's ending; the other becomes a no-op.
#[derive(Debug)]
pub struct RunController {
    status: AtomicU8,
    token: CancellationToken,
}

impl RunController {
    pub(crate) fn new() -> Self {
        Self {
            status: AtomicU8::new(ACTIVE),
            token: CancellationToken::new(),
        }
    }

    /// Cancel the run.
    ///
    /// Returns `true` if this call cancelled it; `false` if the run had
    /// already ended or been cancelled.
    pub fn cancel(&self) -> bool {
        let won = self
            .status
            .compare_exchange(ACTIVE, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.token.cancel();
        }
        won
    }

    /// Claim the terminal outcome. `false` if the run was cancelled first.
    pub(crate) fn mark_terminated(&self) -> bool {
        self.status
            .compare_exchange(ACTIVE, TERMINATED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.status.load(Ordering::Acquire) == CANCELLED
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.status.load(Ordering::Acquire) == TERMINATED
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

/// Handle to one running signing flow.
///
/// Dropping the handle of a run that has not ended cancels it.
pub struct RunHandle {
    run_id: Uuid,
    controller: Arc<RunController>,
    signed: Arc<AtomicBool>,
    events: mpsc::UnboundedReceiver<FlowEvent>,
    signed_operation: Option<SignedOperation>,
    outcome: Option<RunOutcome>,
}

impl RunHandle {
    pub(crate) fn new(
        run_id: Uuid,
        controller: Arc<RunController>,
        signed: Arc<AtomicBool>,
        events: mpsc::UnboundedReceiver<FlowEvent>,
    ) -> Self {
        Self {
            run_id,
            controller,
            signed,
            events,
            signed_operation: None,
            outcome: None,
        }
    }

    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Next event of the run, or `None` once it has ended or been cancelled.
    pub async fn next_event(&mut self) -> Option<FlowEvent> {
        if self.controller.is_cancelled() {
            return None;
        }
        let event = self.events.recv().await?;
        if self.controller.is_cancelled() {
            return None;
        }
        self.record(&event);
        Some(event)
    }

    /// Cancel the run. Idempotent; a no-op once the run has ended.
    pub fn cancel(&self) -> bool {
        let cancelled = self.controller.cancel();
        if cancelled {
            debug!(run_id = %self.run_id, "Run cancellation requested");
        }
        cancelled
    }

    /// Shared cancel switch, for cancelling from elsewhere.
    #[must_use]
    pub fn controller(&self) -> Arc<RunController> {
        self.controller.clone()
    }

    /// `true` once the device has produced a signature, even if the run
    /// later fails or is cancelled.
    #[must_use]
    pub fn has_signed(&self) -> bool {
        self.signed.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.controller.is_cancelled()
    }

    /// Drain the run and return how it ended.
    ///
    /// `Cancelled` only if the run was cancelled. A run whose task died
    /// before reporting an outcome is a generic failure.
    pub async fn outcome(mut self) -> RunOutcome {
        while self.outcome.is_none() {
            if self.next_event().await.is_none() {
                break;
            }
        }
        match self.outcome.take() {
            Some(outcome) => outcome,
            None if self.controller.is_cancelled() => RunOutcome::Cancelled,
            None => {
                warn!(run_id = %self.run_id, "Run ended without an outcome");
                RunOutcome::Failed(SigningError::GenericSignError(DeviceFailure::Other(
                    "Run ended without an outcome".to_string(),
                )))
            }
        }
    }

    fn record(&mut self, event: &FlowEvent) {
        match event {
            FlowEvent::Progress(_) => {}
            FlowEvent::Signed {
                signed_operation,
                broadcast_pending,
            } => {
                if *broadcast_pending {
                    self.signed_operation = Some(signed_operation.clone());
                } else {
                    self.outcome = Some(RunOutcome::SignedOnly(signed_operation.clone()));
                }
            }
            FlowEvent::Broadcasted { operation } => {
                if let Some(signed_operation) = self.signed_operation.take() {
                    self.outcome = Some(RunOutcome::Broadcasted {
                        signed_operation,
                        operation: operation.clone(),
                    });
                }
            }
            FlowEvent::Failed(error) => self.outcome = Some(RunOutcome::Failed(error.clone())),
        }
    }
}

impl std::fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunHandle")
            .field("run_id", &self.run_id)
            .field("controller", &self.controller)
            .field("has_signed", &self.has_signed())
            .finish_non_exhaustive()
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        if self.controller.cancel() {
            debug!(run_id = %self.run_id, "Run handle dropped, run cancelled");
        }
    }
}
