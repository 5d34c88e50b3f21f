//! # Run Outcomes
//!
//! What a caller observes from a run: progress, the signature, the
//! broadcast result, or an error.

use crate::domain::errors::SigningError;
use shared_types::{Operation, SignedOperation, SigningEvent};

/// One event delivered to the caller of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    /// Filtered device progress.
    Progress(SigningEvent),

    /// The device produced a signature.
    ///
    /// `broadcast_pending` is `false` when broadcasting is disabled, in which
    /// case this is the terminal event.
    Signed {
        signed_operation: SignedOperation,
        broadcast_pending: bool,
    },

    /// The network accepted the operation.
    Broadcasted { operation: Operation },

    /// The run failed.
    Failed(SigningError),
}

impl FlowEvent {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        match self {
            FlowEvent::Progress(_) => false,
            FlowEvent::Signed {
                broadcast_pending, ..
            } => !broadcast_pending,
            FlowEvent::Broadcasted { .. } | FlowEvent::Failed(_) => true,
        }
    }
}

/// Next screen a UI should show once a run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStep {
    /// Show the confirmation (success or error) screen.
    Confirmation,
    /// Show the refused-on-device screen.
    Refused,
}

/// Final result of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Signed with broadcasting disabled.
    SignedOnly(SignedOperation),

    /// Signed and accepted by the network.
    Broadcasted {
        signed_operation: SignedOperation,
        operation: Operation,
    },

    /// The run ended with an error.
    Failed(SigningError),

    /// The run was cancelled before it ended.
    Cancelled,
}

impl RunOutcome {
    /// Which screen follows this outcome. `None` for a cancelled run.
    #[must_use]
    pub fn next_step(&self) -> Option<FlowStep> {
        match self {
            RunOutcome::Failed(SigningError::UserRefusedOnDevice) => Some(FlowStep::Refused),
            RunOutcome::Cancelled => None,
            _ => Some(FlowStep::Confirmation),
        }
    }

    /// The signed operation, if the device produced one.
    #[must_use]
    pub fn signed_operation(&self) -> Option<&SignedOperation> {
        match self {
            RunOutcome::SignedOnly(signed) => Some(signed),
            RunOutcome::Broadcasted {
                signed_operation, ..
            } => Some(signed_operation),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&SigningError> {
        match self {
            RunOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::SignedOnly(_) => "signed",
            RunOutcome::Broadcasted { .. } => "broadcasted",
            RunOutcome::Failed(_) => "failed",
            RunOutcome::Cancelled => "cancelled",
        }
    }
}
