//! # Run State Machine
//!
//! Lifecycle of one run as an enum with a checked transition table.

use crate::domain::errors::InvalidTransition;

/// Lifecycle state of a signing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Idle,
    Streaming,
    Signed,
    Broadcasted,
    BroadcastFailed,
    SignError,
    Cancelled,
}

impl RunState {
    /// States no transition leaves.
    ///
    /// `Signed` is terminal only when broadcasting is disabled; see
    /// [`RunStateMachine::is_terminal`].
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Broadcasted
                | RunState::BroadcastFailed
                | RunState::SignError
                | RunState::Cancelled
        )
    }

    #[must_use]
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        match (self, next) {
            (Idle, Streaming) | (Idle, SignError) => true,
            (Streaming, Streaming) | (Streaming, Signed) | (Streaming, SignError) => true,
            (Signed, Broadcasted) | (Signed, BroadcastFailed) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Streaming => "streaming",
            RunState::Signed => "signed",
            RunState::Broadcasted => "broadcasted",
            RunState::BroadcastFailed => "broadcast_failed",
            RunState::SignError => "sign_error",
            RunState::Cancelled => "cancelled",
        }
    }
}

/// Tracks the state of one run and rejects illegal moves.
#[derive(Debug, Clone)]
pub struct RunStateMachine {
    state: RunState,
    signed_is_final: bool,
    history: Vec<RunState>,
}

impl RunStateMachine {
    /// A machine in `Idle`. With `broadcast_disabled`, `Signed` is terminal.
    #[must_use]
    pub fn new(broadcast_disabled: bool) -> Self {
        Self {
            state: RunState::Idle,
            signed_is_final: broadcast_disabled,
            history: vec![RunState::Idle],
        }
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Every state visited, in order, starting with `Idle`.
    #[must_use]
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal() || (self.signed_is_final && self.state == RunState::Signed)
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] if the run is terminal or the move is
    /// not in the lifecycle.
    pub fn advance(&mut self, next: RunState) -> Result<RunState, InvalidTransition> {
        if self.is_terminal() || !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        if self.history.last() != Some(&next) {
            self.history.push(next);
        }
        Ok(next)
    }
}
