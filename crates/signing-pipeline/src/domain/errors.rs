//! # Error Types
//!
//! Caller-facing error taxonomy of a signing run, plus the classifier that
//! maps raw device failures onto it.

use crate::domain::state::RunState;
use shared_types::{AccountError, BroadcastFailure, DeviceFailure, STATUS_CONDITIONS_OF_USE_NOT_SATISFIED};
use thiserror::Error;

/// Terminal error of a signing run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SigningError {
    /// No device, or the device went away mid-run.
    #[error("Device is not connected")]
    DisconnectedDevice,

    /// The user rejected the transaction on the device.
    #[error("Transaction refused on device")]
    UserRefusedOnDevice,

    /// Any other device-side failure; the raw cause is kept.
    #[error("Signing failed: {0}")]
    GenericSignError(#[source] DeviceFailure),

    /// The signature was produced but the network rejected or lost it.
    #[error("Broadcast failed: {0}")]
    BroadcastError(#[source] BroadcastFailure),
}

/// Sign-phase category a raw device failure falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignErrorKind {
    UserRefusedOnDevice,
    DisconnectedDevice,
    GenericSignError,
}

/// Classify a raw device failure.
///
/// Status `0x6985` means the user refused on screen. Precedence is refused,
/// then disconnected, then generic.
#[must_use]
pub fn classify(failure: &DeviceFailure) -> SignErrorKind {
    if failure.status_code() == Some(STATUS_CONDITIONS_OF_USE_NOT_SATISFIED) {
        return SignErrorKind::UserRefusedOnDevice;
    }
    match failure {
        DeviceFailure::Disconnected { .. } => SignErrorKind::DisconnectedDevice,
        _ => SignErrorKind::GenericSignError,
    }
}

impl SigningError {
    /// Build the terminal error for a failure raised during streaming.
    #[must_use]
    pub fn from_device_failure(failure: DeviceFailure) -> Self {
        match classify(&failure) {
            SignErrorKind::UserRefusedOnDevice => SigningError::UserRefusedOnDevice,
            SignErrorKind::DisconnectedDevice => SigningError::DisconnectedDevice,
            SignErrorKind::GenericSignError => SigningError::GenericSignError(failure),
        }
    }

    /// `true` when the device produced no signature.
    #[must_use]
    pub fn is_sign_phase(&self) -> bool {
        !matches!(self, SigningError::BroadcastError(_))
    }

    /// Stable label for logs and metrics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            SigningError::DisconnectedDevice => "disconnected_device",
            SigningError::UserRefusedOnDevice => "user_refused_on_device",
            SigningError::GenericSignError(_) => "generic_sign_error",
            SigningError::BroadcastError(_) => "broadcast_error",
        }
    }
}

impl From<BroadcastFailure> for SigningError {
    fn from(failure: BroadcastFailure) -> Self {
        SigningError::BroadcastError(failure)
    }
}

/// Attempted a state change the run lifecycle does not allow.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("Invalid run transition: {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: RunState,
    pub to: RunState,
}

/// A run could not be started.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StartError {
    /// A required argument was not supplied.
    #[error("Invalid arguments: missing {0}")]
    MissingArgument(&'static str),

    /// The account and parent do not resolve to a main account.
    #[error("Invalid arguments: {0}")]
    Account(#[from] AccountError),
}
