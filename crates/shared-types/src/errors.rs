//! # Error Types
//!
//! Raw failures as reported by the device transport and the broadcast
//! capability. Classification into the caller-facing taxonomy lives in the
//! signing pipeline.

use thiserror::Error;

/// APDU status word the device returns when the user rejects on screen
/// ("conditions of use not satisfied").
pub const STATUS_CONDITIONS_OF_USE_NOT_SATISFIED: u16 = 0x6985;

/// A failure raised by the device event stream.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceFailure {
    /// The device is absent or stopped responding.
    #[error("Device {path} is not connected")]
    Disconnected { path: String },

    /// The device answered with a non-success status word.
    #[error("Device returned status 0x{status_code:04x}: {message}")]
    Status { status_code: u16, message: String },

    /// Transport-level error (HID/BLE framing, I/O).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Any other failure raised while preparing or signing.
    #[error("{0}")]
    Other(String),
}

impl DeviceFailure {
    /// Status word carried by this failure, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            DeviceFailure::Status { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Failure the device raises when the user rejects the transaction.
    pub fn user_refused() -> Self {
        DeviceFailure::Status {
            status_code: STATUS_CONDITIONS_OF_USE_NOT_SATISFIED,
            message: "Conditions of use not satisfied".to_string(),
        }
    }
}

/// A failure raised by a bridge broadcast call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BroadcastFailure {
    /// The network rejected the transaction.
    #[error("Transaction rejected: {reason}")]
    Rejected { reason: String },

    /// The network could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// The broadcast did not complete in time.
    #[error("Broadcast timed out")]
    Timeout,
}

/// Account resolution errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccountError {
    /// A token account was supplied without its holding account.
    #[error("Token account {account_id} requires a parent account")]
    MissingParent { account_id: String },

    /// The supplied parent does not hold the token account.
    #[error("Parent account mismatch: expected {expected}, got {actual}")]
    ParentMismatch { expected: String, actual: String },
}
