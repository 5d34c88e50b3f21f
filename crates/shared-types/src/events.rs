//! # Signing Events
//!
//! Events produced by a device while it signs a transaction. Stream failures
//! are not events; they travel as the `Err` side of the stream item.

use serde::{Deserialize, Serialize};

use crate::entities::SignedOperation;

/// One step of a device signing exchange.
///
/// Produced in strictly increasing logical time by the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SigningEvent {
    /// Transaction data is being streamed to the device.
    DeviceStreaming {
        /// Fraction streamed, in `[0, 1]`.
        progress: f64,
        index: u32,
        total: u32,
    },

    /// The device is waiting for the user to review and approve.
    DeviceSignatureRequested,

    /// The user approved on the device.
    DeviceSignatureGranted,

    /// The device produced a signature.
    #[serde(rename_all = "camelCase")]
    Signed { signed_operation: SignedOperation },
}

/// Tag of a [`SigningEvent`], for logging and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningEventKind {
    DeviceStreaming,
    DeviceSignatureRequested,
    DeviceSignatureGranted,
    Signed,
}

impl SigningEvent {
    #[must_use]
    pub fn kind(&self) -> SigningEventKind {
        match self {
            SigningEvent::DeviceStreaming { .. } => SigningEventKind::DeviceStreaming,
            SigningEvent::DeviceSignatureRequested => SigningEventKind::DeviceSignatureRequested,
            SigningEvent::DeviceSignatureGranted => SigningEventKind::DeviceSignatureGranted,
            SigningEvent::Signed { .. } => SigningEventKind::Signed,
        }
    }

    /// Streaming progress, for `DeviceStreaming` events.
    #[must_use]
    pub fn progress(&self) -> Option<f64> {
        match self {
            SigningEvent::DeviceStreaming { progress, .. } => Some(*progress),
            _ => None,
        }
    }

    /// Convenience constructor used by transports and tests.
    pub fn streaming(progress: f64, index: u32, total: u32) -> Self {
        SigningEvent::DeviceStreaming {
            progress,
            index,
            total,
        }
    }
}

impl SigningEventKind {
    /// Events that only inform and never change a run's state.
    #[must_use]
    pub fn is_informational(self) -> bool {
        matches!(
            self,
            SigningEventKind::DeviceSignatureRequested | SigningEventKind::DeviceSignatureGranted
        )
    }
}
