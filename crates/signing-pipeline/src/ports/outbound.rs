//! # Outbound Ports (Driven Ports / SPI)
//!
//! Traits a signing run depends on. A currency family supplies one
//! [`AccountBridge`]; the caller optionally supplies a
//! [`ProgressObserver`]; the host wires any number of [`TelemetrySink`]s.

use crate::domain::outcome::FlowEvent;
use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;
use shared_types::{
    AccountContext, BroadcastFailure, DeviceFailure, DeviceHandle, Operation, SignedOperation,
    SigningEvent, UnsignedTransaction,
};
use std::pin::Pin;
use thiserror::Error;
use uuid::Uuid;

/// Device signing events, ending after `Signed`, after a failure, or when
/// the device completes. Dropping it releases the device subscription.
pub type SigningEventStream =
    Pin<Box<dyn Stream<Item = Result<SigningEvent, DeviceFailure>> + Send + 'static>>;

// =============================================================================
// BRIDGE
// =============================================================================

/// Opens the signing exchange with a device.
pub trait DeviceEventSource: Send + Sync {
    /// Start a signing exchange for `transaction` on `device`.
    ///
    /// Dropping the returned stream abandons the exchange.
    fn open_device_stream(
        &self,
        device: &DeviceHandle,
        account: &AccountContext,
        transaction: &UnsignedTransaction,
    ) -> SigningEventStream;
}

/// Submits signed operations to the network.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Broadcast a signed operation.
    ///
    /// # Errors
    /// * `BroadcastFailure::Rejected` - The network refused the transaction
    /// * `BroadcastFailure::Network` - The network could not be reached
    /// * `BroadcastFailure::Timeout` - No answer in time
    async fn broadcast(
        &self,
        account: &AccountContext,
        signed_operation: &SignedOperation,
    ) -> Result<Operation, BroadcastFailure>;
}

/// Everything a currency family provides to a signing run.
pub trait AccountBridge: DeviceEventSource + Broadcaster {}

impl<T> AccountBridge for T where T: DeviceEventSource + Broadcaster + ?Sized {}

// =============================================================================
// OBSERVER
// =============================================================================

/// Receives what a run forwards to its caller.
///
/// Callbacks run on the run task and must return quickly.
pub trait ProgressObserver: Send + Sync {
    /// A filtered progress event.
    fn on_progress(&self, event: &SigningEvent);

    /// `Signed`, `Broadcasted` or `Failed`.
    fn on_outcome(&self, _event: &FlowEvent) {}

    /// Whether to receive an informational event (signature requested /
    /// granted). Rejected events are dropped for the whole run.
    fn accepts(&self, _event: &SigningEvent) -> bool {
        true
    }
}

// =============================================================================
// TELEMETRY
// =============================================================================

/// Named points of a run that telemetry is told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransitionPoint {
    Start,
    Signed,
    Broadcasted,
    Refused,
    Error,
}

impl TransitionPoint {
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            TransitionPoint::Start => "TransactionStart",
            TransitionPoint::Signed => "TransactionSigned",
            TransitionPoint::Broadcasted => "TransactionBroadcasted",
            TransitionPoint::Refused => "TransactionRefused",
            TransitionPoint::Error => "TransactionError",
        }
    }

    /// Analytics event name, e.g. `SendTransactionStart`.
    #[must_use]
    pub fn event_name(self, context: &str) -> String {
        format!("{context}{}", self.suffix())
    }
}

/// Account facts attached to every telemetry record of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetryPayload {
    pub run_id: Uuid,
    pub event_name: String,
    pub context: String,
    pub currency_name: String,
    pub derivation_mode: String,
    pub fresh_address_path: String,
    pub operations_length: usize,
    /// The run goes on to broadcast after signing.
    pub broadcast_pending: bool,
    /// Error description for `Error` and `Refused`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TelemetryPayload {
    #[must_use]
    pub fn new(run_id: Uuid, point: TransitionPoint, context: &str, account: &AccountContext) -> Self {
        let main = &account.main_account;
        Self {
            run_id,
            event_name: point.event_name(context),
            context: context.to_string(),
            currency_name: main.currency.name.clone(),
            derivation_mode: main.derivation_mode.clone(),
            fresh_address_path: main.fresh_address_path.clone(),
            operations_length: main.operations.len(),
            broadcast_pending: false,
            error: None,
        }
    }

    #[must_use]
    pub fn with_broadcast_pending(mut self, broadcast_pending: bool) -> Self {
        self.broadcast_pending = broadcast_pending;
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

/// A telemetry hook failed. Logged and otherwise ignored.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("Telemetry sink unavailable: {0}")]
    Unavailable(String),

    #[error("Telemetry record rejected: {0}")]
    Rejected(String),
}

/// Records run transition points.
pub trait TelemetrySink: Send + Sync {
    /// # Errors
    /// Any error is logged by the pipeline and never reaches the run.
    fn record(&self, point: TransitionPoint, payload: &TelemetryPayload) -> Result<(), HookError>;
}
