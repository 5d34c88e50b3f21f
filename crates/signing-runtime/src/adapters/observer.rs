//! Progress observer that logs what a run reports.

use shared_types::SigningEvent;
use signing_pipeline::{FlowEvent, ProgressObserver};
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver {
    /// Skip signature requested / granted events.
    pub hide_informational: bool,
}

impl ProgressObserver for LoggingObserver {
    fn on_progress(&self, event: &SigningEvent) {
        match event {
            SigningEvent::DeviceStreaming {
                progress,
                index,
                total,
            } => info!(
                percent = format_args!("{:.0}", progress * 100.0),
                index, total, "Streaming transaction to device"
            ),
            SigningEvent::DeviceSignatureRequested => info!("Review the transaction on the device"),
            SigningEvent::DeviceSignatureGranted => info!("Transaction approved on device"),
            SigningEvent::Signed { .. } => {}
        }
    }

    fn on_outcome(&self, event: &FlowEvent) {
        match event {
            FlowEvent::Signed {
                signed_operation,
                broadcast_pending,
            } => info!(
                operation = %signed_operation.operation.id,
                broadcast_pending,
                "Signed"
            ),
            FlowEvent::Broadcasted { operation } => {
                info!(hash = %operation.hash, "Broadcasted");
            }
            FlowEvent::Failed(error) => info!(error = %error, "Failed"),
            FlowEvent::Progress(_) => {}
        }
    }

    fn accepts(&self, _event: &SigningEvent) -> bool {
        !self.hide_informational
    }
}
