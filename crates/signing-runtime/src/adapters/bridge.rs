//! # Simulated Account Bridge
//!
//! A bridge whose device side is a [`SimulatedTransport`] and whose network
//! side answers broadcasts after a fixed latency.

use crate::adapters::device::SimulatedTransport;
use async_trait::async_trait;
use chrono::Utc;
use shared_types::{
    AccountContext, BroadcastFailure, DeviceHandle, Operation, SignedOperation,
    UnsignedTransaction,
};
use signing_pipeline::{Broadcaster, DeviceEventSource, SigningEventStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};
use uuid::Uuid;

/// How the simulated network answers a broadcast.
#[derive(Debug, Clone)]
pub struct NetworkBehavior {
    pub latency: Duration,
    /// `None` accepts the transaction.
    pub failure: Option<BroadcastFailure>,
}

impl Default for NetworkBehavior {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(400),
            failure: None,
        }
    }
}

pub struct SimulatedBridge {
    transport: SimulatedTransport,
    network: NetworkBehavior,
    broadcasts: AtomicU64,
}

impl SimulatedBridge {
    #[must_use]
    pub fn new(transport: SimulatedTransport, network: NetworkBehavior) -> Self {
        Self {
            transport,
            network,
            broadcasts: AtomicU64::new(0),
        }
    }

    /// Number of broadcast calls received.
    #[must_use]
    pub fn broadcasts(&self) -> u64 {
        self.broadcasts.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn transport(&self) -> &SimulatedTransport {
        &self.transport
    }
}

impl DeviceEventSource for SimulatedBridge {
    fn open_device_stream(
        &self,
        device: &DeviceHandle,
        account: &AccountContext,
        transaction: &UnsignedTransaction,
    ) -> SigningEventStream {
        debug!(
            device = %device,
            account = %account.account.id(),
            recipient = %transaction.recipient,
            amount = %transaction.amount,
            "Opening device signing exchange"
        );
        self.transport.open(device)
    }
}

#[async_trait]
impl Broadcaster for SimulatedBridge {
    async fn broadcast(
        &self,
        account: &AccountContext,
        signed_operation: &SignedOperation,
    ) -> Result<Operation, BroadcastFailure> {
        self.broadcasts.fetch_add(1, Ordering::SeqCst);
        sleep(self.network.latency).await;

        if let Some(failure) = &self.network.failure {
            return Err(failure.clone());
        }

        let mut operation = signed_operation.operation.clone();
        operation.hash = format!("0x{}", Uuid::new_v4().simple());
        operation.date = Utc::now();

        info!(
            currency = %account.currency().id,
            hash = %operation.hash,
            "Simulated network accepted transaction"
        );
        Ok(operation)
    }
}
