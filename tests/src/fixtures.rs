//! # Test Fixtures
//!
//! Accounts, device scripts and recording fakes shared by the integration
//! flows.

use chrono::{DateTime, TimeZone, Utc};
use device_bus::InMemoryDeviceBus;
use parking_lot::Mutex;
use shared_types::{
    Account, CryptoCurrency, CurrencyFamily, DeviceHandle, DeviceModelId, Operation,
    OperationType, SignedOperation, SigningEvent, TokenAccount, TokenCurrency,
    UnsignedTransaction,
};
use signing_pipeline::{
    FlowEvent, HookError, ProgressObserver, RunHandle, SigningFlowApi, SigningPipeline,
    StartArgs, TelemetryPayload, TelemetrySink, TransitionPoint,
};
use signing_runtime::adapters::{DeviceScript, NetworkBehavior, SimulatedBridge, SimulatedTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const DEVICE_PATH: &str = "hid://test-device";

// =============================================================================
// ENTITIES
// =============================================================================

pub fn fixed_date() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default()
}

pub fn ethereum() -> CryptoCurrency {
    CryptoCurrency {
        id: "ethereum".into(),
        name: "Ethereum".into(),
        ticker: "ETH".into(),
        family: CurrencyFamily::Ethereum,
    }
}

pub fn account() -> Account {
    Account {
        id: "eth-main".into(),
        currency: ethereum(),
        derivation_mode: "legacy".into(),
        fresh_address: "0xfresh".into(),
        fresh_address_path: "44'/60'/0'/0/0".into(),
        balance: 5_000_000,
        operations: vec![operation("history-1", "0xabc")],
    }
}

pub fn token_account() -> TokenAccount {
    TokenAccount {
        id: "eth-main+usdc".into(),
        parent_id: "eth-main".into(),
        token: TokenCurrency {
            id: "ethereum/erc20/usdc".into(),
            name: "USD Coin".into(),
            ticker: "USDC".into(),
            contract_address: "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".into(),
            parent_currency: ethereum(),
        },
        balance: 42,
        operations: Vec::new(),
    }
}

pub fn device() -> DeviceHandle {
    DeviceHandle::new(DEVICE_PATH, DeviceModelId::NanoX)
}

pub fn transaction() -> UnsignedTransaction {
    UnsignedTransaction::new("0xdest", 1_000).with_fee(21)
}

pub fn operation(id: &str, hash: &str) -> Operation {
    Operation {
        id: id.into(),
        hash: hash.into(),
        account_id: "eth-main".into(),
        operation_type: OperationType::Out,
        value: 1_000,
        fee: 21,
        senders: vec!["0xfresh".into()],
        recipients: vec!["0xdest".into()],
        block_height: None,
        date: fixed_date(),
    }
}

pub fn signed_operation() -> SignedOperation {
    SignedOperation {
        operation: operation("op-1", ""),
        signature: "f86c".into(),
        expiration_date: None,
    }
}

// =============================================================================
// DEVICE + NETWORK
// =============================================================================

/// A simulated device on its own bus plus the bridge over it.
pub struct Harness {
    pub bus: Arc<InMemoryDeviceBus>,
    pub bridge: Arc<SimulatedBridge>,
}

impl Harness {
    pub fn new(script: DeviceScript, network: NetworkBehavior) -> Self {
        let bus = Arc::new(InMemoryDeviceBus::new());
        let transport = SimulatedTransport::new(bus.clone(), script);
        let bridge = Arc::new(SimulatedBridge::new(transport, network));
        Self { bus, bridge }
    }

    /// Network that accepts after `latency`.
    pub fn accepting(script: DeviceScript, latency: Duration) -> Self {
        Self::new(
            script,
            NetworkBehavior {
                latency,
                failure: None,
            },
        )
    }

    pub fn args(&self) -> StartArgsFixture {
        StartArgsFixture {
            bridge: self.bridge.clone(),
            device: Some(device()),
            broadcast_disabled: false,
            observer: None,
        }
    }
}

/// Start arguments with sensible defaults, tweaked per test.
pub struct StartArgsFixture {
    bridge: Arc<SimulatedBridge>,
    device: Option<DeviceHandle>,
    broadcast_disabled: bool,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl StartArgsFixture {
    pub fn without_device(mut self) -> Self {
        self.device = None;
        self
    }

    pub fn broadcast_disabled(mut self) -> Self {
        self.broadcast_disabled = true;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn start(self, pipeline: &SigningPipeline) -> RunHandle {
        let mut builder = StartArgs::builder()
            .maybe_device(self.device)
            .account(account())
            .transaction(transaction())
            .bridge(self.bridge)
            .broadcast_disabled(self.broadcast_disabled);
        if let Some(observer) = self.observer {
            builder = builder.observer(observer);
        }
        pipeline.start(builder.build().unwrap())
    }
}

/// Streaming 0 → 0.5 → 1 then a signature, one `step` apart.
pub fn three_step_approval(step: Duration) -> DeviceScript {
    DeviceScript::new()
        .event(step, SigningEvent::streaming(0.0, 0, 2))
        .event(step, SigningEvent::streaming(0.5, 1, 2))
        .event(step, SigningEvent::streaming(1.0, 2, 2))
        .event(
            step,
            SigningEvent::Signed {
                signed_operation: signed_operation(),
            },
        )
}

// =============================================================================
// RECORDING FAKES
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    Progress(SigningEvent),
    Outcome(FlowEvent),
}

/// Observer that keeps everything it is told, with the virtual time.
#[derive(Default)]
pub struct RecordingObserver {
    seen: Mutex<Vec<(Instant, Observed)>>,
    reject_informational: bool,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rejecting_informational() -> Arc<Self> {
        Arc::new(Self {
            reject_informational: true,
            ..Self::default()
        })
    }

    pub fn observed(&self) -> Vec<Observed> {
        self.seen.lock().iter().map(|(_, seen)| seen.clone()).collect()
    }

    /// Time at which the first matching item was observed.
    pub fn first_at(&self, matches: impl Fn(&Observed) -> bool) -> Option<Instant> {
        self.seen
            .lock()
            .iter()
            .find(|(_, seen)| matches(seen))
            .map(|(at, _)| *at)
    }

    pub fn progress_values(&self) -> Vec<f64> {
        self.observed()
            .iter()
            .filter_map(|seen| match seen {
                Observed::Progress(event) => event.progress(),
                Observed::Outcome(_) => None,
            })
            .collect()
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_progress(&self, event: &SigningEvent) {
        self.seen
            .lock()
            .push((Instant::now(), Observed::Progress(event.clone())));
    }

    fn on_outcome(&self, event: &FlowEvent) {
        self.seen
            .lock()
            .push((Instant::now(), Observed::Outcome(event.clone())));
    }

    fn accepts(&self, _event: &SigningEvent) -> bool {
        !self.reject_informational
    }
}

/// Telemetry sink that records every call.
#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<Vec<(TransitionPoint, TelemetryPayload)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn points(&self) -> Vec<TransitionPoint> {
        self.records.lock().iter().map(|(point, _)| *point).collect()
    }

    pub fn event_names(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|(_, payload)| payload.event_name.clone())
            .collect()
    }

    pub fn payloads(&self) -> Vec<TelemetryPayload> {
        self.records
            .lock()
            .iter()
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

impl TelemetrySink for RecordingSink {
    fn record(&self, point: TransitionPoint, payload: &TelemetryPayload) -> Result<(), HookError> {
        self.records.lock().push((point, payload.clone()));
        Ok(())
    }
}

/// Sink that panics on every call.
pub struct PanickingSink;

impl TelemetrySink for PanickingSink {
    fn record(&self, point: TransitionPoint, _payload: &TelemetryPayload) -> Result<(), HookError> {
        panic!("analytics backend exploded at {point:?}");
    }
}
