//! # Device Signing Runtime
//!
//! Runs one send flow against a simulated hardware wallet and prints how it
//! ended.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Install logging and register metrics
//! 3. Register the bridge for the demo account's currency family
//! 4. Start the run and wait for its outcome (Ctrl+C cancels it)

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::{Parser, ValueEnum};
use device_bus::InMemoryDeviceBus;
use shared_types::{
    Account, BroadcastFailure, CryptoCurrency, CurrencyFamily, DeviceHandle, DeviceModelId,
    Operation, OperationType, SignedOperation, UnsignedTransaction,
};
use signing_pipeline::{FlowStep, RunOutcome};
use signing_runtime::adapters::{
    AnalyticsSink, DeviceScript, LoggingObserver, NetworkBehavior, SimulatedBridge,
    SimulatedTransport,
};
use signing_runtime::container::RuntimeConfig;
use signing_runtime::{BridgeRegistry, SendRequest, SigningRuntime};
use signing_telemetry::{encode_metrics, init_telemetry};
use tracing::{debug, info, warn};

const DEVICE_PATH: &str = "hid://0001:0002";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// The user approves on the device.
    Approve,
    /// The user rejects on the device.
    Refuse,
    /// The device is unplugged while the transaction streams.
    Unplug,
    /// No device is connected.
    NoDevice,
    /// The device signs but the network rejects the transaction.
    BroadcastFail,
}

#[derive(Debug, Parser)]
#[command(name = "signing-runtime", version, about = "Run one simulated device signing flow")]
struct Args {
    /// What the simulated device and network do.
    #[arg(long, value_enum, default_value_t = Scenario::Approve)]
    scenario: Scenario,

    /// Stop after signing, even if broadcasting is enabled in the environment.
    #[arg(long)]
    no_broadcast: bool,

    /// Amount to send, in the smallest unit.
    #[arg(long, default_value_t = 150_000)]
    amount: u128,

    #[arg(long, default_value = "0x7a250d5630b4cf539739df2c5dacb4c659f2488d")]
    recipient: String,

    /// Delay between scripted device answers.
    #[arg(long, default_value_t = 250)]
    step_ms: u64,

    /// Cancel the run after this many milliseconds.
    #[arg(long)]
    cancel_after_ms: Option<u64>,

    /// Do not log signature requested / granted events.
    #[arg(long)]
    hide_informational: bool,
}

fn demo_account() -> Account {
    Account {
        id: "js:2:ethereum:0xfresh:".into(),
        currency: CryptoCurrency {
            id: "ethereum".into(),
            name: "Ethereum".into(),
            ticker: "ETH".into(),
            family: CurrencyFamily::Ethereum,
        },
        derivation_mode: String::new(),
        fresh_address: "0x71c7656ec7ab88b098defb751b7401b5f6d8976f".into(),
        fresh_address_path: "44'/60'/0'/0/0".into(),
        balance: 2_000_000,
        operations: Vec::new(),
    }
}

fn demo_signed_operation(account: &Account, transaction: &UnsignedTransaction) -> SignedOperation {
    SignedOperation {
        operation: Operation {
            id: format!("{}-pending", account.id),
            hash: String::new(),
            account_id: account.id.clone(),
            operation_type: OperationType::Out,
            value: transaction.amount,
            fee: transaction.fee.unwrap_or_default(),
            senders: vec![account.fresh_address.clone()],
            recipients: vec![transaction.recipient.clone()],
            block_height: None,
            date: Utc::now(),
        },
        signature: "f86c0a8502540be400825208".into(),
        expiration_date: Utc.timestamp_opt(Utc::now().timestamp() + 600, 0).single(),
    }
}

fn device_script(scenario: Scenario, signed: SignedOperation, step: Duration) -> DeviceScript {
    match scenario {
        Scenario::Approve | Scenario::BroadcastFail | Scenario::NoDevice => {
            DeviceScript::approve(signed, step)
        }
        Scenario::Refuse => DeviceScript::refuse(step),
        Scenario::Unplug => DeviceScript::unplug(DEVICE_PATH, step),
    }
}

fn network_behavior(scenario: Scenario) -> NetworkBehavior {
    let failure = (scenario == Scenario::BroadcastFail).then(|| BroadcastFailure::Rejected {
        reason: "nonce too low".into(),
    });
    NetworkBehavior {
        failure,
        ..NetworkBehavior::default()
    }
}

fn report(outcome: &RunOutcome) -> Result<()> {
    match outcome {
        RunOutcome::SignedOnly(signed) => {
            info!(operation = %signed.operation.id, "Signed, broadcast disabled");
            println!(
                "{}",
                serde_json::to_string_pretty(signed).context("Failed to encode signed operation")?
            );
        }
        RunOutcome::Broadcasted { operation, .. } => {
            info!(hash = %operation.hash, "Transaction broadcasted");
            println!(
                "{}",
                serde_json::to_string_pretty(operation).context("Failed to encode operation")?
            );
        }
        RunOutcome::Failed(error) => warn!(error = %error, kind = error.label(), "Send failed"),
        RunOutcome::Cancelled => info!("Send cancelled"),
    }

    match outcome.next_step() {
        Some(FlowStep::Confirmation) => println!("next: confirmation ({})", outcome.label()),
        Some(FlowStep::Refused) => println!("next: refused on device"),
        None => println!("next: none ({})", outcome.label()),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = RuntimeConfig::from_env().context("Invalid runtime configuration")?;
    if args.no_broadcast {
        config.broadcast_disabled = true;
    }
    let telemetry = init_telemetry(config.telemetry.clone()).context("Failed to initialize telemetry")?;

    let analytics = Arc::new(match telemetry.metrics() {
        Some(handle) => AnalyticsSink::with_metrics(handle.metrics()),
        None => AnalyticsSink::new(),
    });

    let account = demo_account();
    let transaction = UnsignedTransaction::new(args.recipient.clone(), args.amount).with_fee(21_000);
    let signed = demo_signed_operation(&account, &transaction);
    let step = Duration::from_millis(args.step_ms);

    let transport = SimulatedTransport::new(
        Arc::new(InMemoryDeviceBus::new()),
        device_script(args.scenario, signed, step),
    );
    let bridge = Arc::new(SimulatedBridge::new(transport, network_behavior(args.scenario)));
    let registry = BridgeRegistry::new().with_bridge(CurrencyFamily::Ethereum, bridge);
    let runtime = SigningRuntime::new(config, registry, analytics);

    info!(
        scenario = ?args.scenario,
        broadcast_disabled = runtime.config().broadcast_disabled,
        families = ?runtime.registry().families(),
        "Starting send flow"
    );

    let device = (args.scenario != Scenario::NoDevice)
        .then(|| DeviceHandle::new(DEVICE_PATH, DeviceModelId::NanoX));
    let handle = runtime
        .send(SendRequest {
            device,
            account: account.into(),
            parent_account: None,
            transaction,
            observer: Some(Arc::new(LoggingObserver {
                hide_informational: args.hide_informational,
            })),
        })
        .context("Failed to start send flow")?;

    let interrupt = handle.controller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() && interrupt.cancel() {
            info!("Interrupted, cancelling run");
        }
    });
    if let Some(ms) = args.cancel_after_ms {
        let timer = handle.controller();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            if timer.cancel() {
                info!(after_ms = ms, "Cancel timer fired");
            }
        });
    }

    let outcome = runtime.complete(handle).await;
    report(&outcome)?;

    if telemetry.metrics().is_some() {
        let text = encode_metrics().context("Failed to encode metrics")?;
        debug!(metrics = %text, "Final metrics");
    }
    Ok(())
}
