//! # Signing Pipeline
//!
//! Orchestrates a hardware-wallet signing run: subscribes to the device
//! event stream, forwards progress, captures the signed operation and,
//! unless broadcasting is disabled, submits it to the network.
//!
//! ## Run Lifecycle
//!
//! ```text
//! [Idle] ──start──→ [Streaming] ──signed──→ [Signed] ──broadcast ok──→ [Broadcasted]
//!   │                   │                      │
//!   │ no device         │ device failure       └── broadcast err ──→ [BroadcastFailed]
//!   └──────────────→ [SignError] ←─────────────┘
//!
//! any non-terminal state ──cancel──→ [Cancelled]
//! ```
//!
//! With broadcasting disabled, `Signed` is terminal.
//!
//! ## Guarantees
//!
//! | Guarantee | Enforcement Location |
//! |-----------|---------------------|
//! | Exactly one terminal outcome per run | `handle.rs` - `RunController::mark_terminated()` |
//! | Boundary progress (0 and 1) never forwarded | `domain/filter.rs` - `dispatch()` |
//! | Broadcast success not visible before the minimum duration | `domain/timing.rs` - `exec_and_wait_at_least()` |
//! | Device stream released exactly once | `service.rs` - stream owned by the run task |
//! | Telemetry failures never alter a run | `hooks.rs` - `TransitionHooks::fire()` |
//! | Cancel after termination is a no-op | `handle.rs` - `RunController::cancel()` |
//!
//! ## Outbound Dependencies
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | `DeviceEventSource` | Opens the device signing event stream |
//! | `Broadcaster` | Submits a signed operation to the network |
//! | `ProgressObserver` | Receives progress and terminal events |
//! | `TelemetrySink` | Records named transition points |
//!
//! ## Usage
//!
//! ```ignore
//! let pipeline = SigningPipeline::new(PipelineConfig::default());
//! let args = StartArgs::builder()
//!     .device(device)
//!     .account(account)
//!     .transaction(transaction)
//!     .bridge(bridge)
//!     .build()?;
//! let outcome = pipeline.start(args).outcome().await;
//! ```

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod domain;
pub mod handle;
pub mod hooks;
pub mod ports;
pub mod service;

pub use config::{ConfigError, PipelineConfig, DEFAULT_CONTEXT, DEFAULT_MIN_BROADCAST_DURATION};
pub use domain::errors::{classify, InvalidTransition, SignErrorKind, SigningError, StartError};
pub use domain::filter::{dispatch, is_boundary_progress, Dispatch};
pub use domain::outcome::{FlowEvent, FlowStep, RunOutcome};
pub use domain::state::{RunState, RunStateMachine};
pub use domain::timing::exec_and_wait_at_least;
pub use handle::{RunController, RunHandle};
pub use hooks::TransitionHooks;
pub use ports::inbound::{SigningFlowApi, StartArgs, StartArgsBuilder};
pub use ports::outbound::{
    AccountBridge, Broadcaster, DeviceEventSource, HookError, ProgressObserver,
    SigningEventStream, TelemetryPayload, TelemetrySink, TransitionPoint,
};
pub use service::SigningPipeline;
