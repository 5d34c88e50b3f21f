//! # Signing Runtime Library
//!
//! Wires the signing pipeline to its adapters. The `signing-runtime`
//! binary is a thin CLI over [`SigningRuntime`].
//!
//! ## Modular Structure
//!
//! - `container/` - Runtime configuration
//! - `adapters/` - Port implementations (device transport, bridge, telemetry, observer)
//! - `registry` - Bridge lookup by currency family

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod container;
pub mod registry;

pub use registry::{BridgeError, BridgeRegistry};

use crate::adapters::AnalyticsSink;
use crate::container::RuntimeConfig;
use shared_types::{Account, AccountContext, AccountLike, DeviceHandle, UnsignedTransaction};
use signing_pipeline::{
    ProgressObserver, RunHandle, RunOutcome, SigningFlowApi, SigningPipeline, StartArgs,
    StartError, TransitionHooks,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Start(#[from] StartError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// One send request from a caller.
#[derive(Clone)]
pub struct SendRequest {
    pub device: Option<DeviceHandle>,
    pub account: AccountLike,
    pub parent_account: Option<Account>,
    pub transaction: UnsignedTransaction,
    pub observer: Option<Arc<dyn ProgressObserver>>,
}

/// Configured pipeline plus the bridges and telemetry it runs with.
pub struct SigningRuntime {
    config: RuntimeConfig,
    pipeline: SigningPipeline,
    registry: BridgeRegistry,
    analytics: Arc<AnalyticsSink>,
}

impl SigningRuntime {
    #[must_use]
    pub fn new(config: RuntimeConfig, registry: BridgeRegistry, analytics: Arc<AnalyticsSink>) -> Self {
        let hooks = TransitionHooks::new().with_sink(analytics.clone());
        let pipeline = SigningPipeline::with_hooks(config.pipeline_config(), hooks);
        Self {
            config,
            pipeline,
            registry,
            analytics,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &BridgeRegistry {
        &self.registry
    }

    /// Resolve the account and its bridge, then start a run.
    ///
    /// # Errors
    ///
    /// `RuntimeError::Start` if the account does not resolve;
    /// `RuntimeError::Bridge` if its currency family has no bridge.
    pub fn send(&self, request: SendRequest) -> Result<RunHandle, RuntimeError> {
        let context = AccountContext::resolve(request.account, request.parent_account)
            .map_err(StartError::from)?;
        let family = context.family();
        let bridge = self.registry.get_account_bridge(&context)?;

        let mut builder = StartArgs::builder()
            .maybe_device(request.device)
            .resolved_account(context)
            .transaction(request.transaction)
            .bridge(bridge)
            .broadcast_disabled(self.config.broadcast_disabled);
        if let Some(observer) = request.observer {
            builder = builder.observer(observer);
        }

        let handle = self.pipeline.start(builder.build()?);
        info!(run_id = %handle.run_id(), family = %family, "Send flow started");
        Ok(handle)
    }

    /// Drain a run and count it if it was cancelled.
    pub async fn complete(&self, handle: RunHandle) -> RunOutcome {
        let run_id = handle.run_id();
        let outcome = handle.outcome().await;
        if outcome == RunOutcome::Cancelled {
            self.analytics.record_cancelled(run_id);
        }
        outcome
    }
}
