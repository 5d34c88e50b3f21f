//! # Inbound Ports (Driving Ports / API)
//!
//! How a caller starts a signing run.

use crate::domain::errors::StartError;
use crate::handle::RunHandle;
use crate::ports::outbound::{AccountBridge, ProgressObserver};
use shared_types::{Account, AccountContext, AccountLike, DeviceHandle, UnsignedTransaction};
use std::fmt;
use std::sync::Arc;

/// Primary API of the signing pipeline.
pub trait SigningFlowApi: Send + Sync {
    /// Start a run and return its handle immediately.
    ///
    /// Must be called from within a Tokio runtime. A run started without a
    /// device fails with `DisconnectedDevice` before this returns and never
    /// opens a device stream.
    fn start(&self, args: StartArgs) -> RunHandle;
}

/// Inputs of one signing run.
#[derive(Clone)]
pub struct StartArgs {
    /// Overrides the configured telemetry context label.
    pub context: Option<String>,
    /// `None` when no device is connected.
    pub device: Option<DeviceHandle>,
    pub account: AccountContext,
    pub transaction: UnsignedTransaction,
    pub bridge: Arc<dyn AccountBridge>,
    /// Stop after `Signed`; no broadcast is attempted.
    pub broadcast_disabled: bool,
    pub observer: Option<Arc<dyn ProgressObserver>>,
}

impl StartArgs {
    #[must_use]
    pub fn builder() -> StartArgsBuilder {
        StartArgsBuilder::default()
    }
}

impl fmt::Debug for StartArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartArgs")
            .field("context", &self.context)
            .field("device", &self.device)
            .field("account", &self.account.account.id())
            .field("broadcast_disabled", &self.broadcast_disabled)
            .field("has_observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

/// Collects [`StartArgs`], resolving the main account on `build()`.
#[derive(Default)]
pub struct StartArgsBuilder {
    context: Option<String>,
    device: Option<DeviceHandle>,
    account: Option<AccountLike>,
    parent_account: Option<Account>,
    resolved_account: Option<AccountContext>,
    transaction: Option<UnsignedTransaction>,
    bridge: Option<Arc<dyn AccountBridge>>,
    broadcast_disabled: bool,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl StartArgsBuilder {
    #[must_use]
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    #[must_use]
    pub fn device(mut self, device: DeviceHandle) -> Self {
        self.device = Some(device);
        self
    }

    /// Set or clear the device; `None` models a disconnected device.
    #[must_use]
    pub fn maybe_device(mut self, device: Option<DeviceHandle>) -> Self {
        self.device = device;
        self
    }

    #[must_use]
    pub fn account(mut self, account: impl Into<AccountLike>) -> Self {
        self.account = Some(account.into());
        self
    }

    #[must_use]
    pub fn parent_account(mut self, parent: Account) -> Self {
        self.parent_account = Some(parent);
        self
    }

    /// An account already resolved against its parent. Takes precedence
    /// over [`account`](Self::account) and [`parent_account`](Self::parent_account).
    #[must_use]
    pub fn resolved_account(mut self, account: AccountContext) -> Self {
        self.resolved_account = Some(account);
        self
    }

    #[must_use]
    pub fn transaction(mut self, transaction: UnsignedTransaction) -> Self {
        self.transaction = Some(transaction);
        self
    }

    #[must_use]
    pub fn bridge(mut self, bridge: Arc<dyn AccountBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    #[must_use]
    pub fn broadcast_disabled(mut self, disabled: bool) -> Self {
        self.broadcast_disabled = disabled;
        self
    }

    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// # Errors
    ///
    /// `StartError::MissingArgument` when the account, transaction or bridge
    /// is missing; `StartError::Account` when the account does not resolve.
    /// A resolved account is used as given.
    pub fn build(self) -> Result<StartArgs, StartError> {
        if self.resolved_account.is_none() && self.account.is_none() {
            return Err(StartError::MissingArgument("account"));
        }
        let transaction = self
            .transaction
            .ok_or(StartError::MissingArgument("transaction"))?;
        let bridge = self.bridge.ok_or(StartError::MissingArgument("bridge"))?;
        let account = match (self.resolved_account, self.account) {
            (Some(resolved), _) => resolved,
            (None, Some(account)) => AccountContext::resolve(account, self.parent_account)?,
            (None, None) => return Err(StartError::MissingArgument("account")),
        };

        Ok(StartArgs {
            context: self.context,
            device: self.device,
            account,
            transaction,
            bridge,
            broadcast_disabled: self.broadcast_disabled,
            observer: self.observer,
        })
    }
}
