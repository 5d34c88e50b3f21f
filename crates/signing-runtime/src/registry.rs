//! # Bridge Registry
//!
//! Maps a currency family to the bridge that signs and broadcasts for it.

use shared_types::{AccountContext, CurrencyFamily};
use signing_pipeline::AccountBridge;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// No bridge registered for the account's currency family.
    #[error("No bridge registered for currency family {0}")]
    UnsupportedFamily(CurrencyFamily),
}

/// Bridges by currency family.
#[derive(Default, Clone)]
pub struct BridgeRegistry {
    bridges: HashMap<CurrencyFamily, Arc<dyn AccountBridge>>,
}

impl BridgeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bridge` for `family`, replacing any previous one.
    pub fn register(&mut self, family: CurrencyFamily, bridge: Arc<dyn AccountBridge>) {
        debug!(family = %family, "Bridge registered");
        self.bridges.insert(family, bridge);
    }

    #[must_use]
    pub fn with_bridge(mut self, family: CurrencyFamily, bridge: Arc<dyn AccountBridge>) -> Self {
        self.register(family, bridge);
        self
    }

    /// Bridge for the main account's currency family.
    ///
    /// # Errors
    ///
    /// `BridgeError::UnsupportedFamily` when nothing is registered for it.
    pub fn get_account_bridge(
        &self,
        account: &AccountContext,
    ) -> Result<Arc<dyn AccountBridge>, BridgeError> {
        let family = account.family();
        self.bridges
            .get(&family)
            .cloned()
            .ok_or(BridgeError::UnsupportedFamily(family))
    }

    #[must_use]
    pub fn families(&self) -> Vec<CurrencyFamily> {
        let mut families: Vec<_> = self.bridges.keys().copied().collect();
        families.sort_by_key(ToString::to_string);
        families
    }
}

impl std::fmt::Debug for BridgeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeRegistry")
            .field("families", &self.families())
            .finish()
    }
}
