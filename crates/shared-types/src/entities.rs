//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Device**: `DeviceHandle`, `DeviceModelId`
//! - **Currencies**: `CryptoCurrency`, `TokenCurrency`, `CurrencyFamily`
//! - **Accounts**: `Account`, `TokenAccount`, `AccountLike`, `AccountContext`
//! - **Transactions**: `UnsignedTransaction`, `SignedOperation`, `Operation`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::AccountError;

// =============================================================================
// CLUSTER A: DEVICE
// =============================================================================

/// Hardware model reported by the transport when the device was enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceModelId {
    NanoS,
    NanoX,
    Blue,
}

/// A connected hardware signing device.
///
/// Opaque to the pipeline beyond the transport path used to open an event
/// stream. The caller owns it; a run only borrows it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceHandle {
    /// Transport path (USB HID path, BLE id, ...).
    pub path: String,
    /// Device model.
    pub model_id: DeviceModelId,
}

impl DeviceHandle {
    pub fn new(path: impl Into<String>, model_id: DeviceModelId) -> Self {
        Self {
            path: path.into(),
            model_id,
        }
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{}", self.model_id, self.path)
    }
}

// =============================================================================
// CLUSTER B: CURRENCIES
// =============================================================================

/// Bridge family a currency belongs to. Bridges are selected per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyFamily {
    Bitcoin,
    Ethereum,
    Ripple,
    Stellar,
    Tezos,
}

impl fmt::Display for CurrencyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CurrencyFamily::Bitcoin => "bitcoin",
            CurrencyFamily::Ethereum => "ethereum",
            CurrencyFamily::Ripple => "ripple",
            CurrencyFamily::Stellar => "stellar",
            CurrencyFamily::Tezos => "tezos",
        };
        f.write_str(name)
    }
}

/// A native crypto currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoCurrency {
    pub id: String,
    pub name: String,
    pub ticker: String,
    pub family: CurrencyFamily,
}

/// A token living on top of a parent currency (e.g. an ERC-20).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCurrency {
    pub id: String,
    pub name: String,
    pub ticker: String,
    pub contract_address: String,
    pub parent_currency: CryptoCurrency,
}

// =============================================================================
// CLUSTER C: ACCOUNTS
// =============================================================================

/// A top-level account holding on-chain state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub currency: CryptoCurrency,
    /// Derivation scheme label ("", "segwit", "native_segwit", ...).
    pub derivation_mode: String,
    pub fresh_address: String,
    pub fresh_address_path: String,
    pub balance: u128,
    pub operations: Vec<Operation>,
}

/// A token account nested under its holding account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenAccount {
    pub id: String,
    /// Id of the holding [`Account`].
    pub parent_id: String,
    pub token: TokenCurrency,
    pub balance: u128,
    pub operations: Vec<Operation>,
}

/// Either kind of account a caller can send from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AccountLike {
    Account(Account),
    TokenAccount(TokenAccount),
}

impl AccountLike {
    pub fn id(&self) -> &str {
        match self {
            AccountLike::Account(a) => &a.id,
            AccountLike::TokenAccount(t) => &t.id,
        }
    }

    /// The token being sent, if this is a token account.
    pub fn token(&self) -> Option<&TokenCurrency> {
        match self {
            AccountLike::Account(_) => None,
            AccountLike::TokenAccount(t) => Some(&t.token),
        }
    }
}

impl From<Account> for AccountLike {
    fn from(account: Account) -> Self {
        AccountLike::Account(account)
    }
}

impl From<TokenAccount> for AccountLike {
    fn from(account: TokenAccount) -> Self {
        AccountLike::TokenAccount(account)
    }
}

/// Resolve the account that actually holds on-chain state.
///
/// A token account resolves to its parent, which must be supplied and must
/// match the token account's `parent_id`. A top-level account resolves to
/// itself and ignores `parent`.
pub fn main_account<'a>(
    account: &'a AccountLike,
    parent: Option<&'a Account>,
) -> Result<&'a Account, AccountError> {
    match account {
        AccountLike::Account(a) => Ok(a),
        AccountLike::TokenAccount(token) => {
            let parent = parent.ok_or_else(|| AccountError::MissingParent {
                account_id: token.id.clone(),
            })?;
            if parent.id != token.parent_id {
                return Err(AccountError::ParentMismatch {
                    expected: token.parent_id.clone(),
                    actual: parent.id.clone(),
                });
            }
            Ok(parent)
        }
    }
}

/// The account context of one signing run.
///
/// Immutable for the duration of the run; `main_account` is resolved once at
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountContext {
    pub account: AccountLike,
    pub parent_account: Option<Account>,
    pub main_account: Account,
}

impl AccountContext {
    pub fn resolve(
        account: AccountLike,
        parent_account: Option<Account>,
    ) -> Result<Self, AccountError> {
        let main_account = main_account(&account, parent_account.as_ref())?.clone();
        Ok(Self {
            account,
            parent_account,
            main_account,
        })
    }

    pub fn currency(&self) -> &CryptoCurrency {
        &self.main_account.currency
    }

    pub fn family(&self) -> CurrencyFamily {
        self.main_account.currency.family
    }
}

// =============================================================================
// CLUSTER D: TRANSACTIONS & OPERATIONS
// =============================================================================

/// Transfer description supplied by the caller.
///
/// Family-specific fields travel in `extra`; only the bridge interprets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    pub recipient: String,
    pub amount: u128,
    pub fee: Option<u128>,
    #[serde(default)]
    pub use_all_amount: bool,
    #[serde(default)]
    pub extra: serde_json::Value,
}

impl UnsignedTransaction {
    pub fn new(recipient: impl Into<String>, amount: u128) -> Self {
        Self {
            recipient: recipient.into(),
            amount,
            fee: None,
            use_all_amount: false,
            extra: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub fn with_fee(mut self, fee: u128) -> Self {
        self.fee = Some(fee);
        self
    }
}

/// Kind of an [`Operation`] from the account's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    In,
    Out,
    Fees,
}

/// A transaction as recorded against an account.
///
/// Produced optimistically inside a [`SignedOperation`] and returned in its
/// final form by a successful broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    pub hash: String,
    pub account_id: String,
    pub operation_type: OperationType,
    pub value: u128,
    pub fee: u128,
    pub senders: Vec<String>,
    pub recipients: Vec<String>,
    pub block_height: Option<u64>,
    pub date: DateTime<Utc>,
}

/// A transaction signed by the device, ready for broadcast.
///
/// Created exactly once per successful signing run and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedOperation {
    /// Optimistic operation built before broadcast (hash may be empty).
    pub operation: Operation,
    /// Hex-encoded signed payload.
    pub signature: String,
    pub expiration_date: Option<DateTime<Utc>>,
}
