//! Chain-facing types and error definitions.

use alloy::primitives::{Address, Log, TxHash, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// Re-export LedgerConfig from config module to avoid duplication
pub use crate::config::schema::LedgerConfig;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// The RPC rejected a transaction before inclusion.
    #[error("Transaction submission failed: {0}")]
    Submit(String),

    /// Transaction was mined with a failure status.
    #[error("Transaction reverted: {0}")]
    Reverted(TxHash),

    /// Mining wait ended before a receipt was observed.
    #[error("Transaction {0} not mined before deadline")]
    MiningTimeout(TxHash),

    /// Invalid private key format or derivation error.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Nonce management error.
    #[error("Nonce error: {0}")]
    Nonce(String),

    /// Platform registry could not be resolved at startup.
    #[error("Registry resolution failed: {0}")]
    Registry(String),

    /// A log did not match the expected event ABI.
    #[error("Event decode failed: {0}")]
    Decode(String),

    /// Log subscription failed or was dropped by the RPC.
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// Ledger client or a contract handle is not initialized.
    #[error("Ledger not available: {0}")]
    NotAvailable(String),
}

impl BlockchainError {
    /// Whether retrying the same operation later can reasonably succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BlockchainError::Rpc(_)
                | BlockchainError::Timeout(_)
                | BlockchainError::Subscription(_)
                | BlockchainError::Decode(_)
        )
    }
}

/// Result type for ledger operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Error returned when a wallet string is not a 20-byte hex address.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid wallet address '{0}'")]
pub struct InvalidAddress(pub String);

/// A 20-byte account identity.
///
/// Parsing accepts any hex casing with or without the `0x` prefix. Equality is
/// byte equality, so comparisons are case-insensitive, and the rendered form is
/// always lowercase `0x`-prefixed (42 characters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WalletAddress(Address);

impl WalletAddress {
    /// Wrap an already-decoded address.
    pub fn new(address: Address) -> Self {
        Self(address)
    }

    /// The raw address.
    pub fn address(&self) -> Address {
        self.0
    }

    /// Canonical storage form.
    pub fn canonical(&self) -> String {
        canonical_hex(&self.0)
    }

    /// True for `0x000…0`.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl FromStr for WalletAddress {
    type Err = InvalidAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex_part = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if hex_part.len() != 40 {
            return Err(InvalidAddress(s.to_string()));
        }
        // Lowercase first so mixed-case input is never rejected as a bad checksum.
        let bytes = hex::decode(hex_part.to_ascii_lowercase())
            .map_err(|_| InvalidAddress(s.to_string()))?;
        Ok(Self(Address::from_slice(&bytes)))
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl From<Address> for WalletAddress {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl From<WalletAddress> for Address {
    fn from(wallet: WalletAddress) -> Self {
        wallet.0
    }
}

impl Serialize for WalletAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canonical())
    }
}

impl<'de> Deserialize<'de> for WalletAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Lowercase `0x`-prefixed rendering used for every stored address.
pub fn canonical_hex(address: &Address) -> String {
    alloy::hex::encode_prefixed(address.as_slice())
}

/// Parse any-case hex into an address, as used for contract fields.
pub fn parse_address(raw: &str) -> Result<Address, InvalidAddress> {
    raw.parse::<WalletAddress>().map(|w| w.address())
}

/// Handle for a transaction accepted by the RPC but not yet mined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmittedTx {
    pub hash: TxHash,
}

impl SubmittedTx {
    pub fn hash_hex(&self) -> String {
        tx_hash_hex(&self.hash)
    }
}

pub fn tx_hash_hex(hash: &TxHash) -> String {
    alloy::hex::encode_prefixed(hash.as_slice())
}

/// Outcome of a mined transaction.
#[derive(Debug, Clone)]
pub struct MinedReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    /// Receipt status flag; `false` means effects were reverted.
    pub success: bool,
    pub logs: Vec<Log>,
}

/// Arguments for the factory's create-property call, in whole units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePropertyCall {
    pub owner: Address,
    pub name: String,
    pub symbol: String,
    pub metadata_cid: String,
    pub valuation: U256,
    /// Token supply already converted to 18-decimal base units.
    pub supply_base_units: U256,
    pub token_name: String,
    pub token_symbol: String,
}

/// Decoded `PropertyRegistered` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRegisteredEvent {
    pub asset: Address,
    pub token: Address,
    pub owner: Address,
    pub metadata_cid: String,
    pub valuation: U256,
    pub tx_hash: Option<TxHash>,
    pub block_number: Option<u64>,
}

/// Decoded `RevenueDeposited` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevenueDepositedEvent {
    pub distribution_id: U256,
    pub token: Address,
    pub amount: U256,
    pub snapshot_id: U256,
    pub stablecoin: Address,
    pub tx_hash: Option<TxHash>,
    pub block_number: Option<u64>,
}

/// Resolved contract handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractSet {
    pub approval: Address,
    pub factory: Address,
    pub revenue: Address,
}
