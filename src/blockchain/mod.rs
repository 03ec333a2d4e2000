//! Ledger integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment (private key, RPC URL, registry address)
//!     → wallet.rs (key loading, chain binding)
//!     → client.rs (RPC connection, registry resolution, write critical section)
//!     → transaction.rs (receipt waiting, event decoding)
//!     → ledger.rs (the traits the rest of the core depends on)
//! ```
//!
//! # Security Constraints
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts
//! - Startup fails if the contract suite cannot be resolved

pub mod client;
pub mod contracts;
pub mod ledger;
pub mod nonce;
pub mod transaction;
pub mod types;
pub mod units;
pub mod wallet;

pub use client::LedgerClient;
pub use ledger::{EventFeed, EventStream, Ledger};
pub use types::{
    canonical_hex, parse_address, tx_hash_hex, BlockchainError, BlockchainResult, ChainId, ContractSet,
    CreatePropertyCall, MinedReceipt, PropertyRegisteredEvent, RevenueDepositedEvent,
    SubmittedTx, WalletAddress,
};
pub use wallet::Wallet;
