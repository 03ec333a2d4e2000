//! Platform signing key.
//!
//! # Security
//! - The private key arrives through configuration sourced from the environment
//! - Keys are never logged or serialized

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Single in-process signer shared by every write path.
#[derive(Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
    chain_id: Option<u64>,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    pub fn from_private_key(private_key_hex: &str) -> BlockchainResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?;

        Ok(Self {
            signer,
            chain_id: None,
        })
    }

    /// Bind the signer to the chain the RPC reports (EIP-155).
    pub fn bind_chain(mut self, chain_id: u64) -> Self {
        self.signer = self.signer.with_chain_id(Some(chain_id));
        self.chain_id = Some(chain_id);
        tracing::info!(
            address = %self.signer.address(),
            chain_id = chain_id,
            "Signer bound to chain"
        );
        self
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Chain the signer is bound to, if any.
    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    /// Network wallet for the provider's signing filler.
    pub fn network_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.signer.address())
            .field("chain_id", &self.chain_id)
            .finish()
    }
}
