//! Nonce sources for the write critical section.
//!
//! Both implementations are only called while the client's write lock is held,
//! so they never race each other within the process.

use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Which nonce strategy the ledger client uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonceMode {
    /// Ask the RPC for the pending transaction count before every write.
    #[default]
    Rpc,
    /// Count locally after one initial sync; for providers without pending-tx tracking.
    Local,
}

/// Supplies the nonce for the next write.
#[async_trait]
pub trait NonceSource: Send + Sync {
    async fn next_nonce(&self, provider: &DynProvider, from: Address) -> BlockchainResult<u64>;

    /// Called when a submission failed after a nonce was handed out.
    fn invalidate(&self);
}

/// Build the source for a configured mode.
pub fn nonce_source(mode: NonceMode) -> Box<dyn NonceSource> {
    match mode {
        NonceMode::Rpc => Box::new(RpcNonce),
        NonceMode::Local => Box::new(LocalNonce::default()),
    }
}

/// Pending count straight from the RPC.
#[derive(Debug, Default)]
pub struct RpcNonce;

#[async_trait]
impl NonceSource for RpcNonce {
    async fn next_nonce(&self, provider: &DynProvider, from: Address) -> BlockchainResult<u64> {
        provider
            .get_transaction_count(from)
            .pending()
            .await
            .map_err(|e| BlockchainError::Nonce(e.to_string()))
    }

    fn invalidate(&self) {}
}

/// In-memory counter seeded from the chain.
#[derive(Debug, Default)]
pub struct LocalNonce {
    next: AtomicU64,
    synced: AtomicBool,
}

impl LocalNonce {
    /// Hand out the current value and advance.
    fn take(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    fn seed(&self, value: u64) {
        self.next.store(value, Ordering::SeqCst);
        self.synced.store(true, Ordering::SeqCst);
    }

    /// Current value without advancing.
    pub fn current(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NonceSource for LocalNonce {
    async fn next_nonce(&self, provider: &DynProvider, from: Address) -> BlockchainResult<u64> {
        if !self.synced.load(Ordering::SeqCst) {
            let chain_nonce = provider
                .get_transaction_count(from)
                .pending()
                .await
                .map_err(|e| BlockchainError::Nonce(e.to_string()))?;
            self.seed(chain_nonce);
            tracing::debug!(nonce = chain_nonce, "Local nonce synced from chain");
        }
        Ok(self.take())
    }

    fn invalidate(&self) {
        self.synced.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_nonce_counts_after_seed() {
        let nonce = LocalNonce::default();
        nonce.seed(7);
        assert_eq!(nonce.take(), 7);
        assert_eq!(nonce.take(), 8);
        assert_eq!(nonce.current(), 9);

        nonce.invalidate();
        assert!(!nonce.synced.load(Ordering::SeqCst));
    }

    #[test]
    fn test_nonce_mode_parses_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: NonceMode,
        }
        let parsed: Wrapper = toml::from_str("mode = \"local\"").unwrap();
        assert_eq!(parsed.mode, NonceMode::Local);
        assert_eq!(NonceMode::default(), NonceMode::Rpc);
    }
}
