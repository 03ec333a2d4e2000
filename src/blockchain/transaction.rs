//! Receipt waiting and event extraction.
//!
//! # Responsibilities
//! - Poll for a receipt until mined, cancelled, or past the mining deadline
//! - Decode platform events from receipt logs and subscription logs

use alloy::primitives::{Address, Log, TxHash};
use alloy::sol_types::SolEvent;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::blockchain::contracts::{PropertyRegistered, RevenueDeposited};
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, MinedReceipt, PropertyRegisteredEvent,
    RevenueDepositedEvent,
};

/// Polling policy for mining waits.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptWaiter {
    pub poll_interval: Duration,
    pub deadline: Duration,
}

impl ReceiptWaiter {
    pub fn new(poll_interval: Duration, deadline: Duration) -> Self {
        Self {
            poll_interval,
            deadline,
        }
    }

    /// Poll `fetch` until it yields a receipt.
    ///
    /// Transient RPC errors while polling are logged and polling continues;
    /// cancellation and the deadline both surface as `MiningTimeout`.
    pub async fn wait<F, Fut>(
        &self,
        tx_hash: TxHash,
        cancel: &CancellationToken,
        mut fetch: F,
    ) -> BlockchainResult<MinedReceipt>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = BlockchainResult<Option<MinedReceipt>>>,
    {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let deadline = tokio::time::sleep(self.deadline);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::warn!(tx_hash = %tx_hash, "Mining wait cancelled");
                    return Err(BlockchainError::MiningTimeout(tx_hash));
                }
                _ = &mut deadline => {
                    tracing::warn!(tx_hash = %tx_hash, "Mining wait exceeded deadline");
                    return Err(BlockchainError::MiningTimeout(tx_hash));
                }
                _ = ticker.tick() => {
                    match fetch().await {
                        Ok(Some(receipt)) => {
                            tracing::debug!(
                                tx_hash = %tx_hash,
                                block = ?receipt.block_number,
                                success = receipt.success,
                                "Transaction mined"
                            );
                            return Ok(receipt);
                        }
                        Ok(None) => tracing::debug!(tx_hash = %tx_hash, "Transaction pending"),
                        Err(e) if e.is_transient() => {
                            tracing::warn!(tx_hash = %tx_hash, error = %e, "Receipt poll failed, retrying");
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }
}

/// The first `PropertyRegistered` log emitted by `factory` in a receipt.
///
/// Asset and token addresses always come from the same log, hence the same
/// transaction. Same-signature logs from other contracts are ignored.
pub fn registered_property(receipt: &MinedReceipt, factory: Address) -> Option<PropertyRegisteredEvent> {
    receipt
        .logs
        .iter()
        .filter(|log| log.address == factory)
        .find_map(|log| decode_property_registered(log, Some(receipt.tx_hash), receipt.block_number).ok())
}

pub fn decode_property_registered(
    log: &Log,
    tx_hash: Option<TxHash>,
    block_number: Option<u64>,
) -> BlockchainResult<PropertyRegisteredEvent> {
    let decoded = PropertyRegistered::decode_log(log)
        .map_err(|e| BlockchainError::Decode(format!("PropertyRegistered: {}", e)))?;
    let event = decoded.data;
    Ok(PropertyRegisteredEvent {
        asset: event.asset,
        token: event.token,
        owner: event.owner,
        metadata_cid: event.metadataCID,
        valuation: event.valuation,
        tx_hash,
        block_number,
    })
}

pub fn decode_revenue_deposited(
    log: &Log,
    tx_hash: Option<TxHash>,
    block_number: Option<u64>,
) -> BlockchainResult<RevenueDepositedEvent> {
    let decoded = RevenueDeposited::decode_log(log)
        .map_err(|e| BlockchainError::Decode(format!("RevenueDeposited: {}", e)))?;
    let event = decoded.data;
    Ok(RevenueDepositedEvent {
        distribution_id: event.id,
        token: event.token,
        amount: event.amount,
        snapshot_id: event.snapshotId,
        stablecoin: event.stablecoin,
        tx_hash,
        block_number,
    })
}
