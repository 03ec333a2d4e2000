//! The contract surface the coordinator consumes.
//!
//! Reads are idempotent. Writes return as soon as the RPC accepts the
//! transaction; waiting for inclusion is a separate call so the caller decides
//! whether and how long to wait.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::blockchain::types::{
    BlockchainResult, CreatePropertyCall, MinedReceipt, PropertyRegisteredEvent,
    RevenueDepositedEvent, SubmittedTx,
};

/// Stream of decoded events; an `Err` item or end-of-stream means the
/// subscription needs to be re-established.
pub type EventStream<T> = BoxStream<'static, BlockchainResult<T>>;

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Address of the approval registry, if the handle was resolved.
    fn approval_contract(&self) -> Option<Address>;

    /// Property factory; only its logs describe created properties.
    fn factory_contract(&self) -> Address;

    async fn is_user_approved(&self, wallet: Address) -> BlockchainResult<bool>;

    async fn approve_user(&self, wallet: Address) -> BlockchainResult<SubmittedTx>;

    async fn create_property(&self, call: CreatePropertyCall) -> BlockchainResult<SubmittedTx>;

    async fn approve_property(&self, asset: Address) -> BlockchainResult<SubmittedTx>;

    async fn reject_property(&self, asset: Address) -> BlockchainResult<SubmittedTx>;

    async fn deposit_revenue(
        &self,
        token: Address,
        stablecoin: Address,
        amount: U256,
    ) -> BlockchainResult<SubmittedTx>;

    /// Balance in 18-decimal base units.
    async fn token_balance(&self, token: Address, holder: Address) -> BlockchainResult<U256>;

    async fn transfer_tokens(
        &self,
        token: Address,
        to: Address,
        amount: U256,
    ) -> BlockchainResult<SubmittedTx>;

    /// Wait until the transaction is mined, the token is cancelled, or the
    /// client's own mining deadline passes.
    ///
    /// A mined receipt is returned regardless of its status flag.
    async fn wait_for_receipt(
        &self,
        tx: &SubmittedTx,
        cancel: &CancellationToken,
    ) -> BlockchainResult<MinedReceipt>;

    /// Latest block number; used by health reporting.
    async fn head_block(&self) -> BlockchainResult<u64>;
}

/// Log subscriptions feeding the ingestor.
#[async_trait]
pub trait EventFeed: Send + Sync {
    async fn property_registered(&self) -> BlockchainResult<EventStream<PropertyRegisteredEvent>>;

    async fn revenue_deposited(&self) -> BlockchainResult<EventStream<RevenueDepositedEvent>>;
}
