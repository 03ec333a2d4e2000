//! Ledger RPC client.
//!
//! # Responsibilities
//! - Connect to the RPC endpoint (WebSocket for subscriptions)
//! - Resolve the contract suite from the platform registry before serving
//! - Serialize every write through one submit-sign-send critical section
//! - Expose reads with timeouts and log subscriptions for the ingestor

use alloy::network::Ethereum;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::rpc::types::Filter;
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use futures_util::StreamExt;
use std::future::{Future, IntoFuture};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::blockchain::contracts::{
    IApprovalRegistry, IPlatformRegistry, IPropertyFactory, IPropertyToken, IRevenueDistributor,
    PropertyRegistered, RevenueDeposited,
};
use crate::blockchain::ledger::{EventFeed, EventStream, Ledger};
use crate::blockchain::nonce::{nonce_source, NonceSource};
use crate::blockchain::transaction::{
    decode_property_registered, decode_revenue_deposited, ReceiptWaiter,
};
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, ChainId, ContractSet, CreatePropertyCall, LedgerConfig,
    MinedReceipt, PropertyRegisteredEvent, RevenueDepositedEvent, SubmittedTx,
};
use crate::blockchain::wallet::Wallet;
use crate::observability::metrics;

/// Ledger client bound to one signer and one resolved contract suite.
pub struct LedgerClient {
    provider: DynProvider,
    wallet: Wallet,
    chain_id: ChainId,
    contracts: ContractSet,
    write_lock: Mutex<()>,
    nonces: Box<dyn NonceSource>,
    waiter: ReceiptWaiter,
    timeout_duration: Duration,
    config: LedgerConfig,
}

impl LedgerClient {
    /// Connect, bind the signer to the reported chain, and resolve the registry.
    ///
    /// Any failure here is fatal for the process: nothing may be served before
    /// the contract suite is known.
    pub async fn connect(config: LedgerConfig, private_key: &str) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let wallet = Wallet::from_private_key(private_key)?;

        let probe = ProviderBuilder::new()
            .connect(&config.rpc_url)
            .await
            .map_err(|e| BlockchainError::Rpc(format!("connect '{}': {}", config.rpc_url, e)))?;
        let chain_id = match timeout(timeout_duration, probe.get_chain_id()).await {
            Ok(Ok(id)) => ChainId(id),
            Ok(Err(e)) => return Err(BlockchainError::Rpc(e.to_string())),
            Err(_) => return Err(BlockchainError::Timeout(config.rpc_timeout_secs)),
        };
        if let Some(expected) = config.chain_id {
            if expected != chain_id.0 {
                return Err(BlockchainError::Rpc(format!(
                    "chain id mismatch: configured {}, RPC reports {}",
                    expected, chain_id.0
                )));
            }
        }

        let wallet = wallet.bind_chain(chain_id.0);
        let provider = ProviderBuilder::new()
            .wallet(wallet.network_wallet())
            .connect(&config.rpc_url)
            .await
            .map_err(|e| BlockchainError::Rpc(format!("connect '{}': {}", config.rpc_url, e)))?
            .erased();

        let registry: Address = config
            .registry_address
            .parse()
            .map_err(|e| BlockchainError::Registry(format!("invalid registry address: {}", e)))?;
        let contracts = resolve_registry(&provider, registry, timeout_duration).await?;

        tracing::info!(
            rpc_url = %config.rpc_url,
            chain_id = chain_id.0,
            signer = %wallet.address(),
            approval = %contracts.approval,
            factory = %contracts.factory,
            revenue = %contracts.revenue,
            nonce_mode = ?config.nonce_mode,
            "Ledger client initialized"
        );

        let waiter = ReceiptWaiter::new(
            Duration::from_millis(config.receipt_poll_interval_ms),
            Duration::from_secs(config.mining_timeout_secs),
        );

        Ok(Self {
            provider,
            wallet,
            chain_id,
            nonces: nonce_source(config.nonce_mode),
            contracts,
            write_lock: Mutex::new(()),
            waiter,
            timeout_duration,
            config,
        })
    }

    pub fn contracts(&self) -> ContractSet {
        self.contracts
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn signer_address(&self) -> Address {
        self.wallet.address()
    }

    /// Run an RPC read under the configured timeout.
    async fn read<T, E, F>(&self, what: &'static str, fut: F) -> BlockchainResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match timeout(self.timeout_duration, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(op = what, error = %e, "RPC read failed");
                Err(BlockchainError::Rpc(format!("{}: {}", what, e)))
            }
            Err(_) => {
                tracing::warn!(op = what, "RPC read timed out");
                Err(BlockchainError::Timeout(self.config.rpc_timeout_secs))
            }
        }
    }

    /// The submit-sign-send critical section.
    ///
    /// Holds the write lock while the nonce is chosen and the signed
    /// transaction is handed to the RPC, and releases it before any mining wait.
    async fn submit<F, Fut>(&self, op: &'static str, send: F) -> BlockchainResult<SubmittedTx>
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = Result<PendingTransactionBuilder<Ethereum>, alloy::contract::Error>>,
    {
        let _guard = self.write_lock.lock().await;
        let nonce = self.nonces.next_nonce(&self.provider, self.wallet.address()).await?;

        match timeout(self.timeout_duration, send(nonce)).await {
            Ok(Ok(pending)) => {
                let hash = *pending.tx_hash();
                metrics::record_tx_submitted(op);
                tracing::info!(op = op, tx_hash = %hash, nonce = nonce, "Transaction submitted");
                Ok(SubmittedTx { hash })
            }
            Ok(Err(e)) => {
                self.nonces.invalidate();
                metrics::record_tx_failed(op, "submit");
                tracing::error!(op = op, nonce = nonce, error = %e, "Transaction submission rejected");
                Err(BlockchainError::Submit(e.to_string()))
            }
            Err(_) => {
                self.nonces.invalidate();
                metrics::record_tx_failed(op, "submit_timeout");
                Err(BlockchainError::Timeout(self.config.rpc_timeout_secs))
            }
        }
    }

    async fn fetch_receipt(&self, hash: TxHash) -> BlockchainResult<Option<MinedReceipt>> {
        let receipt = self
            .read("get_transaction_receipt", self.provider.get_transaction_receipt(hash))
            .await?;
        Ok(receipt.map(|r| MinedReceipt {
            tx_hash: r.transaction_hash,
            block_number: r.block_number,
            success: r.status(),
            logs: r.inner.logs().iter().map(|l| l.inner.clone()).collect(),
        }))
    }
}

/// Read the three suite addresses; a zero address counts as unresolved.
async fn resolve_registry(
    provider: &DynProvider,
    registry: Address,
    limit: Duration,
) -> BlockchainResult<ContractSet> {
    let contract = IPlatformRegistry::new(registry, provider.clone());

    let approval = registry_entry("approvalRegistry", limit, contract.approvalRegistry().call().into_future()).await?;
    let factory = registry_entry("propertyFactory", limit, contract.propertyFactory().call().into_future()).await?;
    let revenue = registry_entry("revenueDistributor", limit, contract.revenueDistributor().call().into_future()).await?;

    Ok(ContractSet {
        approval,
        factory,
        revenue,
    })
}

async fn registry_entry<F>(name: &str, limit: Duration, fut: F) -> BlockchainResult<Address>
where
    F: Future<Output = Result<Address, alloy::contract::Error>>,
{
    let address = match timeout(limit, fut).await {
        Ok(Ok(address)) => address,
        Ok(Err(e)) => return Err(BlockchainError::Registry(format!("{}: {}", name, e))),
        Err(_) => return Err(BlockchainError::Registry(format!("{}: timed out", name))),
    };
    if address.is_zero() {
        return Err(BlockchainError::Registry(format!("{} is not set", name)));
    }
    Ok(address)
}

#[async_trait]
impl Ledger for LedgerClient {
    fn approval_contract(&self) -> Option<Address> {
        Some(self.contracts.approval)
    }

    fn factory_contract(&self) -> Address {
        self.contracts.factory
    }

    async fn is_user_approved(&self, wallet: Address) -> BlockchainResult<bool> {
        let contract = IApprovalRegistry::new(self.contracts.approval, self.provider.clone());
        self.read("isApproved", contract.isApproved(wallet).call().into_future()).await
    }

    async fn approve_user(&self, wallet: Address) -> BlockchainResult<SubmittedTx> {
        let contract = IApprovalRegistry::new(self.contracts.approval, self.provider.clone());
        self.submit("approve_user", |nonce| async move {
            contract.approveUser(wallet).nonce(nonce).send().await
        })
        .await
    }

    async fn create_property(&self, call: CreatePropertyCall) -> BlockchainResult<SubmittedTx> {
        let contract = IPropertyFactory::new(self.contracts.factory, self.provider.clone());
        self.submit("create_property", |nonce| async move {
            contract
                .createProperty(
                    call.owner,
                    call.name,
                    call.symbol,
                    call.metadata_cid,
                    call.valuation,
                    call.supply_base_units,
                    call.token_name,
                    call.token_symbol,
                )
                .nonce(nonce)
                .send()
                .await
        })
        .await
    }

    async fn approve_property(&self, asset: Address) -> BlockchainResult<SubmittedTx> {
        let contract = IPropertyFactory::new(self.contracts.factory, self.provider.clone());
        self.submit("approve_property", |nonce| async move {
            contract.approveProperty(asset).nonce(nonce).send().await
        })
        .await
    }

    async fn reject_property(&self, asset: Address) -> BlockchainResult<SubmittedTx> {
        let contract = IPropertyFactory::new(self.contracts.factory, self.provider.clone());
        self.submit("reject_property", |nonce| async move {
            contract.rejectProperty(asset).nonce(nonce).send().await
        })
        .await
    }

    async fn deposit_revenue(
        &self,
        token: Address,
        stablecoin: Address,
        amount: U256,
    ) -> BlockchainResult<SubmittedTx> {
        let contract = IRevenueDistributor::new(self.contracts.revenue, self.provider.clone());
        self.submit("deposit_revenue", |nonce| async move {
            contract
                .depositRevenue(token, stablecoin, amount)
                .nonce(nonce)
                .send()
                .await
        })
        .await
    }

    async fn token_balance(&self, token: Address, holder: Address) -> BlockchainResult<U256> {
        let contract = IPropertyToken::new(token, self.provider.clone());
        self.read("balanceOf", contract.balanceOf(holder).call().into_future()).await
    }

    async fn transfer_tokens(
        &self,
        token: Address,
        to: Address,
        amount: U256,
    ) -> BlockchainResult<SubmittedTx> {
        let contract = IPropertyToken::new(token, self.provider.clone());
        self.submit("transfer_tokens", |nonce| async move {
            contract.transfer(to, amount).nonce(nonce).send().await
        })
        .await
    }

    async fn wait_for_receipt(
        &self,
        tx: &SubmittedTx,
        cancel: &CancellationToken,
    ) -> BlockchainResult<MinedReceipt> {
        let hash = tx.hash;
        self.waiter
            .wait(hash, cancel, || self.fetch_receipt(hash))
            .await
    }

    async fn head_block(&self) -> BlockchainResult<u64> {
        self.read("get_block_number", self.provider.get_block_number()).await
    }
}

#[async_trait]
impl EventFeed for LedgerClient {
    async fn property_registered(&self) -> BlockchainResult<EventStream<PropertyRegisteredEvent>> {
        let filter = Filter::new()
            .address(self.contracts.factory)
            .event_signature(PropertyRegistered::SIGNATURE_HASH);
        let subscription = self
            .provider
            .subscribe_logs(&filter)
            .await
            .map_err(|e| BlockchainError::Subscription(e.to_string()))?;

        let stream = subscription.into_stream().map(|log| {
            decode_property_registered(&log.inner, log.transaction_hash, log.block_number)
        });
        Ok(stream.boxed())
    }

    async fn revenue_deposited(&self) -> BlockchainResult<EventStream<RevenueDepositedEvent>> {
        let filter = Filter::new()
            .address(self.contracts.revenue)
            .event_signature(RevenueDeposited::SIGNATURE_HASH);
        let subscription = self
            .provider
            .subscribe_logs(&filter)
            .await
            .map_err(|e| BlockchainError::Subscription(e.to_string()))?;

        let stream = subscription.into_stream().map(|log| {
            decode_revenue_deposited(&log.inner, log.transaction_hash, log.block_number)
        });
        Ok(stream.boxed())
    }
}

impl std::fmt::Debug for LedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.chain_id.0)
            .field("signer", &self.wallet.address())
            .field("contracts", &self.contracts)
            .finish()
    }
}
