//! Shared fixtures for the integration tests: a scripted ledger, an
//! in-process pin store, a mirror with injectable write failures, and a raw
//! TCP backend for the pin client.

#![allow(dead_code)]

use alloy::primitives::{Address, Log, TxHash, B256, U256};
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use futures_util::stream::{self, StreamExt};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use estate_coordinator::auth::RequestAuth;
use estate_coordinator::blockchain::contracts::PropertyRegistered;
use estate_coordinator::blockchain::{
    BlockchainError, BlockchainResult, CreatePropertyCall, EventFeed, EventStream, Ledger, MinedReceipt,
    PropertyRegisteredEvent, RevenueDepositedEvent, SubmittedTx, WalletAddress,
};
use estate_coordinator::mirror::models::{
    ApprovalStatus, Property, PropertyDocument, PropertyStatus, RequestTransition, RevenueDistribution, Role,
    UploadRequest, UploadRequestDocument, User,
};
use estate_coordinator::mirror::{MemoryMirror, MirrorError, MirrorResult, MirrorStore};
use estate_coordinator::pinning::{PinError, PinStore};

pub fn factory() -> Address {
    Address::repeat_byte(0xfa)
}

pub fn wallet(byte: u8) -> WalletAddress {
    WalletAddress::new(Address::repeat_byte(byte))
}

/// Asset address the mock ledger assigns to the n-th created property.
pub fn asset_for(n: u64) -> Address {
    Address::repeat_byte(0x10 + n as u8)
}

/// Token address the mock ledger assigns to the n-th created property.
pub fn token_for(n: u64) -> Address {
    Address::repeat_byte(0x80 + n as u8)
}

/// What `wait_for_receipt` should do with the next transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mining {
    Success,
    Revert,
}

/// Scripted ledger that also plays the event feed.
///
/// Every submitted transaction gets a fresh hash; creation receipts carry a
/// `PropertyRegistered` log with addresses derived from the call count.
pub struct MockLedger {
    pub create_calls: AtomicU64,
    pub deposit_calls: AtomicU32,
    pub transfer_calls: AtomicU32,
    pub approve_calls: AtomicU32,
    pub status_calls: AtomicU32,
    pub property_subscriptions: AtomicU32,
    pub revenue_subscriptions: AtomicU32,
    /// Subscriptions to fail before handing out a working stream.
    pub failing_subscriptions: AtomicU32,
    pub reject_submissions: AtomicBool,
    /// Fail registry reads issued after an approval.
    pub fail_approval_reads: AtomicBool,
    pub approval_registry: Option<Address>,
    pub mining: Mutex<Mining>,
    pub mining_delay: Mutex<Duration>,
    pub last_create: Mutex<Option<CreatePropertyCall>>,
    pub last_deposit: Mutex<Option<(Address, Address, U256)>>,
    pub last_transfer: Mutex<Option<(Address, Address, U256)>>,
    pub balances: DashMap<(Address, Address), U256>,
    approved: DashSet<Address>,
    receipts: DashMap<TxHash, MinedReceipt>,
    next_hash: AtomicU64,
    property_events: Mutex<Option<mpsc::UnboundedSender<BlockchainResult<PropertyRegisteredEvent>>>>,
    revenue_events: Mutex<Option<mpsc::UnboundedSender<BlockchainResult<RevenueDepositedEvent>>>>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self {
            create_calls: AtomicU64::new(0),
            deposit_calls: AtomicU32::new(0),
            transfer_calls: AtomicU32::new(0),
            approve_calls: AtomicU32::new(0),
            status_calls: AtomicU32::new(0),
            property_subscriptions: AtomicU32::new(0),
            revenue_subscriptions: AtomicU32::new(0),
            failing_subscriptions: AtomicU32::new(0),
            reject_submissions: AtomicBool::new(false),
            fail_approval_reads: AtomicBool::new(false),
            approval_registry: Some(Address::repeat_byte(0xa1)),
            mining: Mutex::new(Mining::Success),
            mining_delay: Mutex::new(Duration::ZERO),
            last_create: Mutex::new(None),
            last_deposit: Mutex::new(None),
            last_transfer: Mutex::new(None),
            balances: DashMap::new(),
            approved: DashSet::new(),
            receipts: DashMap::new(),
            next_hash: AtomicU64::new(1),
            property_events: Mutex::new(None),
            revenue_events: Mutex::new(None),
        }
    }
}

impl MockLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A ledger whose approval registry handle was never resolved.
    pub fn without_registry() -> Arc<Self> {
        Arc::new(Self {
            approval_registry: None,
            ..Self::default()
        })
    }

    pub fn set_mining(&self, mining: Mining) {
        *self.mining.lock().unwrap() = mining;
    }

    pub fn set_mining_delay(&self, delay: Duration) {
        *self.mining_delay.lock().unwrap() = delay;
    }

    fn submit(&self, logs: Vec<Log>) -> BlockchainResult<SubmittedTx> {
        if self.reject_submissions.load(Ordering::SeqCst) {
            return Err(BlockchainError::Submit("insufficient funds for gas".into()));
        }
        let n = self.next_hash.fetch_add(1, Ordering::SeqCst);
        let hash = B256::left_padding_from(&n.to_be_bytes());
        let success = *self.mining.lock().unwrap() == Mining::Success;
        self.receipts.insert(
            hash,
            MinedReceipt {
                tx_hash: hash,
                block_number: Some(100 + n),
                success,
                logs,
            },
        );
        Ok(SubmittedTx { hash })
    }

    /// Push a live `PropertyRegistered` event to the current subscriber.
    pub fn emit_property(&self, event: PropertyRegisteredEvent) -> bool {
        match self.property_events.lock().unwrap().as_ref() {
            Some(tx) => tx.send(Ok(event)).is_ok(),
            None => false,
        }
    }

    /// Push a live `RevenueDeposited` event to the current subscriber.
    pub fn emit_revenue(&self, event: RevenueDepositedEvent) -> bool {
        match self.revenue_events.lock().unwrap().as_ref() {
            Some(tx) => tx.send(Ok(event)).is_ok(),
            None => false,
        }
    }

    /// Break the current revenue subscription with a transport error.
    pub fn drop_revenue_subscription(&self) -> bool {
        match self.revenue_events.lock().unwrap().take() {
            Some(tx) => tx
                .send(Err(BlockchainError::Subscription("connection reset".into())))
                .is_ok(),
            None => false,
        }
    }

    pub fn has_revenue_subscriber(&self) -> bool {
        self.revenue_events.lock().unwrap().is_some()
    }

    pub fn has_property_subscriber(&self) -> bool {
        self.property_events.lock().unwrap().is_some()
    }
}

fn channel_stream<T: Send + 'static>(
    slot: &Mutex<Option<mpsc::UnboundedSender<BlockchainResult<T>>>>,
) -> EventStream<T> {
    let (tx, rx) = mpsc::unbounded_channel();
    *slot.lock().unwrap() = Some(tx);
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed()
}

#[async_trait]
impl Ledger for MockLedger {
    fn approval_contract(&self) -> Option<Address> {
        self.approval_registry
    }

    fn factory_contract(&self) -> Address {
        factory()
    }

    async fn is_user_approved(&self, wallet: Address) -> BlockchainResult<bool> {
        if self.fail_approval_reads.load(Ordering::SeqCst) {
            return Err(BlockchainError::Rpc("read failed".into()));
        }
        Ok(self.approved.contains(&wallet))
    }

    async fn approve_user(&self, wallet: Address) -> BlockchainResult<SubmittedTx> {
        self.approve_calls.fetch_add(1, Ordering::SeqCst);
        let tx = self.submit(Vec::new())?;
        if *self.mining.lock().unwrap() == Mining::Success {
            self.approved.insert(wallet);
        }
        Ok(tx)
    }

    async fn create_property(&self, call: CreatePropertyCall) -> BlockchainResult<SubmittedTx> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let event = PropertyRegistered {
            asset: asset_for(n),
            token: token_for(n),
            owner: call.owner,
            metadataCID: call.metadata_cid.clone(),
            valuation: call.valuation,
        };
        *self.last_create.lock().unwrap() = Some(call);
        self.submit(vec![Log {
            address: factory(),
            data: event.encode_log_data(),
        }])
    }

    async fn approve_property(&self, _asset: Address) -> BlockchainResult<SubmittedTx> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.submit(Vec::new())
    }

    async fn reject_property(&self, _asset: Address) -> BlockchainResult<SubmittedTx> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.submit(Vec::new())
    }

    async fn deposit_revenue(&self, token: Address, stablecoin: Address, amount: U256) -> BlockchainResult<SubmittedTx> {
        self.deposit_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_deposit.lock().unwrap() = Some((token, stablecoin, amount));
        self.submit(Vec::new())
    }

    async fn token_balance(&self, token: Address, holder: Address) -> BlockchainResult<U256> {
        Ok(self.balances.get(&(token, holder)).map(|b| *b).unwrap_or(U256::ZERO))
    }

    async fn transfer_tokens(&self, token: Address, to: Address, amount: U256) -> BlockchainResult<SubmittedTx> {
        self.transfer_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_transfer.lock().unwrap() = Some((token, to, amount));
        self.submit(Vec::new())
    }

    async fn wait_for_receipt(&self, tx: &SubmittedTx, cancel: &CancellationToken) -> BlockchainResult<MinedReceipt> {
        let delay = *self.mining_delay.lock().unwrap();
        tokio::select! {
            _ = cancel.cancelled() => return Err(BlockchainError::MiningTimeout(tx.hash)),
            _ = tokio::time::sleep(delay) => {}
        }
        self.receipts
            .get(&tx.hash)
            .map(|r| r.clone())
            .ok_or_else(|| BlockchainError::Rpc(format!("unknown transaction {}", tx.hash)))
    }

    async fn head_block(&self) -> BlockchainResult<u64> {
        Ok(100 + self.next_hash.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl EventFeed for MockLedger {
    async fn property_registered(&self) -> BlockchainResult<EventStream<PropertyRegisteredEvent>> {
        self.property_subscriptions.fetch_add(1, Ordering::SeqCst);
        Ok(channel_stream(&self.property_events))
    }

    async fn revenue_deposited(&self) -> BlockchainResult<EventStream<RevenueDepositedEvent>> {
        self.revenue_subscriptions.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failing_subscriptions.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_subscriptions.store(remaining - 1, Ordering::SeqCst);
            return Err(BlockchainError::Subscription("upstream refused subscription".into()));
        }
        Ok(channel_stream(&self.revenue_events))
    }
}

/// Pin store that keeps content in memory and hands out sequential CIDs.
#[derive(Default)]
pub struct MockPinStore {
    pub uploads: AtomicU32,
    pub fail_uploads: AtomicBool,
    pub content: DashMap<String, Bytes>,
}

impl MockPinStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Pin content directly, bypassing the upload counter.
    pub fn seed(&self, cid: &str, content: &'static [u8]) {
        self.content.insert(cid.to_string(), Bytes::from_static(content));
    }
}

#[async_trait]
impl PinStore for MockPinStore {
    async fn upload(&self, content: Bytes, _filename: &str) -> Result<String, PinError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(PinError::Transport("connection reset by peer".into()));
        }
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        let cid = format!("bafkmock{}", n);
        self.content.insert(cid.clone(), content);
        Ok(cid)
    }

    fn gateway_url(&self, cid: &str) -> String {
        format!("https://gw.test/ipfs/{}", cid)
    }

    async fn fetch(&self, cid: &str) -> Result<Bytes, PinError> {
        self.content
            .get(cid)
            .map(|c| c.clone())
            .ok_or_else(|| PinError::Protocol { status: 404, body: "not found".into() })
    }
}

/// `MemoryMirror` with injectable write failures.
#[derive(Default)]
pub struct FlakyMirror {
    pub inner: MemoryMirror,
    /// Property inserts to fail before succeeding again.
    pub failing_property_inserts: AtomicU32,
    pub fail_transitions: AtomicBool,
    pub fail_revenue_inserts: AtomicBool,
}

impl FlakyMirror {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn unavailable() -> MirrorError {
        MirrorError::Unavailable("connection refused".into())
    }
}

#[async_trait]
impl MirrorStore for FlakyMirror {
    async fn insert_user(&self, user: &User) -> MirrorResult<()> {
        self.inner.insert_user(user).await
    }
    async fn user_by_id(&self, id: Uuid) -> MirrorResult<Option<User>> {
        self.inner.user_by_id(id).await
    }
    async fn user_by_email(&self, email: &str) -> MirrorResult<Option<User>> {
        self.inner.user_by_email(email).await
    }
    async fn user_by_wallet(&self, wallet: &WalletAddress) -> MirrorResult<Option<User>> {
        self.inner.user_by_wallet(wallet).await
    }
    async fn set_user_approval(&self, wallet: &WalletAddress, status: ApprovalStatus) -> MirrorResult<bool> {
        self.inner.set_user_approval(wallet, status).await
    }
    async fn set_password_digest(&self, id: Uuid, digest: &str) -> MirrorResult<bool> {
        self.inner.set_password_digest(id, digest).await
    }
    async fn delete_user(&self, id: Uuid) -> MirrorResult<bool> {
        self.inner.delete_user(id).await
    }

    async fn insert_property(&self, property: &Property) -> MirrorResult<bool> {
        let remaining = self.failing_property_inserts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_property_inserts.store(remaining - 1, Ordering::SeqCst);
            return Err(Self::unavailable());
        }
        self.inner.insert_property(property).await
    }
    async fn backfill_display_name(&self, asset: &WalletAddress, name: &str) -> MirrorResult<bool> {
        self.inner.backfill_display_name(asset, name).await
    }
    async fn property_by_id(&self, id: Uuid) -> MirrorResult<Option<Property>> {
        self.inner.property_by_id(id).await
    }
    async fn property_by_asset(&self, asset: &WalletAddress) -> MirrorResult<Option<Property>> {
        self.inner.property_by_asset(asset).await
    }
    async fn property_by_token(&self, token: &WalletAddress) -> MirrorResult<Option<Property>> {
        self.inner.property_by_token(token).await
    }
    async fn list_properties(&self) -> MirrorResult<Vec<Property>> {
        self.inner.list_properties().await
    }
    async fn set_property_status(&self, id: Uuid, status: PropertyStatus) -> MirrorResult<bool> {
        self.inner.set_property_status(id, status).await
    }

    async fn insert_property_document(&self, document: &PropertyDocument) -> MirrorResult<()> {
        self.inner.insert_property_document(document).await
    }
    async fn property_documents(&self, property_id: Uuid) -> MirrorResult<Vec<PropertyDocument>> {
        self.inner.property_documents(property_id).await
    }

    async fn insert_upload_request(&self, request: &UploadRequest) -> MirrorResult<()> {
        self.inner.insert_upload_request(request).await
    }
    async fn insert_request_document(&self, document: &UploadRequestDocument) -> MirrorResult<()> {
        self.inner.insert_request_document(document).await
    }
    async fn upload_request(&self, id: Uuid) -> MirrorResult<Option<UploadRequest>> {
        self.inner.upload_request(id).await
    }
    async fn request_documents(&self, request_id: Uuid) -> MirrorResult<Vec<UploadRequestDocument>> {
        self.inner.request_documents(request_id).await
    }
    async fn list_upload_requests(&self, wallet: Option<&WalletAddress>) -> MirrorResult<Vec<UploadRequest>> {
        self.inner.list_upload_requests(wallet).await
    }
    async fn transition_upload_request(&self, id: Uuid, transition: &RequestTransition) -> MirrorResult<bool> {
        if self.fail_transitions.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.transition_upload_request(id, transition).await
    }

    async fn insert_revenue_distribution(&self, distribution: &RevenueDistribution) -> MirrorResult<bool> {
        if self.fail_revenue_inserts.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.insert_revenue_distribution(distribution).await
    }
    async fn revenue_for_property(&self, property_id: Uuid) -> MirrorResult<Vec<RevenueDistribution>> {
        self.inner.revenue_for_property(property_id).await
    }
}

/// Insert a user directly and return the auth context a token for it would carry.
pub async fn seed_user(mirror: &dyn MirrorStore, wallet: WalletAddress, role: Role) -> (User, RequestAuth) {
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        wallet_address: wallet,
        email: format!("{}@example.test", &wallet.canonical()[2..10]),
        display_name: "Seeded".to_string(),
        password_digest: String::new(),
        role,
        approval_status: ApprovalStatus::Pending,
        created_at: now,
        updated_at: now,
    };
    mirror.insert_user(&user).await.unwrap();
    let auth = RequestAuth {
        user_id: user.id,
        wallet,
        role,
    };
    (user, auth)
}

pub fn revenue_event(token: Address, amount: u64, snapshot: u64, tx_byte: u8) -> RevenueDepositedEvent {
    RevenueDepositedEvent {
        distribution_id: U256::from(snapshot),
        token,
        amount: U256::from(amount),
        snapshot_id: U256::from(snapshot),
        stablecoin: Address::repeat_byte(0x5c),
        tx_hash: Some(TxHash::repeat_byte(tx_byte)),
        block_number: Some(7),
    }
}

/// Poll until `check` holds or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// One captured request seen by [`start_programmable_backend`].
#[derive(Debug, Clone)]
pub struct Captured {
    pub head: String,
    pub body: Vec<u8>,
}

/// Start a raw HTTP/1.1 backend on an ephemeral port.
///
/// The whole request is read (Content-Length or chunked) before `f` decides
/// the response, so clients never see a reset mid-upload.
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, Arc<Mutex<Vec<Captured>>>)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);
    let log = seen.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let Some(captured) = read_request(&mut socket).await else {
                    return;
                };
                log.lock().unwrap().push(captured);
                let (status, body) = f().await;
                let status_text = match status {
                    200 => "200 OK",
                    400 => "400 Bad Request",
                    401 => "401 Unauthorized",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    502 => "502 Bad Gateway",
                    _ => "200 OK",
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, seen)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<Captured> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let lower = head.to_ascii_lowercase();
    let content_length = lower
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok());
    let chunked = lower.contains("transfer-encoding: chunked");

    loop {
        let body = &buf[header_end..];
        let done = match content_length {
            Some(len) => body.len() >= len,
            None if chunked => find(body, b"0\r\n\r\n").is_some(),
            None => true,
        };
        if done {
            break;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Some(Captured {
        head,
        body: buf[header_end..].to_vec(),
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
