//! Failure injection across the ledger, mirror, and event subscriptions.

use bytes::Bytes;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use estate_coordinator::error::CoreError;
use estate_coordinator::ingestor::{Ingestor, IngestorError};
use estate_coordinator::mirror::models::{ApprovalStatus, PropertyStatus, Role};
use estate_coordinator::mirror::{MemoryMirror, MirrorStore};
use estate_coordinator::properties::{property_from_event, PropertyCoordinator, PropertyDraft, UploadedFile};
use estate_coordinator::resilience::ResubscribePolicy;
use estate_coordinator::submitters::ApprovalSubmitter;

mod common;
use common::{seed_user, token_for, wallet, FlakyMirror, Mining, MockLedger, MockPinStore};

fn draft() -> PropertyDraft {
    PropertyDraft {
        name: "House A".into(),
        symbol: "HSA".into(),
        valuation: 100_000,
        token_supply: 1_000,
        owner_wallet: None,
    }
}

fn deed() -> Vec<UploadedFile> {
    vec![UploadedFile {
        filename: "deed.pdf".into(),
        content: Bytes::from_static(b"%PDF"),
    }]
}

fn policy(cap: u32) -> ResubscribePolicy {
    ResubscribePolicy {
        delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(40),
        max_consecutive_failures: cap,
    }
}

async fn seed_token_property(mirror: &dyn MirrorStore) {
    let event = estate_coordinator::blockchain::PropertyRegisteredEvent {
        asset: common::asset_for(1),
        token: token_for(1),
        owner: wallet(0xaa).address(),
        metadata_cid: "bafkDEED".into(),
        valuation: alloy::primitives::U256::from(1u64),
        tx_hash: None,
        block_number: None,
    };
    mirror
        .insert_property(&property_from_event(&event, "House A", None))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rejected_submission_writes_nothing() {
    let ledger = MockLedger::new();
    ledger.reject_submissions.store(true, Ordering::SeqCst);
    let mirror = Arc::new(MemoryMirror::new());
    let coordinator = PropertyCoordinator::new(ledger.clone(), MockPinStore::new(), mirror.clone());

    let err = coordinator
        .create(wallet(0xaa), draft(), deed(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::LedgerSubmit(_)));
    assert_eq!(err.status().as_u16(), 502);
    assert_eq!(mirror.property_count(), 0);
    assert_eq!(mirror.document_count(), 0);
}

#[tokio::test]
async fn test_reverted_creation_writes_nothing() {
    let ledger = MockLedger::new();
    ledger.set_mining(Mining::Revert);
    let mirror = Arc::new(MemoryMirror::new());
    let coordinator = PropertyCoordinator::new(ledger.clone(), MockPinStore::new(), mirror.clone());

    let err = coordinator
        .create(wallet(0xaa), draft(), deed(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        CoreError::LedgerRejected { tx_hash } => assert!(tx_hash.starts_with("0x")),
        other => panic!("expected LedgerRejected, got {:?}", other),
    }
    assert_eq!(mirror.property_count(), 0);
}

#[tokio::test]
async fn test_cancelled_wait_reports_timeout_with_hash() {
    let ledger = MockLedger::new();
    ledger.set_mining_delay(Duration::from_secs(30));
    let mirror = Arc::new(MemoryMirror::new());
    let coordinator = PropertyCoordinator::new(ledger.clone(), MockPinStore::new(), mirror.clone());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = coordinator
        .create(wallet(0xaa), draft(), deed(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::LedgerTimeout { .. }));
    assert_eq!(ledger.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(mirror.property_count(), 0);
}

#[tokio::test]
async fn test_approve_user_without_registry_is_unavailable() {
    let ledger = MockLedger::without_registry();
    let submitter = ApprovalSubmitter::new(ledger.clone(), Arc::new(MemoryMirror::new()));

    let err = submitter
        .approve_user(wallet(0x01), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::ServiceUnavailable(_)));
    assert_eq!(ledger.approve_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_approve_user_updates_mirror_after_mining() {
    let ledger = MockLedger::new();
    let mirror = Arc::new(MemoryMirror::new());
    seed_user(mirror.as_ref(), wallet(0x01), Role::User).await;
    let submitter = ApprovalSubmitter::new(ledger.clone(), mirror.clone());

    let approved = submitter
        .approve_user(wallet(0x01), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(approved.approved, Some(true));
    assert!(approved.warning.is_none());
    let user = mirror.user_by_wallet(&wallet(0x01)).await.unwrap().unwrap();
    assert_eq!(user.approval_status, ApprovalStatus::Approved);
}

#[tokio::test]
async fn test_unreadable_registry_after_mining_still_approves() {
    let ledger = MockLedger::new();
    ledger.fail_approval_reads.store(true, Ordering::SeqCst);
    let mirror = Arc::new(MemoryMirror::new());
    seed_user(mirror.as_ref(), wallet(0x01), Role::User).await;
    let submitter = ApprovalSubmitter::new(ledger.clone(), mirror.clone());

    let approved = submitter
        .approve_user(wallet(0x01), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(approved.status, "success");
    assert_eq!(approved.approved, None);
    assert!(approved.warning.as_deref().unwrap().contains("read failed"));
    assert_eq!(ledger.approve_calls.load(Ordering::SeqCst), 1);
    let user = mirror.user_by_wallet(&wallet(0x01)).await.unwrap().unwrap();
    assert_eq!(user.approval_status, ApprovalStatus::Approved);
}

#[tokio::test]
async fn test_record_user_approval_writes_requested_status() {
    let mirror = Arc::new(MemoryMirror::new());
    seed_user(mirror.as_ref(), wallet(0x01), Role::User).await;
    let submitter = ApprovalSubmitter::new(MockLedger::new(), mirror.clone());

    let recorded = submitter
        .record_user_approval(wallet(0x01), ApprovalStatus::Rejected)
        .await
        .unwrap();

    assert_eq!(recorded.approval_status, ApprovalStatus::Rejected);
    let user = mirror.user_by_wallet(&wallet(0x01)).await.unwrap().unwrap();
    assert_eq!(user.approval_status, ApprovalStatus::Rejected);

    let err = submitter
        .record_user_approval(wallet(0x09), ApprovalStatus::Approved)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn test_property_status_follows_mined_receipts() {
    let ledger = MockLedger::new();
    let mirror = Arc::new(MemoryMirror::new());
    seed_token_property(mirror.as_ref()).await;
    let id = mirror.list_properties().await.unwrap()[0].id;
    let submitter = ApprovalSubmitter::new(ledger.clone(), mirror.clone());

    let changed = submitter
        .set_property_status(id, false, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(changed.property_status, PropertyStatus::Closed);
    assert!(changed.warning.is_none());

    // A reverted approval leaves the closed row alone.
    ledger.set_mining(Mining::Revert);
    let err = submitter
        .set_property_status(id, true, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::LedgerRejected { .. }));
    let property = mirror.property_by_id(id).await.unwrap().unwrap();
    assert_eq!(property.status, PropertyStatus::Closed);
    assert_eq!(ledger.status_calls.load(Ordering::SeqCst), 2);

    let err = submitter
        .set_property_status(uuid::Uuid::new_v4(), true, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn test_ingestor_resubscribes_after_refused_subscriptions() {
    let ledger = MockLedger::new();
    ledger.failing_subscriptions.store(2, Ordering::SeqCst);
    let mirror = Arc::new(MemoryMirror::new());
    seed_token_property(mirror.as_ref()).await;

    let shutdown = CancellationToken::new();
    let ingestor = Arc::new(Ingestor::new(ledger.clone(), mirror.clone(), policy(5)));
    let task = tokio::spawn(ingestor.run(shutdown.clone()));

    let l = ledger.clone();
    assert!(common::eventually(|| { let l = l.clone(); async move { l.has_revenue_subscriber() } }).await);
    assert_eq!(ledger.revenue_subscriptions.load(Ordering::SeqCst), 3);

    ledger.emit_revenue(common::revenue_event(token_for(1), 50, 1, 0x21));
    let m = mirror.clone();
    assert!(common::eventually(|| { let m = m.clone(); async move { m.revenue_count() == 1 } }).await);

    shutdown.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_dropped_subscription_is_reestablished() {
    let ledger = MockLedger::new();
    let mirror = Arc::new(MemoryMirror::new());
    seed_token_property(mirror.as_ref()).await;

    let shutdown = CancellationToken::new();
    let ingestor = Arc::new(Ingestor::new(ledger.clone(), mirror.clone(), policy(3)));
    let task = tokio::spawn(ingestor.run(shutdown.clone()));

    let l = ledger.clone();
    assert!(common::eventually(|| { let l = l.clone(); async move { l.has_revenue_subscriber() } }).await);
    assert!(ledger.drop_revenue_subscription());

    let l = ledger.clone();
    assert!(common::eventually(|| {
        let l = l.clone();
        async move { l.revenue_subscriptions.load(Ordering::SeqCst) == 2 && l.has_revenue_subscriber() }
    })
    .await);

    ledger.emit_revenue(common::revenue_event(token_for(1), 75, 2, 0x22));
    let m = mirror.clone();
    assert!(common::eventually(|| { let m = m.clone(); async move { m.revenue_count() == 1 } }).await);

    shutdown.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_ingestor_gives_up_and_stops_the_process() {
    let ledger = MockLedger::new();
    ledger.failing_subscriptions.store(u32::MAX, Ordering::SeqCst);
    let mirror = Arc::new(MemoryMirror::new());

    let shutdown = CancellationToken::new();
    let ingestor = Arc::new(Ingestor::new(ledger.clone(), mirror, policy(3)));

    let result = tokio::time::timeout(Duration::from_secs(5), ingestor.run(shutdown.clone()))
        .await
        .expect("ingestor should stop on its own");

    assert!(matches!(result, Err(IngestorError::GaveUp { failures: 3, .. })));
    assert!(shutdown.is_cancelled());
}

#[tokio::test]
async fn test_revenue_write_failure_does_not_stop_stream() {
    let ledger = MockLedger::new();
    let mirror = FlakyMirror::new();
    seed_token_property(mirror.as_ref()).await;
    mirror.fail_revenue_inserts.store(true, Ordering::SeqCst);

    let shutdown = CancellationToken::new();
    let ingestor = Arc::new(Ingestor::new(ledger.clone(), mirror.clone(), policy(3)));
    let task = tokio::spawn(ingestor.run(shutdown.clone()));

    let l = ledger.clone();
    assert!(common::eventually(|| { let l = l.clone(); async move { l.has_revenue_subscriber() } }).await);
    ledger.emit_revenue(common::revenue_event(token_for(1), 10, 1, 0x31));
    // Let the handler exhaust its retries against the failing mirror.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(mirror.inner.revenue_count(), 0);

    mirror.fail_revenue_inserts.store(false, Ordering::SeqCst);
    ledger.emit_revenue(common::revenue_event(token_for(1), 20, 2, 0x32));
    let m = mirror.clone();
    assert!(common::eventually(|| { let m = m.clone(); async move { m.inner.revenue_count() == 1 } }).await);
    assert_eq!(ledger.revenue_subscriptions.load(Ordering::SeqCst), 1);

    shutdown.cancel();
    task.await.unwrap().unwrap();
}
