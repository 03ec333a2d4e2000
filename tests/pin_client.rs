//! The pin service client against a local HTTP backend.

use bytes::Bytes;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use estate_coordinator::config::{PinningConfig, Secret};
use estate_coordinator::pinning::{PinError, PinStore, PinataClient};

mod common;

fn client_for(addr: std::net::SocketAddr, timeout_secs: u64) -> PinataClient {
    let config = PinningConfig {
        api_url: format!("http://{}/pinning/pinFileToIPFS", addr),
        gateway_url: format!("http://{}/ipfs", addr),
        jwt: Secret::new("pin-jwt"),
        upload_timeout_secs: timeout_secs,
    };
    PinataClient::new(&config).unwrap()
}

#[tokio::test]
async fn test_upload_returns_cid_and_sends_auth() {
    let (addr, seen) = common::start_programmable_backend(|| async {
        (200, r#"{"IpfsHash":"bafkDEED","PinSize":13,"Timestamp":"2024-01-01T00:00:00Z"}"#.to_string())
    })
    .await;
    let client = client_for(addr, 5);

    let cid = client
        .upload(Bytes::from_static(b"%PDF-1.4 deed"), "1700000000_deed.pdf")
        .await
        .unwrap();

    assert_eq!(cid, "bafkDEED");
    let captured = seen.lock().unwrap().clone();
    assert_eq!(captured.len(), 1);
    let head = captured[0].head.to_ascii_lowercase();
    assert!(head.starts_with("post /pinning/pinfiletoipfs"));
    assert!(head.contains("authorization: bearer pin-jwt"));
    assert!(head.contains("multipart/form-data"));
    let body = String::from_utf8_lossy(&captured[0].body);
    assert!(body.contains("name=\"file\""));
    assert!(body.contains("filename=\"1700000000_deed.pdf\""));
    assert!(body.contains("%PDF-1.4 deed"));
}

#[tokio::test]
async fn test_sequential_uploads_use_fresh_connections() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let (addr, seen) = common::start_programmable_backend(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        async move { (200, format!(r#"{{"IpfsHash":"bafk{}"}}"#, n)) }
    })
    .await;
    let client = client_for(addr, 5);

    for expected in ["bafk1", "bafk2", "bafk3"] {
        let cid = client.upload(Bytes::from_static(b"x"), "a.txt").await.unwrap();
        assert_eq!(cid, expected);
    }
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|c| c.head.to_ascii_lowercase().contains("connection: close")));
}

#[tokio::test]
async fn test_error_status_is_protocol_error() {
    let (addr, _) = common::start_programmable_backend(|| async {
        (401, r#"{"error":"invalid jwt"}"#.to_string())
    })
    .await;
    let client = client_for(addr, 5);

    let err = client.upload(Bytes::from_static(b"x"), "a.txt").await.unwrap_err();
    match err {
        PinError::Protocol { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("invalid jwt"));
        }
        other => panic!("expected protocol error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_or_empty_hash_is_protocol_error() {
    let (addr, _) = common::start_programmable_backend(|| async { (200, r#"{"IpfsHash":""}"#.to_string()) }).await;
    let err = client_for(addr, 5)
        .upload(Bytes::from_static(b"x"), "a.txt")
        .await
        .unwrap_err();
    assert!(matches!(err, PinError::Protocol { status: 200, .. }));

    let (addr, _) = common::start_programmable_backend(|| async { (200, "not json".to_string()) }).await;
    let err = client_for(addr, 5)
        .upload(Bytes::from_static(b"x"), "a.txt")
        .await
        .unwrap_err();
    assert!(matches!(err, PinError::Protocol { status: 200, .. }));
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let (addr, _) = common::start_programmable_backend(|| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        (200, r#"{"IpfsHash":"late"}"#.to_string())
    })
    .await;
    let client = client_for(addr, 1);

    let err = client.upload(Bytes::from_static(b"x"), "a.txt").await.unwrap_err();
    assert!(matches!(err, PinError::Timeout(1)));
}

#[tokio::test]
async fn test_fetch_reads_through_gateway() {
    let (addr, seen) = common::start_programmable_backend(|| async {
        (200, r#"{"name":"House A"}"#.to_string())
    })
    .await;
    let client = client_for(addr, 5);

    let body = client.fetch("bafkMETA").await.unwrap();
    assert_eq!(&body[..], br#"{"name":"House A"}"#);
    assert!(seen.lock().unwrap()[0].head.starts_with("GET /ipfs/bafkMETA"));
}
