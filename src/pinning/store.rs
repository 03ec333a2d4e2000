//! The pin store seam.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::error::CoreError;

#[derive(Debug, Error)]
pub enum PinError {
    /// Connection, TLS, or premature-EOF failure.
    #[error("pin transport error: {0}")]
    Transport(String),

    /// Upload exceeded its wall-clock cap.
    #[error("pin upload timed out after {0}s")]
    Timeout(u64),

    /// Non-2xx response or an unusable body.
    #[error("pin service returned {status}: {body}")]
    Protocol { status: u16, body: String },
}

impl From<PinError> for CoreError {
    fn from(err: PinError) -> Self {
        match err {
            PinError::Transport(msg) => CoreError::PinTransport(msg),
            PinError::Timeout(secs) => CoreError::PinTimeout(secs),
            PinError::Protocol { status, body } => CoreError::PinProtocol { status, body },
        }
    }
}

#[async_trait]
pub trait PinStore: Send + Sync {
    /// Pin one file and return its CID.
    async fn upload(&self, content: Bytes, filename: &str) -> Result<String, PinError>;

    /// Public URL for a CID.
    fn gateway_url(&self, cid: &str) -> String;

    /// Fetch pinned bytes through the gateway.
    async fn fetch(&self, cid: &str) -> Result<Bytes, PinError>;
}
