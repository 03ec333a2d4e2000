//! Error taxonomy surfaced at the HTTP boundary.
//!
//! # Design Decisions
//! - Subsystems keep their own error enums; `From` conversions fold them in here
//! - Each variant maps to exactly one status code and one stable `error` kind
//! - Errors after an irrevocable ledger write are not represented here; those
//!   paths downgrade to a warning on a success response

use axum::{
    extract::multipart::MultipartError,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::blockchain::types::{tx_hash_hex, BlockchainError, InvalidAddress};
use crate::blockchain::units::AmountError;

/// Result alias for core entry points.
pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    StateConflict(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("pin store unreachable: {0}")]
    PinTransport(String),

    #[error("pin upload timed out after {0}s")]
    PinTimeout(u64),

    #[error("pin store returned {status}: {body}")]
    PinProtocol { status: u16, body: String },

    #[error("transaction not accepted: {0}")]
    LedgerSubmit(String),

    #[error("transaction {tx_hash} mined with failure status")]
    LedgerRejected { tx_hash: String },

    #[error("transaction {tx_hash} not mined before deadline; it may still be included")]
    LedgerTimeout { tx_hash: String },

    #[error("mirror store error: {0}")]
    MirrorWrite(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::BadRequest(_) => "bad_request",
            CoreError::PayloadTooLarge(_) => "payload_too_large",
            CoreError::Unauthorized(_) => "unauthorized",
            CoreError::Forbidden(_) => "forbidden",
            CoreError::NotFound(_) => "not_found",
            CoreError::StateConflict(_) => "state_conflict",
            CoreError::ServiceUnavailable(_) => "service_unavailable",
            CoreError::PinTransport(_) => "pin_transport",
            CoreError::PinTimeout(_) => "pin_timeout",
            CoreError::PinProtocol { .. } => "pin_protocol",
            CoreError::LedgerSubmit(_) => "ledger_submit",
            CoreError::LedgerRejected { .. } => "ledger_rejected",
            CoreError::LedgerTimeout { .. } => "ledger_timeout",
            CoreError::MirrorWrite(_) => "mirror_write",
            CoreError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            CoreError::BadRequest(_) => StatusCode::BAD_REQUEST,
            CoreError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            CoreError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::StateConflict(_) => StatusCode::CONFLICT,
            CoreError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::PinTransport(_) | CoreError::PinProtocol { .. } => StatusCode::BAD_GATEWAY,
            CoreError::PinTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            CoreError::LedgerSubmit(_) => StatusCode::BAD_GATEWAY,
            CoreError::LedgerRejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::LedgerTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            CoreError::MirrorWrite(_) | CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "Request failed");
        } else {
            tracing::debug!(kind = self.kind(), error = %self, "Request rejected");
        }
        let body = json!({ "error": self.kind(), "message": self.to_string() });
        (status, Json(body)).into_response()
    }
}

impl From<BlockchainError> for CoreError {
    fn from(err: BlockchainError) -> Self {
        match err {
            BlockchainError::Submit(msg) | BlockchainError::Nonce(msg) => CoreError::LedgerSubmit(msg),
            BlockchainError::Reverted(hash) => CoreError::LedgerRejected {
                tx_hash: tx_hash_hex(&hash),
            },
            BlockchainError::MiningTimeout(hash) => CoreError::LedgerTimeout {
                tx_hash: tx_hash_hex(&hash),
            },
            BlockchainError::NotAvailable(msg) => CoreError::ServiceUnavailable(msg),
            e @ (BlockchainError::Rpc(_) | BlockchainError::Timeout(_)) => {
                CoreError::ServiceUnavailable(format!("ledger unreachable: {}", e))
            }
            other => CoreError::Internal(other.to_string()),
        }
    }
}

impl From<InvalidAddress> for CoreError {
    fn from(err: InvalidAddress) -> Self {
        CoreError::BadRequest(err.to_string())
    }
}

impl From<AmountError> for CoreError {
    fn from(err: AmountError) -> Self {
        CoreError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for CoreError {
    fn from(rejection: JsonRejection) -> Self {
        CoreError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for CoreError {
    fn from(rejection: PathRejection) -> Self {
        CoreError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for CoreError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            CoreError::PayloadTooLarge(err.body_text())
        } else {
            CoreError::BadRequest(err.body_text())
        }
    }
}
