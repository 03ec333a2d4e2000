//! The mirror store seam.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::blockchain::types::WalletAddress;
use crate::error::CoreError;
use crate::mirror::models::{
    ApprovalStatus, Property, PropertyDocument, PropertyStatus, RequestTransition,
    RevenueDistribution, UploadRequest, UploadRequestDocument, User,
};

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A unique key (wallet, email) is already taken.
    #[error("{0} already exists")]
    Duplicate(&'static str),

    /// A stored row could not be mapped back to a model.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("mirror unavailable: {0}")]
    Unavailable(String),
}

pub type MirrorResult<T> = Result<T, MirrorError>;

impl From<MirrorError> for CoreError {
    fn from(err: MirrorError) -> Self {
        match err {
            MirrorError::Duplicate(what) => CoreError::StateConflict(format!("{} already exists", what)),
            other => CoreError::MirrorWrite(other.to_string()),
        }
    }
}

/// Create/read/update access to the mirror.
///
/// Lookups by wallet or contract address compare canonical bytes, so they are
/// case-insensitive whatever casing the caller received.
#[async_trait]
pub trait MirrorStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> MirrorResult<()>;
    async fn user_by_id(&self, id: Uuid) -> MirrorResult<Option<User>>;
    async fn user_by_email(&self, email: &str) -> MirrorResult<Option<User>>;
    async fn user_by_wallet(&self, wallet: &WalletAddress) -> MirrorResult<Option<User>>;
    /// Returns false when no user has that wallet.
    async fn set_user_approval(&self, wallet: &WalletAddress, status: ApprovalStatus) -> MirrorResult<bool>;
    async fn set_password_digest(&self, id: Uuid, digest: &str) -> MirrorResult<bool>;
    async fn delete_user(&self, id: Uuid) -> MirrorResult<bool>;

    /// Insert unless a row with the same asset address exists.
    ///
    /// Returns true when this call created the row.
    async fn insert_property(&self, property: &Property) -> MirrorResult<bool>;
    /// Set the display name of a row that was materialized without one.
    async fn backfill_display_name(&self, asset: &WalletAddress, name: &str) -> MirrorResult<bool>;
    async fn property_by_id(&self, id: Uuid) -> MirrorResult<Option<Property>>;
    async fn property_by_asset(&self, asset: &WalletAddress) -> MirrorResult<Option<Property>>;
    async fn property_by_token(&self, token: &WalletAddress) -> MirrorResult<Option<Property>>;
    async fn list_properties(&self) -> MirrorResult<Vec<Property>>;
    async fn set_property_status(&self, id: Uuid, status: PropertyStatus) -> MirrorResult<bool>;

    async fn insert_property_document(&self, document: &PropertyDocument) -> MirrorResult<()>;
    async fn property_documents(&self, property_id: Uuid) -> MirrorResult<Vec<PropertyDocument>>;

    async fn insert_upload_request(&self, request: &UploadRequest) -> MirrorResult<()>;
    async fn insert_request_document(&self, document: &UploadRequestDocument) -> MirrorResult<()>;
    async fn upload_request(&self, id: Uuid) -> MirrorResult<Option<UploadRequest>>;
    async fn request_documents(&self, request_id: Uuid) -> MirrorResult<Vec<UploadRequestDocument>>;
    /// All requests, or only those whose wallet matches.
    async fn list_upload_requests(&self, wallet: Option<&WalletAddress>) -> MirrorResult<Vec<UploadRequest>>;
    /// Apply a transition only if the request is still pending.
    ///
    /// Returns false when the request is missing or already terminal.
    async fn transition_upload_request(&self, id: Uuid, transition: &RequestTransition) -> MirrorResult<bool>;

    /// Insert unless `(deposit_tx_hash, snapshot_id)` was already recorded.
    async fn insert_revenue_distribution(&self, distribution: &RevenueDistribution) -> MirrorResult<bool>;
    async fn revenue_for_property(&self, property_id: Uuid) -> MirrorResult<Vec<RevenueDistribution>>;
}
