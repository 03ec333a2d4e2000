//! Two-stage property creation: users submit, admins approve or reject.
//!
//! # Responsibilities
//! - Pin submitted files and record a pending request
//! - Scope listings and reads to the caller unless they are an admin
//! - Drive pending → approved through the property coordinator
//! - Drive pending → rejected without touching the ledger
//!
//! # Design Decisions
//! - An approval claims the request id in-process before any ledger call, so
//!   a concurrent second approval fails fast without a second transaction
//! - The store transition is conditional on `pending`; terminal states never
//!   change
//! - Once the mint is mined the request leaves `pending` even if the
//!   property row is missing; the ingestor materializes the row later
//! - A mined request whose status update fails is reported as partial
//!   success and remembered, so a retried approval only retries the status
//!   update and never mints again

use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::auth::{ensure_access, listing_scope, RequestAuth};
use crate::blockchain::types::WalletAddress;
use crate::error::{CoreError, CoreResult};
use crate::mirror::models::{
    RequestStatus, RequestTransition, UploadRequest, UploadRequestDocument,
};
use crate::mirror::MirrorStore;
use crate::observability::{report_hazard, Hazard};
use crate::pinning::PinStore;
use crate::properties::{pin_files, MintOutcome, MintRequest, PropertyCoordinator, PropertyDraft, UploadedFile};

#[derive(Debug, Clone, Serialize)]
pub struct RequestSubmitted {
    pub status: &'static str,
    pub request_id: Uuid,
    pub files_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestDetail {
    #[serde(flatten)]
    pub request: UploadRequest,
    pub documents: Vec<UploadRequestDocument>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestApproved {
    /// `success`, or `partial_success` when the request could not be marked approved.
    pub status: &'static str,
    pub request_id: Uuid,
    pub property_id: Option<Uuid>,
    pub tx_hash: String,
    pub asset_address: WalletAddress,
    pub token_address: WalletAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestRejected {
    pub status: &'static str,
    pub request_id: Uuid,
}

/// Releases an approval claim when the approval finishes or is dropped.
struct ClaimGuard<'a> {
    claims: &'a DashSet<Uuid>,
    id: Uuid,
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        self.claims.remove(&self.id);
    }
}

pub struct UploadRequestWorkflow {
    coordinator: Arc<PropertyCoordinator>,
    pins: Arc<dyn PinStore>,
    mirror: Arc<dyn MirrorStore>,
    in_flight: DashSet<Uuid>,
    /// Requests whose mint is mined but whose status update did not land.
    minted: DashMap<Uuid, MintOutcome>,
}

impl UploadRequestWorkflow {
    pub fn new(
        coordinator: Arc<PropertyCoordinator>,
        pins: Arc<dyn PinStore>,
        mirror: Arc<dyn MirrorStore>,
    ) -> Self {
        Self {
            coordinator,
            pins,
            mirror,
            in_flight: DashSet::new(),
            minted: DashMap::new(),
        }
    }

    fn claim(&self, id: Uuid) -> CoreResult<ClaimGuard<'_>> {
        if !self.in_flight.insert(id) {
            return Err(CoreError::StateConflict(format!(
                "request {} is already being processed",
                id
            )));
        }
        Ok(ClaimGuard { claims: &self.in_flight, id })
    }

    async fn load(&self, id: Uuid) -> CoreResult<UploadRequest> {
        self.mirror
            .upload_request(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("upload request {} not found", id)))
    }

    #[tracing::instrument(skip(self, auth, draft, files), fields(user_id = %auth.user_id, files = files.len()))]
    pub async fn submit(
        &self,
        auth: &RequestAuth,
        draft: PropertyDraft,
        files: Vec<UploadedFile>,
    ) -> CoreResult<RequestSubmitted> {
        if files.is_empty() {
            return Err(CoreError::BadRequest("at least one file is required".into()));
        }
        self.coordinator.validator().check(&draft)?;

        let user = self
            .mirror
            .user_by_id(auth.user_id)
            .await?
            .ok_or_else(|| CoreError::Unauthorized("user no longer exists".into()))?;

        let documents = pin_files(self.pins.as_ref(), files).await?;
        let metadata_cid = documents
            .first()
            .map(|d| d.cid.clone())
            .ok_or_else(|| CoreError::Internal("no document pinned".into()))?;

        let now = Utc::now();
        let request = UploadRequest {
            id: Uuid::new_v4(),
            user_id: user.id,
            wallet_address: user.wallet_address,
            display_name: draft.name,
            symbol: draft.symbol,
            valuation: BigDecimal::from(draft.valuation),
            token_supply: i64::try_from(draft.token_supply)
                .map_err(|_| CoreError::BadRequest("token_supply is too large".into()))?,
            metadata_cid,
            status: RequestStatus::Pending,
            rejection_reason: None,
            property_id: None,
            approval_tx_hash: None,
            created_at: now,
            updated_at: now,
        };
        self.mirror.insert_upload_request(&request).await?;

        for doc in &documents {
            let row = UploadRequestDocument {
                id: Uuid::new_v4(),
                request_id: request.id,
                file_url: doc.url.clone(),
                file_cid: doc.cid.clone(),
                name: doc.name.clone(),
                type_tag: doc.type_tag,
                uploaded_at: Utc::now(),
            };
            if let Err(e) = self.mirror.insert_request_document(&row).await {
                tracing::warn!(
                    hazard = Hazard::DocumentLinkLost.as_str(),
                    request_id = %request.id,
                    cid = %doc.cid,
                    error = %e,
                    "Request document not recorded"
                );
            }
        }

        tracing::info!(request_id = %request.id, wallet = %request.wallet_address, "Upload request submitted");
        Ok(RequestSubmitted {
            status: "success",
            request_id: request.id,
            files_count: documents.len(),
        })
    }

    pub async fn list(&self, auth: &RequestAuth) -> CoreResult<Vec<UploadRequest>> {
        Ok(self.mirror.list_upload_requests(listing_scope(auth)).await?)
    }

    pub async fn get(&self, auth: &RequestAuth, id: Uuid) -> CoreResult<RequestDetail> {
        let request = self.load(id).await?;
        ensure_access(auth, &request.wallet_address)?;
        let documents = self.mirror.request_documents(id).await?;
        Ok(RequestDetail { request, documents })
    }

    #[tracing::instrument(skip(self, auth, cancel), fields(admin = %auth.user_id))]
    pub async fn approve(
        &self,
        auth: &RequestAuth,
        id: Uuid,
        cancel: &CancellationToken,
    ) -> CoreResult<RequestApproved> {
        auth.require_admin()?;
        let _claim = self.claim(id)?;

        let request = self.load(id).await?;
        if request.status != RequestStatus::Pending {
            return Err(CoreError::StateConflict(format!(
                "request {} is already {}",
                id, request.status
            )));
        }

        if let Some(outcome) = self.minted.get(&id).map(|entry| entry.value().clone()) {
            tracing::info!(request_id = %id, tx_hash = %outcome.tx_hash, "Retrying status update for minted request");
            return Ok(self.settle(id, outcome).await);
        }

        let owner = match self.mirror.user_by_id(request.user_id).await? {
            Some(user) => user.wallet_address,
            None => request.wallet_address,
        };
        let mint = MintRequest {
            owner,
            name: request.display_name.clone(),
            symbol: request.symbol.clone(),
            valuation: request
                .valuation
                .to_u64()
                .ok_or_else(|| CoreError::Internal(format!("stored valuation {} out of range", request.valuation)))?,
            token_supply: u64::try_from(request.token_supply)
                .map_err(|_| CoreError::Internal("stored token supply is negative".into()))?,
            metadata_cid: request.metadata_cid.clone(),
        };

        let outcome = self.coordinator.mint(&mint, cancel).await?;
        Ok(self.settle(id, outcome).await)
    }

    /// Move a request with a mined mint out of `pending`.
    async fn settle(&self, id: Uuid, outcome: MintOutcome) -> RequestApproved {
        let transition = RequestTransition::Approve {
            property_id: outcome.property_id,
            tx_hash: outcome.tx_hash.clone(),
        };
        let marked = match self.mirror.transition_upload_request(id, &transition).await {
            Ok(true) => Ok(()),
            Ok(false) => Err("request left pending state during approval".to_string()),
            Err(e) => Err(e.to_string()),
        };

        let (status, warning) = match marked {
            Ok(()) => {
                self.minted.remove(&id);
                tracing::info!(request_id = %id, tx_hash = %outcome.tx_hash, "Upload request approved");
                ("success", outcome.warning.clone())
            }
            Err(reason) => {
                self.minted.insert(id, outcome.clone());
                report_hazard(
                    Hazard::RequestStatusStale,
                    &outcome.tx_hash,
                    &format!("request {} still pending: {}", id, reason),
                );
                ("partial_success", Some(reason))
            }
        };

        RequestApproved {
            status,
            request_id: id,
            property_id: outcome.property_id,
            tx_hash: outcome.tx_hash,
            asset_address: outcome.asset,
            token_address: outcome.token,
            warning,
        }
    }

    #[tracing::instrument(skip(self, auth), fields(admin = %auth.user_id))]
    pub async fn reject(&self, auth: &RequestAuth, id: Uuid, reason: String) -> CoreResult<RequestRejected> {
        auth.require_admin()?;
        let _claim = self.claim(id)?;
        if let Some(outcome) = self.minted.get(&id) {
            return Err(CoreError::StateConflict(format!(
                "request {} was minted in {} and cannot be rejected",
                id,
                outcome.tx_hash
            )));
        }

        let transition = RequestTransition::Reject { reason };
        if !self.mirror.transition_upload_request(id, &transition).await? {
            let request = self.load(id).await?;
            return Err(CoreError::StateConflict(format!(
                "request {} is already {}",
                id, request.status
            )));
        }

        tracing::info!(request_id = %id, "Upload request rejected");
        Ok(RequestRejected { status: "success", request_id: id })
    }
}
