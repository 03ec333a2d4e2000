//! In-process mirror for tests and local runs without Postgres.
//!
//! Unique keys are enforced through secondary `DashMap` indexes claimed with
//! the entry API, so concurrent inserts for the same asset address or
//! deposit cannot both win.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::blockchain::types::WalletAddress;
use crate::mirror::models::{
    ApprovalStatus, Property, PropertyDocument, PropertyStatus, RequestStatus, RequestTransition,
    RevenueDistribution, UploadRequest, UploadRequestDocument, User,
};
use crate::mirror::store::{MirrorError, MirrorResult, MirrorStore};

#[derive(Default)]
pub struct MemoryMirror {
    users: DashMap<Uuid, User>,
    users_by_wallet: DashMap<WalletAddress, Uuid>,
    users_by_email: DashMap<String, Uuid>,
    properties: DashMap<Uuid, Property>,
    properties_by_asset: DashMap<WalletAddress, Uuid>,
    property_documents: DashMap<Uuid, PropertyDocument>,
    requests: DashMap<Uuid, UploadRequest>,
    request_documents: DashMap<Uuid, UploadRequestDocument>,
    revenue: DashMap<Uuid, RevenueDistribution>,
    revenue_keys: DashMap<(String, i64), Uuid>,
}

impl MemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    pub fn revenue_count(&self) -> usize {
        self.revenue.len()
    }

    pub fn document_count(&self) -> usize {
        self.property_documents.len()
    }
}

fn sorted_by<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by_key(|item| key(item));
    items
}

#[async_trait]
impl MirrorStore for MemoryMirror {
    async fn insert_user(&self, user: &User) -> MirrorResult<()> {
        let email = user.email.to_lowercase();
        match self.users_by_wallet.entry(user.wallet_address) {
            Entry::Occupied(_) => return Err(MirrorError::Duplicate("user")),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
            }
        }
        match self.users_by_email.entry(email) {
            Entry::Occupied(_) => {
                self.users_by_wallet.remove(&user.wallet_address);
                return Err(MirrorError::Duplicate("user"));
            }
            Entry::Vacant(slot) => {
                slot.insert(user.id);
            }
        }
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn user_by_id(&self, id: Uuid) -> MirrorResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn user_by_email(&self, email: &str) -> MirrorResult<Option<User>> {
        let id = self.users_by_email.get(&email.to_lowercase()).map(|id| *id);
        Ok(id.and_then(|id| self.users.get(&id).map(|u| u.clone())))
    }

    async fn user_by_wallet(&self, wallet: &WalletAddress) -> MirrorResult<Option<User>> {
        let id = self.users_by_wallet.get(wallet).map(|id| *id);
        Ok(id.and_then(|id| self.users.get(&id).map(|u| u.clone())))
    }

    async fn set_user_approval(&self, wallet: &WalletAddress, status: ApprovalStatus) -> MirrorResult<bool> {
        let Some(id) = self.users_by_wallet.get(wallet).map(|id| *id) else {
            return Ok(false);
        };
        Ok(match self.users.get_mut(&id) {
            Some(mut user) => {
                user.approval_status = status;
                user.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn set_password_digest(&self, id: Uuid, digest: &str) -> MirrorResult<bool> {
        Ok(match self.users.get_mut(&id) {
            Some(mut user) => {
                user.password_digest = digest.to_string();
                user.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn delete_user(&self, id: Uuid) -> MirrorResult<bool> {
        match self.users.remove(&id) {
            Some((_, user)) => {
                self.users_by_wallet.remove(&user.wallet_address);
                self.users_by_email.remove(&user.email.to_lowercase());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_property(&self, property: &Property) -> MirrorResult<bool> {
        match self.properties_by_asset.entry(property.asset_contract_address) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                self.properties.insert(property.id, property.clone());
                slot.insert(property.id);
                Ok(true)
            }
        }
    }

    async fn backfill_display_name(&self, asset: &WalletAddress, name: &str) -> MirrorResult<bool> {
        let Some(id) = self.properties_by_asset.get(asset).map(|id| *id) else {
            return Ok(false);
        };
        Ok(match self.properties.get_mut(&id) {
            Some(mut property) if property.display_name.is_empty() => {
                property.display_name = name.to_string();
                true
            }
            _ => false,
        })
    }

    async fn property_by_id(&self, id: Uuid) -> MirrorResult<Option<Property>> {
        Ok(self.properties.get(&id).map(|p| p.clone()))
    }

    async fn property_by_asset(&self, asset: &WalletAddress) -> MirrorResult<Option<Property>> {
        let id = self.properties_by_asset.get(asset).map(|id| *id);
        Ok(id.and_then(|id| self.properties.get(&id).map(|p| p.clone())))
    }

    async fn property_by_token(&self, token: &WalletAddress) -> MirrorResult<Option<Property>> {
        Ok(self
            .properties
            .iter()
            .find(|p| p.token_contract_address == *token)
            .map(|p| p.clone()))
    }

    async fn list_properties(&self) -> MirrorResult<Vec<Property>> {
        let all = self.properties.iter().map(|p| p.clone()).collect();
        Ok(sorted_by(all, |p: &Property| std::cmp::Reverse(p.created_at)))
    }

    async fn set_property_status(&self, id: Uuid, status: PropertyStatus) -> MirrorResult<bool> {
        Ok(match self.properties.get_mut(&id) {
            Some(mut property) => {
                property.status = status;
                true
            }
            None => false,
        })
    }

    async fn insert_property_document(&self, document: &PropertyDocument) -> MirrorResult<()> {
        if !self.properties.contains_key(&document.property_id) {
            return Err(MirrorError::Corrupt(format!(
                "property {} does not exist",
                document.property_id
            )));
        }
        self.property_documents.insert(document.id, document.clone());
        Ok(())
    }

    async fn property_documents(&self, property_id: Uuid) -> MirrorResult<Vec<PropertyDocument>> {
        let docs = self
            .property_documents
            .iter()
            .filter(|d| d.property_id == property_id)
            .map(|d| d.clone())
            .collect();
        Ok(sorted_by(docs, |d: &PropertyDocument| d.uploaded_at))
    }

    async fn insert_upload_request(&self, request: &UploadRequest) -> MirrorResult<()> {
        self.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn insert_request_document(&self, document: &UploadRequestDocument) -> MirrorResult<()> {
        if !self.requests.contains_key(&document.request_id) {
            return Err(MirrorError::Corrupt(format!(
                "request {} does not exist",
                document.request_id
            )));
        }
        self.request_documents.insert(document.id, document.clone());
        Ok(())
    }

    async fn upload_request(&self, id: Uuid) -> MirrorResult<Option<UploadRequest>> {
        Ok(self.requests.get(&id).map(|r| r.clone()))
    }

    async fn request_documents(&self, request_id: Uuid) -> MirrorResult<Vec<UploadRequestDocument>> {
        let docs = self
            .request_documents
            .iter()
            .filter(|d| d.request_id == request_id)
            .map(|d| d.clone())
            .collect();
        Ok(sorted_by(docs, |d: &UploadRequestDocument| d.uploaded_at))
    }

    async fn list_upload_requests(&self, wallet: Option<&WalletAddress>) -> MirrorResult<Vec<UploadRequest>> {
        let requests = self
            .requests
            .iter()
            .filter(|r| wallet.map_or(true, |w| r.wallet_address == *w))
            .map(|r| r.clone())
            .collect();
        Ok(sorted_by(requests, |r: &UploadRequest| std::cmp::Reverse(r.created_at)))
    }

    async fn transition_upload_request(&self, id: Uuid, transition: &RequestTransition) -> MirrorResult<bool> {
        let Some(mut request) = self.requests.get_mut(&id) else {
            return Ok(false);
        };
        if request.status != RequestStatus::Pending {
            return Ok(false);
        }
        request.status = transition.target();
        match transition {
            RequestTransition::Approve { property_id, tx_hash } => {
                request.property_id = *property_id;
                request.approval_tx_hash = Some(tx_hash.clone());
            }
            RequestTransition::Reject { reason } => request.rejection_reason = Some(reason.clone()),
        }
        request.updated_at = Utc::now();
        Ok(true)
    }

    async fn insert_revenue_distribution(&self, distribution: &RevenueDistribution) -> MirrorResult<bool> {
        let key = (distribution.deposit_tx_hash.clone(), distribution.snapshot_id);
        match self.revenue_keys.entry(key) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                self.revenue.insert(distribution.id, distribution.clone());
                slot.insert(distribution.id);
                Ok(true)
            }
        }
    }

    async fn revenue_for_property(&self, property_id: Uuid) -> MirrorResult<Vec<RevenueDistribution>> {
        let rows = self
            .revenue
            .iter()
            .filter(|r| r.property_id == property_id)
            .map(|r| r.clone())
            .collect();
        Ok(sorted_by(rows, |r: &RevenueDistribution| r.created_at))
    }
}
