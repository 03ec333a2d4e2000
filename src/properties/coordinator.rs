//! Property creation: pin → submit → wait → mirror → link documents.
//!
//! # Responsibilities
//! - Run the whole creation sequence for admin-created properties
//! - Expose the submit-and-materialize half for the upload-request workflow
//!
//! # Design Decisions
//! - The mirror row is only written after the receipt is mined successfully
//! - Mirror failures after a mined creation are downgraded to a warning; the
//!   ingestor re-materializes the row from the same event
//! - Both asset and token addresses come from the one `PropertyRegistered`
//!   log of this transaction's receipt

use alloy::primitives::U256;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::blockchain::transaction::registered_property;
use crate::blockchain::types::{CreatePropertyCall, PropertyRegisteredEvent, WalletAddress};
use crate::blockchain::units::{u256_to_decimal, whole_to_base_units};
use crate::blockchain::Ledger;
use crate::error::{CoreError, CoreResult};
use crate::mirror::models::{Property, PropertyDocument, PropertyStatus};
use crate::mirror::MirrorStore;
use crate::observability::{report_hazard, Hazard};
use crate::pinning::PinStore;
use crate::properties::documents::{pin_files, PinnedDocument, UploadedFile};
use crate::properties::validation::{DraftValidator, PropertyDraft};

/// What to put on-chain for one property.
#[derive(Debug, Clone)]
pub struct MintRequest {
    pub owner: WalletAddress,
    pub name: String,
    pub symbol: String,
    pub valuation: u64,
    pub token_supply: u64,
    pub metadata_cid: String,
}

impl MintRequest {
    fn to_call(&self) -> CreatePropertyCall {
        CreatePropertyCall {
            owner: self.owner.address(),
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            metadata_cid: self.metadata_cid.clone(),
            valuation: U256::from(self.valuation),
            supply_base_units: whole_to_base_units(self.token_supply),
            token_name: format!("{} Token", self.name),
            token_symbol: self.symbol.clone(),
        }
    }
}

/// Result of a mined creation transaction.
#[derive(Debug, Clone)]
pub struct MintOutcome {
    pub tx_hash: String,
    pub asset: WalletAddress,
    pub token: WalletAddress,
    /// Mirror row id; `None` when the mirror write failed.
    pub property_id: Option<Uuid>,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertyCreated {
    pub status: &'static str,
    pub tx_hash: String,
    pub property_id: Option<Uuid>,
    pub asset_address: WalletAddress,
    pub token_address: WalletAddress,
    pub files_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub struct PropertyCoordinator {
    ledger: Arc<dyn Ledger>,
    pins: Arc<dyn PinStore>,
    mirror: Arc<dyn MirrorStore>,
    validator: DraftValidator,
}

impl PropertyCoordinator {
    pub fn new(ledger: Arc<dyn Ledger>, pins: Arc<dyn PinStore>, mirror: Arc<dyn MirrorStore>) -> Self {
        Self {
            ledger,
            pins,
            mirror,
            validator: DraftValidator::standard(),
        }
    }

    pub fn validator(&self) -> &DraftValidator {
        &self.validator
    }

    /// Create a property from a draft and its files in one admin request.
    #[tracing::instrument(skip(self, draft, files, cancel), fields(symbol = %draft.symbol, files = files.len()))]
    pub async fn create(
        &self,
        owner: WalletAddress,
        draft: PropertyDraft,
        files: Vec<UploadedFile>,
        cancel: &CancellationToken,
    ) -> CoreResult<PropertyCreated> {
        if files.is_empty() {
            return Err(CoreError::BadRequest("at least one file is required".into()));
        }
        if owner.is_zero() {
            return Err(CoreError::BadRequest("owner wallet must not be the zero address".into()));
        }
        self.validator.check(&draft)?;

        let documents = pin_files(self.pins.as_ref(), files).await?;
        let metadata_cid = documents
            .first()
            .map(|d| d.cid.clone())
            .ok_or_else(|| CoreError::Internal("no document pinned".into()))?;

        let request = MintRequest {
            owner,
            name: draft.name,
            symbol: draft.symbol,
            valuation: draft.valuation,
            token_supply: draft.token_supply,
            metadata_cid,
        };
        let outcome = self.mint(&request, cancel).await?;

        if let Some(property_id) = outcome.property_id {
            self.link_documents(property_id, &outcome.tx_hash, &documents).await;
        }

        Ok(PropertyCreated {
            status: "success",
            tx_hash: outcome.tx_hash,
            property_id: outcome.property_id,
            asset_address: outcome.asset,
            token_address: outcome.token,
            files_count: documents.len(),
            warning: outcome.warning,
        })
    }

    /// Submit the creation transaction, wait for it, and write the mirror row.
    ///
    /// Errors are returned only up to and including the receipt; anything that
    /// fails afterwards is reported in [`MintOutcome::warning`].
    pub async fn mint(&self, request: &MintRequest, cancel: &CancellationToken) -> CoreResult<MintOutcome> {
        let submitted = self.ledger.create_property(request.to_call()).await?;
        let tx_hash = submitted.hash_hex();
        tracing::info!(tx_hash = %tx_hash, owner = %request.owner, "Property creation submitted");

        let receipt = self.ledger.wait_for_receipt(&submitted, cancel).await?;
        if !receipt.success {
            tracing::warn!(tx_hash = %tx_hash, "Property creation reverted");
            return Err(CoreError::LedgerRejected { tx_hash });
        }

        let Some(event) = registered_property(&receipt, self.ledger.factory_contract()) else {
            report_hazard(
                Hazard::PropertyMirrorMissing,
                &tx_hash,
                "receipt carries no PropertyRegistered log",
            );
            return Err(CoreError::Internal(format!(
                "transaction {} mined without a PropertyRegistered event",
                tx_hash
            )));
        };

        let asset = WalletAddress::from(event.asset);
        let token = WalletAddress::from(event.token);
        let property = property_from_event(&event, &request.name, Some(tx_hash.clone()));

        let (property_id, warning) = match self.materialize(&property).await {
            Ok(id) => (Some(id), None),
            Err(e) => {
                report_hazard(Hazard::PropertyMirrorMissing, &tx_hash, &e.to_string());
                (
                    None,
                    Some("property is on-chain; the mirror record will be created from the ledger event".to_string()),
                )
            }
        };

        tracing::info!(
            tx_hash = %tx_hash,
            asset = %asset,
            token = %token,
            property_id = ?property_id,
            "Property created"
        );

        Ok(MintOutcome { tx_hash, asset, token, property_id, warning })
    }

    /// Insert, or adopt the row the ingestor already wrote for this asset.
    async fn materialize(&self, property: &Property) -> CoreResult<Uuid> {
        if self.mirror.insert_property(property).await? {
            return Ok(property.id);
        }
        self.mirror
            .backfill_display_name(&property.asset_contract_address, &property.display_name)
            .await?;
        let existing = self
            .mirror
            .property_by_asset(&property.asset_contract_address)
            .await?
            .ok_or_else(|| CoreError::MirrorWrite("property row vanished after conflict".into()))?;
        tracing::debug!(asset = %property.asset_contract_address, property_id = %existing.id, "Adopted ingested property row");
        Ok(existing.id)
    }

    async fn link_documents(&self, property_id: Uuid, tx_hash: &str, documents: &[PinnedDocument]) {
        for doc in documents {
            let row = PropertyDocument {
                id: Uuid::new_v4(),
                property_id,
                file_url: doc.url.clone(),
                file_cid: doc.cid.clone(),
                name: doc.name.clone(),
                type_tag: doc.type_tag,
                uploaded_at: Utc::now(),
            };
            if let Err(e) = self.mirror.insert_property_document(&row).await {
                report_hazard(
                    Hazard::DocumentLinkLost,
                    tx_hash,
                    &format!("document {} ({}): {}", doc.name, doc.cid, e),
                );
            }
        }
    }
}

/// Build a mirror row from the on-chain event.
///
/// `display_name` is empty when the caller only knows the event.
pub fn property_from_event(event: &PropertyRegisteredEvent, display_name: &str, tx_hash: Option<String>) -> Property {
    Property {
        id: Uuid::new_v4(),
        display_name: display_name.to_string(),
        asset_contract_address: event.asset.into(),
        token_contract_address: event.token.into(),
        owner_wallet: event.owner.into(),
        metadata_cid: event.metadata_cid.clone(),
        valuation: u256_to_decimal(event.valuation),
        status: PropertyStatus::Active,
        creation_tx_hash: tx_hash,
        created_at: Utc::now(),
    }
}
