//! User approval and property status write paths.

use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::blockchain::types::WalletAddress;
use crate::blockchain::Ledger;
use crate::error::{CoreError, CoreResult};
use crate::mirror::models::{ApprovalStatus, PropertyStatus};
use crate::mirror::MirrorStore;
use crate::observability::{report_hazard, Hazard};

#[derive(Debug, Clone, Serialize)]
pub struct UserApproved {
    pub status: &'static str,
    pub tx_hash: String,
    /// What the approval registry reports after mining; `None` if the read failed.
    pub approved: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApprovalRecorded {
    pub status: &'static str,
    pub wallet_address: WalletAddress,
    pub approval_status: ApprovalStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertyStatusChanged {
    pub status: &'static str,
    pub tx_hash: String,
    pub property_id: Uuid,
    pub property_status: PropertyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub struct ApprovalSubmitter {
    ledger: Arc<dyn Ledger>,
    mirror: Arc<dyn MirrorStore>,
}

impl ApprovalSubmitter {
    pub fn new(ledger: Arc<dyn Ledger>, mirror: Arc<dyn MirrorStore>) -> Self {
        Self { ledger, mirror }
    }

    /// Approve a wallet on-chain, then mirror the approval.
    #[tracing::instrument(skip(self, cancel), fields(wallet = %wallet))]
    pub async fn approve_user(&self, wallet: WalletAddress, cancel: &CancellationToken) -> CoreResult<UserApproved> {
        if self.ledger.approval_contract().is_none() {
            return Err(CoreError::ServiceUnavailable("approval registry not initialized".into()));
        }

        let submitted = self.ledger.approve_user(wallet.address()).await?;
        let tx_hash = submitted.hash_hex();
        let receipt = self.ledger.wait_for_receipt(&submitted, cancel).await?;
        if !receipt.success {
            tracing::warn!(tx_hash = %tx_hash, "User approval reverted");
            return Err(CoreError::LedgerRejected { tx_hash });
        }

        // The mined receipt is authoritative from here on; nothing below fails the call.
        let mut warnings = Vec::new();
        let approved = match self.ledger.is_user_approved(wallet.address()).await {
            Ok(true) => Some(true),
            Ok(false) => {
                warnings.push("approval mined but the registry reports the wallet as unapproved".to_string());
                Some(false)
            }
            Err(e) => {
                warnings.push(format!("approval mined but the registry could not be read: {}", e));
                None
            }
        };
        for reason in &warnings {
            report_hazard(Hazard::UserApprovalStale, &tx_hash, reason);
        }

        match self.mirror.set_user_approval(&wallet, ApprovalStatus::Approved).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(tx_hash = %tx_hash, "Approved wallet has no mirror user")
            }
            Err(e) => {
                report_hazard(Hazard::UserApprovalStale, &tx_hash, &e.to_string());
                warnings.push(format!("user record not updated: {}", e));
            }
        }

        tracing::info!(tx_hash = %tx_hash, approved = ?approved, "User approved");
        let warning = (!warnings.is_empty()).then(|| warnings.join("; "));
        Ok(UserApproved { status: "success", tx_hash, approved, warning })
    }

    /// Mirror-only status write for a user.
    pub async fn record_user_approval(
        &self,
        wallet: WalletAddress,
        status: ApprovalStatus,
    ) -> CoreResult<ApprovalRecorded> {
        if !self.mirror.set_user_approval(&wallet, status).await? {
            return Err(CoreError::NotFound(format!("no user with wallet {}", wallet)));
        }
        tracing::info!(wallet = %wallet, status = %status, "User approval status recorded");
        Ok(ApprovalRecorded {
            status: "success",
            wallet_address: wallet,
            approval_status: status,
        })
    }

    /// Approve (`Active`) or reject (`Closed`) a property through the factory.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn set_property_status(
        &self,
        property_id: Uuid,
        approve: bool,
        cancel: &CancellationToken,
    ) -> CoreResult<PropertyStatusChanged> {
        let property = self
            .mirror
            .property_by_id(property_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("property {} not found", property_id)))?;
        let asset = property.asset_contract_address.address();

        let submitted = if approve {
            self.ledger.approve_property(asset).await?
        } else {
            self.ledger.reject_property(asset).await?
        };
        let tx_hash = submitted.hash_hex();
        let receipt = self.ledger.wait_for_receipt(&submitted, cancel).await?;
        if !receipt.success {
            return Err(CoreError::LedgerRejected { tx_hash });
        }

        let target = if approve { PropertyStatus::Active } else { PropertyStatus::Closed };
        let warning = match self.mirror.set_property_status(property_id, target).await {
            Ok(true) => None,
            Ok(false) => Some("property row disappeared before status update".to_string()),
            Err(e) => Some(e.to_string()),
        };
        if let Some(reason) = &warning {
            report_hazard(Hazard::StatusMirrorStale, &tx_hash, reason);
        }

        Ok(PropertyStatusChanged {
            status: "success",
            tx_hash,
            property_id,
            property_status: target,
            warning,
        })
    }
}
