//! Event to mirror-row materialization.
//!
//! Handlers never fail the stream. A write error is retried a few times and
//! then reported as a reconciliation hazard, since the event will not be
//! delivered again on this subscription.

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

use crate::blockchain::types::{tx_hash_hex, PropertyRegisteredEvent, RevenueDepositedEvent, WalletAddress};
use crate::mirror::models::RevenueDistribution;
use crate::mirror::{MirrorError, MirrorStore};
use crate::observability::{report_hazard, Hazard};
use crate::properties::property_from_event;
use crate::resilience::calculate_backoff;

const WRITE_ATTEMPTS: u32 = 3;
const WRITE_RETRY_BASE_MS: u64 = 200;
const WRITE_RETRY_MAX_MS: u64 = 2_000;

/// What happened to one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Inserted,
    /// A row for this event already existed.
    Duplicate,
    Skipped(&'static str),
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Inserted => "inserted",
            Outcome::Duplicate => "duplicate",
            Outcome::Skipped(_) => "skipped",
            Outcome::Failed => "failed",
        }
    }
}

pub struct EventHandlers {
    mirror: Arc<dyn MirrorStore>,
}

impl EventHandlers {
    pub fn new(mirror: Arc<dyn MirrorStore>) -> Self {
        Self { mirror }
    }

    /// Insert the property row unless one already exists for the asset.
    pub async fn property_registered(&self, event: PropertyRegisteredEvent) -> Outcome {
        let tx_hash = event.tx_hash.as_ref().map(tx_hash_hex);
        let property = property_from_event(&event, "", tx_hash.clone());

        match with_retries(|| self.mirror.insert_property(&property)).await {
            Ok(true) => {
                tracing::info!(
                    asset = %property.asset_contract_address,
                    token = %property.token_contract_address,
                    block = ?event.block_number,
                    "Property materialized from event"
                );
                Outcome::Inserted
            }
            Ok(false) => {
                tracing::debug!(asset = %property.asset_contract_address, "Property already mirrored");
                Outcome::Duplicate
            }
            Err(e) => {
                report_hazard(
                    Hazard::PropertyMirrorMissing,
                    tx_hash.as_deref().unwrap_or("unknown"),
                    &e.to_string(),
                );
                Outcome::Failed
            }
        }
    }

    /// Record a distribution for the property that owns the deposited token.
    pub async fn revenue_deposited(&self, event: RevenueDepositedEvent) -> Outcome {
        let token = WalletAddress::from(event.token);

        let Some(tx_hash) = event.tx_hash.as_ref().map(tx_hash_hex) else {
            tracing::warn!(token = %token, "Revenue event without transaction hash, skipping");
            return Outcome::Skipped("missing_tx_hash");
        };

        let snapshot_id = match i64::try_from(event.snapshot_id) {
            Ok(id) => id,
            Err(_) => {
                tracing::error!(
                    tx_hash = %tx_hash,
                    snapshot_id = %event.snapshot_id,
                    "Snapshot id out of range, skipping"
                );
                return Outcome::Skipped("snapshot_out_of_range");
            }
        };

        let property = match with_retries(|| self.mirror.property_by_token(&token)).await {
            Ok(Some(property)) => property,
            Ok(None) => {
                tracing::warn!(token = %token, tx_hash = %tx_hash, "Revenue for unknown token, skipping");
                return Outcome::Skipped("unknown_token");
            }
            Err(e) => {
                tracing::error!(token = %token, tx_hash = %tx_hash, error = %e, "Token lookup failed");
                return Outcome::Failed;
            }
        };

        let distribution = RevenueDistribution {
            id: Uuid::new_v4(),
            property_id: property.id,
            snapshot_id,
            total_amount: event.amount.to_string(),
            deposit_tx_hash: tx_hash.clone(),
            created_at: Utc::now(),
        };

        match with_retries(|| self.mirror.insert_revenue_distribution(&distribution)).await {
            Ok(true) => {
                tracing::info!(
                    property_id = %property.id,
                    snapshot_id,
                    amount = %distribution.total_amount,
                    tx_hash = %tx_hash,
                    "Revenue distribution recorded"
                );
                Outcome::Inserted
            }
            Ok(false) => Outcome::Duplicate,
            Err(e) => {
                tracing::error!(tx_hash = %tx_hash, error = %e, "Revenue distribution lost");
                Outcome::Failed
            }
        }
    }
}

async fn with_retries<T, F, Fut>(mut op: F) -> Result<T, MirrorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MirrorError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= WRITE_ATTEMPTS => return Err(e),
            Err(e) => {
                tracing::warn!(attempt, error = %e, "Mirror write failed, retrying");
                tokio::time::sleep(calculate_backoff(attempt, WRITE_RETRY_BASE_MS, WRITE_RETRY_MAX_MS)).await;
            }
        }
    }
}
