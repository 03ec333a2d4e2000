//! Read models over the mirror, plus metadata resolution through the pin gateway.

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::mirror::models::{Property, PropertyDocument, RevenueDistribution};
use crate::mirror::MirrorStore;
use crate::pinning::PinStore;

#[derive(Debug, Clone, Serialize)]
pub struct PropertyDetail {
    #[serde(flatten)]
    pub property: Property,
    pub documents: Vec<PropertyDocument>,
}

pub struct PropertyReader {
    mirror: Arc<dyn MirrorStore>,
    pins: Arc<dyn PinStore>,
}

impl PropertyReader {
    pub fn new(mirror: Arc<dyn MirrorStore>, pins: Arc<dyn PinStore>) -> Self {
        Self { mirror, pins }
    }

    async fn property(&self, id: Uuid) -> CoreResult<Property> {
        self.mirror
            .property_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("property {} not found", id)))
    }

    pub async fn list(&self) -> CoreResult<Vec<Property>> {
        Ok(self.mirror.list_properties().await?)
    }

    pub async fn detail(&self, id: Uuid) -> CoreResult<PropertyDetail> {
        let property = self.property(id).await?;
        let documents = self.mirror.property_documents(id).await?;
        Ok(PropertyDetail { property, documents })
    }

    pub async fn revenue(&self, id: Uuid) -> CoreResult<Vec<RevenueDistribution>> {
        self.property(id).await?;
        Ok(self.mirror.revenue_for_property(id).await?)
    }

    /// The pinned metadata document if it is JSON, otherwise a description
    /// assembled from the mirror.
    ///
    /// Properties created from uploads point `metadata_cid` at the first
    /// uploaded file, which is usually a PDF or image.
    pub async fn metadata(&self, id: Uuid) -> CoreResult<Value> {
        let property = self.property(id).await?;
        let metadata_url = self.pins.gateway_url(&property.metadata_cid);

        match self.pins.fetch(&property.metadata_cid).await {
            Ok(bytes) => {
                if let Ok(pinned) = serde_json::from_slice::<Value>(&bytes) {
                    if pinned.is_object() {
                        return Ok(pinned);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(property_id = %id, cid = %property.metadata_cid, error = %e, "Metadata fetch failed");
            }
        }

        let documents = self.mirror.property_documents(id).await?;
        Ok(json!({
            "name": property.display_name,
            "asset_contract_address": property.asset_contract_address,
            "token_contract_address": property.token_contract_address,
            "owner_wallet": property.owner_wallet,
            "valuation": property.valuation.to_string(),
            "status": property.status,
            "metadata_cid": property.metadata_cid,
            "metadata_url": metadata_url,
            "documents": documents
                .iter()
                .map(|d| json!({ "name": d.name, "type": d.type_tag, "cid": d.file_cid, "url": d.file_url }))
                .collect::<Vec<_>>(),
        }))
    }
}
