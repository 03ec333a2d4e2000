//! Revenue deposits, token transfers, and balance reads.
//!
//! Deposits and transfers return as soon as the transaction is accepted. The
//! ingestor records the resulting distribution when the deposit event arrives.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::blockchain::types::WalletAddress;
use crate::blockchain::units::{from_base_units, parse_integer, to_base_units};
use crate::blockchain::Ledger;
use crate::error::{CoreError, CoreResult};
use crate::mirror::models::Property;
use crate::mirror::MirrorStore;

#[derive(Debug, Clone, Serialize)]
pub struct Pending {
    pub status: &'static str,
    pub tx_hash: String,
}

impl Pending {
    fn new(tx_hash: String) -> Self {
        Self { status: "pending", tx_hash }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Balance {
    /// Whole units with 18 fractional digits.
    pub balance: String,
}

pub struct RevenueSubmitter {
    ledger: Arc<dyn Ledger>,
    mirror: Arc<dyn MirrorStore>,
}

impl RevenueSubmitter {
    pub fn new(ledger: Arc<dyn Ledger>, mirror: Arc<dyn MirrorStore>) -> Self {
        Self { ledger, mirror }
    }

    async fn property(&self, id: Uuid) -> CoreResult<Property> {
        self.mirror
            .property_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("property {} not found", id)))
    }

    /// `amount` is an integer in the stablecoin's own base units.
    #[tracing::instrument(skip(self))]
    pub async fn distribute(
        &self,
        token: WalletAddress,
        stablecoin: WalletAddress,
        amount: &str,
    ) -> CoreResult<Pending> {
        let amount = parse_integer(amount)?;
        if amount.is_zero() {
            return Err(CoreError::BadRequest("amount must be greater than zero".into()));
        }
        let submitted = self
            .ledger
            .deposit_revenue(token.address(), stablecoin.address(), amount)
            .await?;
        tracing::info!(tx_hash = %submitted.hash, token = %token, amount = %amount, "Revenue deposit submitted");
        Ok(Pending::new(submitted.hash_hex()))
    }

    /// `amount` is a decimal string of whole tokens.
    #[tracing::instrument(skip(self))]
    pub async fn transfer(&self, property_id: Uuid, to: WalletAddress, amount: &str) -> CoreResult<Pending> {
        let base_units = to_base_units(amount)?;
        if base_units.is_zero() {
            return Err(CoreError::BadRequest("amount must be greater than zero".into()));
        }
        let property = self.property(property_id).await?;
        let submitted = self
            .ledger
            .transfer_tokens(property.token_contract_address.address(), to.address(), base_units)
            .await?;
        tracing::info!(tx_hash = %submitted.hash, to = %to, base_units = %base_units, "Token transfer submitted");
        Ok(Pending::new(submitted.hash_hex()))
    }

    pub async fn balance(&self, property_id: Uuid, holder: WalletAddress) -> CoreResult<Balance> {
        let property = self.property(property_id).await?;
        let raw = self
            .ledger
            .token_balance(property.token_contract_address.address(), holder.address())
            .await?;
        Ok(Balance { balance: from_base_units(raw) })
    }
}
