//! Mirror entities.
//!
//! Every entity carries a locally generated UUID distinct from any on-chain
//! identifier. Addresses are held as [`WalletAddress`] so equality is
//! byte-wise and the stored form is always canonical lowercase hex.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::blockchain::types::WalletAddress;

/// Declares a string-backed enum with a fixed wire/storage spelling.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("unknown {} '{}'", stringify!($name), other)),
                }
            }
        }
    };
}

text_enum!(Role {
    Admin => "admin",
    User => "user",
});

text_enum!(
    /// Mirror-side approval status of a user.
    ApprovalStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
);

text_enum!(PropertyStatus {
    Active => "Active",
    Paused => "Paused",
    Disputed => "Disputed",
    Closed => "Closed",
});

text_enum!(
    /// Upload-request state. `Approved` and `Rejected` are terminal.
    RequestStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
);

text_enum!(DocumentType {
    Deed => "Deed",
    InspectionReport => "Inspection Report",
    ValuationReport => "Valuation Report",
    Photo => "Photo",
    LegalContract => "Legal Contract",
    GeneralDocument => "General Document",
});

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub wallet_address: WalletAddress,
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub password_digest: String,
    pub role: Role,
    pub approval_status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Property {
    pub id: Uuid,
    pub display_name: String,
    pub asset_contract_address: WalletAddress,
    pub token_contract_address: WalletAddress,
    pub owner_wallet: WalletAddress,
    pub metadata_cid: String,
    pub valuation: BigDecimal,
    pub status: PropertyStatus,
    pub creation_tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertyDocument {
    pub id: Uuid,
    pub property_id: Uuid,
    pub file_url: String,
    pub file_cid: String,
    pub name: String,
    pub type_tag: DocumentType,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub wallet_address: WalletAddress,
    pub display_name: String,
    pub symbol: String,
    pub valuation: BigDecimal,
    pub token_supply: i64,
    pub metadata_cid: String,
    pub status: RequestStatus,
    pub rejection_reason: Option<String>,
    /// Set when the request is approved and the property row exists.
    pub property_id: Option<Uuid>,
    /// Mint transaction of an approved request.
    pub approval_tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadRequestDocument {
    pub id: Uuid,
    pub request_id: Uuid,
    pub file_url: String,
    pub file_cid: String,
    pub name: String,
    pub type_tag: DocumentType,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueDistribution {
    pub id: Uuid,
    pub property_id: Uuid,
    pub snapshot_id: i64,
    /// Exact ledger integer rendered as a decimal string.
    pub total_amount: String,
    pub deposit_tx_hash: String,
    pub created_at: DateTime<Utc>,
}

/// The only two ways out of `pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestTransition {
    /// `property_id` is absent when the mint succeeded but its row was not
    /// written; the ingestor materializes it from `tx_hash`.
    Approve { property_id: Option<Uuid>, tx_hash: String },
    Reject { reason: String },
}

impl RequestTransition {
    pub fn target(&self) -> RequestStatus {
        match self {
            RequestTransition::Approve { .. } => RequestStatus::Approved,
            RequestTransition::Reject { .. } => RequestStatus::Rejected,
        }
    }
}
