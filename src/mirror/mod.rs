//! Mirror store subsystem.
//!
//! # Data Flow
//! ```text
//! write path (coordinator, workflow, submitters) ─┐
//!                                                  ├→ store.rs (MirrorStore trait)
//! reconcile path (ingestor) ───────────────────────┘      ├→ postgres.rs (sqlx, production)
//!                                                         └→ memory.rs (DashMap, tests/local)
//! ```
//!
//! # Design Decisions
//! - Property rows are deduplicated on `asset_contract_address`; both writers
//!   go through the same conflict-tolerant insert
//! - Revenue rows are deduplicated on `(deposit_tx_hash, snapshot_id)`
//! - Upload-request transitions are conditional on `status = 'pending'`

pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use memory::MemoryMirror;
pub use models::{
    ApprovalStatus, DocumentType, Property, PropertyDocument, PropertyStatus, RequestStatus,
    RequestTransition, RevenueDistribution, Role, UploadRequest, UploadRequestDocument, User,
};
pub use postgres::PgMirror;
pub use store::{MirrorError, MirrorResult, MirrorStore};
