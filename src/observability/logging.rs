//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Tag reconciliation hazards with a stable field for alerting
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - RUST_LOG wins over the configured level

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

use crate::config::ObservabilityConfig;

/// Install the global subscriber.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "estate_coordinator={level},tower_http={level}",
            level = config.log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.log_format == "json" {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    }
}

/// A divergence between ledger and mirror that needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hazard {
    /// Mined property without a mirror row; the ingestor will materialize it.
    PropertyMirrorMissing,
    /// Property created for an upload request still marked pending.
    RequestStatusStale,
    /// Document row could not be linked to its property or request.
    DocumentLinkLost,
    /// Mined status change not reflected in the mirror.
    StatusMirrorStale,
    /// Mined user approval not reflected in the mirror.
    UserApprovalStale,
}

impl Hazard {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hazard::PropertyMirrorMissing => "property_mirror_missing",
            Hazard::RequestStatusStale => "request_status_stale",
            Hazard::DocumentLinkLost => "document_link_lost",
            Hazard::StatusMirrorStale => "status_mirror_stale",
            Hazard::UserApprovalStale => "user_approval_stale",
        }
    }
}

/// Log a hazard at error level and count it.
pub fn report_hazard(hazard: Hazard, tx_hash: &str, detail: &str) {
    tracing::error!(
        hazard = hazard.as_str(),
        tx_hash = %tx_hash,
        detail = %detail,
        "Reconciliation hazard"
    );
    crate::observability::metrics::record_hazard(hazard.as_str());
}
