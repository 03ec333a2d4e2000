//! Property creation.
//!
//! # Data Flow
//! ```text
//! files + draft
//!     → documents.rs (stored names, type tags, pinning)
//!     → validation.rs (draft rules)
//!     → coordinator.rs (submit, wait, mirror row, document links)
//!
//! property id
//!     → reads.rs (mirror rows, metadata through the pin gateway)
//! ```

pub mod coordinator;
pub mod documents;
pub mod reads;
pub mod validation;

pub use coordinator::{property_from_event, MintOutcome, MintRequest, PropertyCoordinator, PropertyCreated};
pub use documents::{infer_document_type, pin_files, PinnedDocument, UploadedFile};
pub use reads::{PropertyDetail, PropertyReader};
pub use validation::{DraftValidator, PropertyDraft};
