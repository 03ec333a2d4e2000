//! Content-addressed pin store.
//!
//! # Data Flow
//! ```text
//! file bytes + name
//!     → client.rs (multipart upload, fresh connection, 120s cap)
//!     → CID (opaque, non-empty)
//!     → gateway URL for documents and metadata fetch
//! ```

pub mod client;
pub mod store;

pub use client::PinataClient;
pub use store::{PinError, PinStore};
