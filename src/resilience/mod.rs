//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Subscription dropped:
//!     → backoff.rs (ResubscribePolicy: jittered, growing delay)
//!     → resubscribe, or give up once the failure cap is reached
//! Mirror write failed during ingestion:
//!     → backoff.rs (short bounded retries)
//! ```
//!
//! # Design Decisions
//! - Timeouts live next to each external client (RPC, pin store, HTTP)
//! - Retries only where the operation is idempotent

pub mod backoff;

pub use backoff::{calculate_backoff, ResubscribePolicy};
