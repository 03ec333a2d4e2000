//! Upload-request workflow.
//!
//! ```text
//!            submit
//! user   ─────────────►  pending
//!                          │
//!                 approve  │  reject
//!                  ┌───────┴───────┐
//!                  ▼               ▼
//!               approved        rejected
//! ```

pub mod workflow;

pub use workflow::{
    RequestApproved, RequestDetail, RequestRejected, RequestSubmitted, UploadRequestWorkflow,
};
