//! Thin ledger write paths.
//!
//! # Design Decisions
//! - Writes that gate a mirror change wait for mining; a failed receipt never
//!   changes the mirror
//! - Deposits and transfers do not wait; their effects arrive through events

pub mod approval;
pub mod revenue;

pub use approval::{ApprovalRecorded, ApprovalSubmitter, PropertyStatusChanged, UserApproved};
pub use revenue::{Balance, Pending, RevenueSubmitter};
