//! Estate coordinator library.
//!
//! Reconciles a tokenized real-estate ledger with its relational mirror: the
//! write path submits transactions and records the results, the ingestor
//! replays ledger events into the same rows.

// Core subsystems
pub mod blockchain;
pub mod mirror;
pub mod pinning;

// Workflows
pub mod ingestor;
pub mod properties;
pub mod submitters;
pub mod upload_requests;

// Surface
pub mod accounts;
pub mod admin;
pub mod auth;
pub mod http;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::AppConfig;
pub use error::{CoreError, CoreResult};
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
