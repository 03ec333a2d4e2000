//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request ID, trace, timeout, panic recovery, metrics)
//!     → auth middleware (bearer token → RequestAuth) on protected routes
//!     → extract.rs (JSON bodies, multipart forms)
//!     → handlers.rs / admin handlers (core entry points)
//!     → CoreError or JSON response
//! ```

pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod server;

pub use server::{build_router, AppState, HttpServer, UploadLimits};
