//! Caller identity and authorization.
//!
//! # Data Flow
//! ```text
//! Authorization: Bearer <jwt>
//!     → middleware.rs (verify, attach RequestAuth)
//!     → handlers extract RequestAuth and pass it to core entry points
//!     → policy.rs (admin vs self, pure function)
//! ```

pub mod context;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod policy;

pub use context::RequestAuth;
pub use jwt::{AuthError, Claims, TokenIssuer};
pub use middleware::require_auth;
pub use policy::{authorize, ensure_access, listing_scope};
