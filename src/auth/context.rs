//! Authenticated caller identity.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::blockchain::types::WalletAddress;
use crate::error::CoreError;
use crate::mirror::models::Role;

/// Produced by the auth middleware and passed explicitly to every core entry
/// point that makes an authorization decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestAuth {
    pub user_id: Uuid,
    pub wallet: WalletAddress,
    pub role: Role,
}

impl RequestAuth {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), CoreError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(CoreError::Forbidden("admin role required".into()))
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestAuth {
    type Rejection = CoreError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestAuth>()
            .cloned()
            .ok_or_else(|| CoreError::Unauthorized("authentication required".into()))
    }
}
