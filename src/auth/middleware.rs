//! Bearer-token middleware.
//! Resolves the caller and attaches a [`RequestAuth`] to the request.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::auth::jwt::{AuthError, TokenIssuer};
use crate::error::CoreError;

pub async fn require_auth(
    State(issuer): State<Arc<TokenIssuer>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, CoreError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;

    let auth = issuer.verify(token)?;
    tracing::debug!(user_id = %auth.user_id, role = %auth.role, "Request authenticated");
    req.extensions_mut().insert(auth);
    Ok(next.run(req).await)
}
