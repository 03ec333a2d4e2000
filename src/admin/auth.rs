use axum::{body::Body, http::Request, middleware::Next, response::Response};

use crate::auth::RequestAuth;
use crate::error::CoreError;

/// Reject non-admin callers. Runs after the bearer-token middleware.
pub async fn admin_auth_middleware(
    auth: RequestAuth,
    request: Request<Body>,
    next: Next,
) -> Result<Response, CoreError> {
    if let Err(e) = auth.require_admin() {
        tracing::warn!(user_id = %auth.user_id, path = %request.uri().path(), "Admin route refused");
        return Err(e);
    }
    Ok(next.run(request).await)
}
