//! Admin API.
//!
//! Routes here sit behind two layers: bearer-token authentication, then the
//! admin role check. Core entry points re-check the role where they make an
//! authorization decision of their own.

pub mod auth;
pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, post, put},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::auth::require_auth;
use crate::http::server::AppState;

pub fn setup_admin_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/properties",
            post(create_property).layer(DefaultBodyLimit::max(state.limits.property_bytes)),
        )
        .route("/properties/{id}/approve", post(approve_property))
        .route("/properties/{id}/reject", post(reject_property))
        .route("/properties/{id}/transfer", post(transfer_tokens))
        .route("/approve-user", post(approve_user))
        .route("/users/{id}/approval", put(update_user_approval))
        .route("/users/{id}", delete(delete_user))
        .route("/revenue/distribute", post(distribute_revenue))
        .route("/property-upload-requests/{id}/approve", post(approve_upload_request))
        .route("/property-upload-requests/{id}/reject", post(reject_upload_request))
        .route_layer(middleware::from_fn(admin_auth_middleware))
        .route_layer(middleware::from_fn_with_state(state.issuer.clone(), require_auth))
}
