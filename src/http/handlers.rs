//! Public and user-authenticated handlers.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

use crate::accounts::{Credentials, Message, PasswordChange, Registration, Session};
use crate::auth::RequestAuth;
use crate::blockchain::types::WalletAddress;
use crate::error::{CoreError, CoreResult};
use crate::http::extract::{single_file, JsonBody, PathParam, PropertyForm};
use crate::http::server::AppState;
use crate::mirror::models::{Property, RevenueDistribution, UploadRequest, User};
use crate::properties::{pin_files, PropertyDetail};
use crate::submitters::Balance;
use crate::upload_requests::{RequestDetail, RequestSubmitted};

const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    /// Latest block, or null when the RPC is unreachable.
    pub ledger_head: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct PinnedFile {
    pub ipfs_hash: String,
    pub url: String,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    let ledger_head = match tokio::time::timeout(HEALTH_PROBE_TIMEOUT, state.ledger.head_block()).await {
        Ok(Ok(head)) => Some(head),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Ledger head probe failed");
            None
        }
        Err(_) => None,
    };
    let status = if state.shutdown.is_triggered() { "draining" } else { "ok" };
    Json(HealthStatus { status, ledger_head })
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(registration): JsonBody<Registration>,
) -> CoreResult<(StatusCode, Json<Message>)> {
    let message = state.accounts.register(registration).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(credentials): JsonBody<Credentials>,
) -> CoreResult<Json<Session>> {
    Ok(Json(state.accounts.login(credentials).await?))
}

pub async fn me(State(state): State<AppState>, auth: RequestAuth) -> CoreResult<Json<User>> {
    Ok(Json(state.accounts.me(&auth).await?))
}

pub async fn change_password(
    State(state): State<AppState>,
    auth: RequestAuth,
    JsonBody(change): JsonBody<PasswordChange>,
) -> CoreResult<Json<Message>> {
    Ok(Json(state.accounts.change_password(&auth, change).await?))
}

pub async fn list_properties(State(state): State<AppState>) -> CoreResult<Json<Vec<Property>>> {
    Ok(Json(state.reader.list().await?))
}

pub async fn get_property(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> CoreResult<Json<PropertyDetail>> {
    Ok(Json(state.reader.detail(id).await?))
}

pub async fn property_metadata(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> CoreResult<Json<Value>> {
    Ok(Json(state.reader.metadata(id).await?))
}

pub async fn property_revenue(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> CoreResult<Json<Vec<RevenueDistribution>>> {
    Ok(Json(state.reader.revenue(id).await?))
}

pub async fn token_balance(
    State(state): State<AppState>,
    PathParam((id, wallet)): PathParam<(Uuid, String)>,
) -> CoreResult<Json<Balance>> {
    let holder: WalletAddress = wallet.parse()?;
    Ok(Json(state.revenue.balance(id, holder).await?))
}

/// Pin one file outside of any property workflow.
pub async fn upload_file(
    State(state): State<AppState>,
    auth: RequestAuth,
    multipart: Multipart,
) -> CoreResult<Json<PinnedFile>> {
    let file = single_file(multipart).await?;
    let document = pin_files(state.pins.as_ref(), vec![file])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| CoreError::Internal("no document pinned".into()))?;
    tracing::info!(user_id = %auth.user_id, cid = %document.cid, "File pinned");
    Ok(Json(PinnedFile {
        ipfs_hash: document.cid,
        url: document.url,
    }))
}

pub async fn submit_upload_request(
    State(state): State<AppState>,
    auth: RequestAuth,
    multipart: Multipart,
) -> CoreResult<(StatusCode, Json<RequestSubmitted>)> {
    let form = PropertyForm::parse(multipart).await?;
    let submitted = state.requests.submit(&auth, form.draft, form.files).await?;
    Ok((StatusCode::CREATED, Json(submitted)))
}

pub async fn list_upload_requests(
    State(state): State<AppState>,
    auth: RequestAuth,
) -> CoreResult<Json<Vec<UploadRequest>>> {
    Ok(Json(state.requests.list(&auth).await?))
}

pub async fn get_upload_request(
    State(state): State<AppState>,
    auth: RequestAuth,
    PathParam(id): PathParam<Uuid>,
) -> CoreResult<Json<RequestDetail>> {
    Ok(Json(state.requests.get(&auth, id).await?))
}
