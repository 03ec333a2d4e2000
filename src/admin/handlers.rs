//! Admin-only handlers.
//!
//! Every handler that waits for mining holds a request-scoped cancellation
//! token, so a disconnected client or a shutdown stops the wait.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::accounts::Message;
use crate::auth::RequestAuth;
use crate::blockchain::types::WalletAddress;
use crate::error::CoreResult;
use crate::http::extract::{JsonBody, PathParam, PropertyForm};
use crate::http::server::AppState;
use crate::mirror::models::ApprovalStatus;
use crate::properties::PropertyCreated;
use crate::submitters::{ApprovalRecorded, Pending, PropertyStatusChanged, UserApproved};
use crate::upload_requests::{RequestApproved, RequestRejected};

#[derive(Debug, Deserialize)]
pub struct ApproveUserBody {
    pub wallet_address: String,
}

#[derive(Debug, Deserialize)]
pub struct ApprovalStatusBody {
    pub status: ApprovalStatus,
}

#[derive(Debug, Deserialize)]
pub struct DistributeBody {
    pub token_address: String,
    pub stablecoin_address: String,
    /// Integer in the stablecoin's base units.
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct TransferBody {
    pub to_address: String,
    /// Decimal whole tokens.
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
    #[serde(default)]
    pub reason: String,
}

pub async fn create_property(
    State(state): State<AppState>,
    auth: RequestAuth,
    multipart: Multipart,
) -> CoreResult<(StatusCode, Json<PropertyCreated>)> {
    let form = PropertyForm::parse(multipart).await?;
    let owner = match form.draft.owner_wallet.as_deref() {
        Some(raw) if !raw.trim().is_empty() => raw.parse::<WalletAddress>()?,
        _ => auth.wallet,
    };

    let (cancel, _guard) = state.request_scope();
    let created = state.coordinator.create(owner, form.draft, form.files, &cancel).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn approve_property(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> CoreResult<Json<PropertyStatusChanged>> {
    let (cancel, _guard) = state.request_scope();
    Ok(Json(state.approvals.set_property_status(id, true, &cancel).await?))
}

pub async fn reject_property(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> CoreResult<Json<PropertyStatusChanged>> {
    let (cancel, _guard) = state.request_scope();
    Ok(Json(state.approvals.set_property_status(id, false, &cancel).await?))
}

pub async fn transfer_tokens(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(body): JsonBody<TransferBody>,
) -> CoreResult<Json<Pending>> {
    let to: WalletAddress = body.to_address.parse()?;
    Ok(Json(state.revenue.transfer(id, to, &body.amount).await?))
}

pub async fn approve_user(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ApproveUserBody>,
) -> CoreResult<Json<UserApproved>> {
    let wallet: WalletAddress = body.wallet_address.parse()?;
    let (cancel, _guard) = state.request_scope();
    Ok(Json(state.approvals.approve_user(wallet, &cancel).await?))
}

pub async fn update_user_approval(
    State(state): State<AppState>,
    PathParam(wallet): PathParam<String>,
    JsonBody(body): JsonBody<ApprovalStatusBody>,
) -> CoreResult<Json<ApprovalRecorded>> {
    let wallet: WalletAddress = wallet.parse()?;
    Ok(Json(state.approvals.record_user_approval(wallet, body.status).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    auth: RequestAuth,
    PathParam(id): PathParam<Uuid>,
) -> CoreResult<Json<Message>> {
    Ok(Json(state.accounts.delete_user(&auth, id).await?))
}

pub async fn distribute_revenue(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<DistributeBody>,
) -> CoreResult<Json<Pending>> {
    let token: WalletAddress = body.token_address.parse()?;
    let stablecoin: WalletAddress = body.stablecoin_address.parse()?;
    Ok(Json(state.revenue.distribute(token, stablecoin, &body.amount).await?))
}

pub async fn approve_upload_request(
    State(state): State<AppState>,
    auth: RequestAuth,
    PathParam(id): PathParam<Uuid>,
) -> CoreResult<Json<RequestApproved>> {
    let (cancel, _guard) = state.request_scope();
    Ok(Json(state.requests.approve(&auth, id, &cancel).await?))
}

pub async fn reject_upload_request(
    State(state): State<AppState>,
    auth: RequestAuth,
    PathParam(id): PathParam<Uuid>,
    JsonBody(body): JsonBody<RejectBody>,
) -> CoreResult<Json<RequestRejected>> {
    Ok(Json(state.requests.reject(&auth, id, body.reason).await?))
}
