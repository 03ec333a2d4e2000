//! Registration, login, and user maintenance.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::{RequestAuth, TokenIssuer};
use crate::blockchain::types::WalletAddress;
use crate::error::{CoreError, CoreResult};
use crate::mirror::models::{ApprovalStatus, Role, User};
use crate::mirror::MirrorStore;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    #[serde(alias = "wallet_address")]
    pub wallet: String,
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub message: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

pub struct AccountService {
    mirror: Arc<dyn MirrorStore>,
    issuer: Arc<TokenIssuer>,
    admin_wallets: HashSet<WalletAddress>,
}

impl AccountService {
    pub fn new(mirror: Arc<dyn MirrorStore>, issuer: Arc<TokenIssuer>) -> Self {
        Self {
            mirror,
            issuer,
            admin_wallets: HashSet::new(),
        }
    }

    /// Wallets in this set register as admins.
    pub fn with_admin_wallets(mut self, wallets: impl IntoIterator<Item = WalletAddress>) -> Self {
        self.admin_wallets.extend(wallets);
        self
    }

    #[tracing::instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: Registration) -> CoreResult<Message> {
        let wallet: WalletAddress = registration.wallet.parse()?;
        let email = registration.email.trim().to_lowercase();
        let name = registration.name.trim().to_string();

        if !email.contains('@') {
            return Err(CoreError::BadRequest("email is not valid".into()));
        }
        if name.is_empty() {
            return Err(CoreError::BadRequest("name is required".into()));
        }
        check_password(&registration.password)?;

        let role = if self.admin_wallets.contains(&wallet) { Role::Admin } else { Role::User };
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            wallet_address: wallet,
            email,
            display_name: name,
            password_digest: digest(registration.password).await?,
            role,
            approval_status: ApprovalStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        self.mirror.insert_user(&user).await?;
        tracing::info!(user_id = %user.id, wallet = %user.wallet_address, role = %role, "User registered");
        Ok(Message { message: "User registered successfully" })
    }

    pub async fn login(&self, credentials: Credentials) -> CoreResult<Session> {
        let email = credentials.email.trim().to_lowercase();
        let rejected = || CoreError::Unauthorized("invalid email or password".into());

        let user = self.mirror.user_by_email(&email).await?.ok_or_else(rejected)?;
        if !verify(credentials.password, user.password_digest.clone()).await? {
            tracing::warn!(user_id = %user.id, "Login failed");
            return Err(rejected());
        }

        let token = self.issuer.issue(&user)?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok(Session { token, user })
    }

    pub async fn me(&self, auth: &RequestAuth) -> CoreResult<User> {
        self.mirror
            .user_by_id(auth.user_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("user no longer exists".into()))
    }

    pub async fn change_password(&self, auth: &RequestAuth, change: PasswordChange) -> CoreResult<Message> {
        let user = self.me(auth).await?;
        if !verify(change.current_password, user.password_digest).await? {
            return Err(CoreError::Unauthorized("current password does not match".into()));
        }
        check_password(&change.new_password)?;

        let new_digest = digest(change.new_password).await?;
        if !self.mirror.set_password_digest(user.id, &new_digest).await? {
            return Err(CoreError::NotFound("user no longer exists".into()));
        }
        tracing::info!(user_id = %user.id, "Password rotated");
        Ok(Message { message: "Password updated successfully" })
    }

    pub async fn delete_user(&self, auth: &RequestAuth, id: Uuid) -> CoreResult<Message> {
        auth.require_admin()?;
        if !self.mirror.delete_user(id).await? {
            return Err(CoreError::NotFound(format!("user {} not found", id)));
        }
        tracing::info!(user_id = %id, by = %auth.user_id, "User deleted");
        Ok(Message { message: "User deleted successfully" })
    }
}

fn check_password(password: &str) -> CoreResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CoreError::BadRequest(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

// Digest work runs off the async workers.
async fn digest(password: String) -> CoreResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| CoreError::Internal(e.to_string()))?
        .map_err(|e| CoreError::Internal(format!("password digest: {}", e)))
}

async fn verify(password: String, stored: String) -> CoreResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| CoreError::Internal(e.to_string()))
}
