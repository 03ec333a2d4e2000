//! Postgres-backed mirror.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::blockchain::types::WalletAddress;
use crate::config::DatabaseConfig;
use crate::mirror::models::{
    ApprovalStatus, Property, PropertyDocument, PropertyStatus, RequestTransition,
    RevenueDistribution, UploadRequest, UploadRequestDocument, User,
};
use crate::mirror::store::{MirrorError, MirrorResult, MirrorStore};

pub struct PgMirror {
    pool: PgPool,
}

impl PgMirror {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> MirrorResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(config.url.expose())
            .await?;
        Ok(Self::new(pool))
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn wallet(raw: &str) -> MirrorResult<WalletAddress> {
    raw.parse()
        .map_err(|_| MirrorError::Corrupt(format!("stored address '{}'", raw)))
}

fn parsed<T: std::str::FromStr<Err = String>>(raw: &str) -> MirrorResult<T> {
    raw.parse().map_err(MirrorError::Corrupt)
}

fn unique(err: sqlx::Error, what: &'static str) -> MirrorError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => MirrorError::Duplicate(what),
        _ => MirrorError::Database(err),
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    wallet_address: String,
    email: String,
    display_name: String,
    password_digest: String,
    role: String,
    approval_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = MirrorError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            wallet_address: wallet(&row.wallet_address)?,
            email: row.email,
            display_name: row.display_name,
            password_digest: row.password_digest,
            role: parsed(&row.role)?,
            approval_status: parsed(&row.approval_status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct PropertyRow {
    id: Uuid,
    display_name: String,
    asset_contract_address: String,
    token_contract_address: String,
    owner_wallet: String,
    metadata_cid: String,
    valuation: BigDecimal,
    status: String,
    creation_tx_hash: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PropertyRow> for Property {
    type Error = MirrorError;

    fn try_from(row: PropertyRow) -> Result<Self, Self::Error> {
        Ok(Property {
            id: row.id,
            display_name: row.display_name,
            asset_contract_address: wallet(&row.asset_contract_address)?,
            token_contract_address: wallet(&row.token_contract_address)?,
            owner_wallet: wallet(&row.owner_wallet)?,
            metadata_cid: row.metadata_cid,
            valuation: row.valuation,
            status: parsed(&row.status)?,
            creation_tx_hash: row.creation_tx_hash,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct DocumentRow {
    id: Uuid,
    owner_id: Uuid,
    file_url: String,
    file_cid: String,
    name: String,
    type_tag: String,
    uploaded_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for PropertyDocument {
    type Error = MirrorError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(PropertyDocument {
            id: row.id,
            property_id: row.owner_id,
            file_url: row.file_url,
            file_cid: row.file_cid,
            name: row.name,
            type_tag: parsed(&row.type_tag)?,
            uploaded_at: row.uploaded_at,
        })
    }
}

impl TryFrom<DocumentRow> for UploadRequestDocument {
    type Error = MirrorError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(UploadRequestDocument {
            id: row.id,
            request_id: row.owner_id,
            file_url: row.file_url,
            file_cid: row.file_cid,
            name: row.name,
            type_tag: parsed(&row.type_tag)?,
            uploaded_at: row.uploaded_at,
        })
    }
}

#[derive(FromRow)]
struct UploadRequestRow {
    id: Uuid,
    user_id: Uuid,
    wallet_address: String,
    display_name: String,
    symbol: String,
    valuation: BigDecimal,
    token_supply: i64,
    metadata_cid: String,
    status: String,
    rejection_reason: Option<String>,
    property_id: Option<Uuid>,
    approval_tx_hash: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UploadRequestRow> for UploadRequest {
    type Error = MirrorError;

    fn try_from(row: UploadRequestRow) -> Result<Self, Self::Error> {
        Ok(UploadRequest {
            id: row.id,
            user_id: row.user_id,
            wallet_address: wallet(&row.wallet_address)?,
            display_name: row.display_name,
            symbol: row.symbol,
            valuation: row.valuation,
            token_supply: row.token_supply,
            metadata_cid: row.metadata_cid,
            status: parsed(&row.status)?,
            rejection_reason: row.rejection_reason,
            property_id: row.property_id,
            approval_tx_hash: row.approval_tx_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct RevenueRow {
    id: Uuid,
    property_id: Uuid,
    snapshot_id: i64,
    total_amount: String,
    deposit_tx_hash: String,
    created_at: DateTime<Utc>,
}

impl From<RevenueRow> for RevenueDistribution {
    fn from(row: RevenueRow) -> Self {
        RevenueDistribution {
            id: row.id,
            property_id: row.property_id,
            snapshot_id: row.snapshot_id,
            total_amount: row.total_amount,
            deposit_tx_hash: row.deposit_tx_hash,
            created_at: row.created_at,
        }
    }
}

const USER_COLUMNS: &str = "id, wallet_address, email, display_name, password_digest, role, approval_status, created_at, updated_at";
const PROPERTY_COLUMNS: &str = "id, display_name, asset_contract_address, token_contract_address, owner_wallet, metadata_cid, valuation, status, creation_tx_hash, created_at";
const REQUEST_COLUMNS: &str = "id, user_id, wallet_address, display_name, symbol, valuation, token_supply, metadata_cid, status, rejection_reason, property_id, approval_tx_hash, created_at, updated_at";

fn collect<R, T>(rows: Vec<R>) -> MirrorResult<Vec<T>>
where
    T: TryFrom<R, Error = MirrorError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl MirrorStore for PgMirror {
    #[tracing::instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert_user(&self, user: &User) -> MirrorResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, wallet_address, email, display_name, password_digest, role, approval_status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id)
        .bind(user.wallet_address.canonical())
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.password_digest)
        .bind(user.role.as_str())
        .bind(user.approval_status.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| unique(e, "user"))?;
        Ok(())
    }

    async fn user_by_id(&self, id: Uuid) -> MirrorResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn user_by_email(&self, email: &str) -> MirrorResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE lower(email) = lower($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn user_by_wallet(&self, wallet: &WalletAddress) -> MirrorResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE wallet_address = $1",
            USER_COLUMNS
        ))
        .bind(wallet.canonical())
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    #[tracing::instrument(skip(self), err)]
    async fn set_user_approval(&self, wallet: &WalletAddress, status: ApprovalStatus) -> MirrorResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET approval_status = $2, updated_at = NOW() WHERE wallet_address = $1",
        )
        .bind(wallet.canonical())
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self, digest), err)]
    async fn set_password_digest(&self, id: Uuid, digest: &str) -> MirrorResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET password_digest = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(digest)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), err)]
    async fn delete_user(&self, id: Uuid) -> MirrorResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self, property), fields(asset = %property.asset_contract_address), err)]
    async fn insert_property(&self, property: &Property) -> MirrorResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO properties (id, display_name, asset_contract_address, token_contract_address, owner_wallet, metadata_cid, valuation, status, creation_tx_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (asset_contract_address) DO NOTHING
            "#,
        )
        .bind(property.id)
        .bind(&property.display_name)
        .bind(property.asset_contract_address.canonical())
        .bind(property.token_contract_address.canonical())
        .bind(property.owner_wallet.canonical())
        .bind(&property.metadata_cid)
        .bind(&property.valuation)
        .bind(property.status.as_str())
        .bind(&property.creation_tx_hash)
        .bind(property.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn backfill_display_name(&self, asset: &WalletAddress, name: &str) -> MirrorResult<bool> {
        let result = sqlx::query(
            "UPDATE properties SET display_name = $2 WHERE asset_contract_address = $1 AND display_name = ''",
        )
        .bind(asset.canonical())
        .bind(name)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn property_by_id(&self, id: Uuid) -> MirrorResult<Option<Property>> {
        let row = sqlx::query_as::<_, PropertyRow>(&format!(
            "SELECT {} FROM properties WHERE id = $1",
            PROPERTY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Property::try_from).transpose()
    }

    async fn property_by_asset(&self, asset: &WalletAddress) -> MirrorResult<Option<Property>> {
        let row = sqlx::query_as::<_, PropertyRow>(&format!(
            "SELECT {} FROM properties WHERE asset_contract_address = $1",
            PROPERTY_COLUMNS
        ))
        .bind(asset.canonical())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Property::try_from).transpose()
    }

    async fn property_by_token(&self, token: &WalletAddress) -> MirrorResult<Option<Property>> {
        let row = sqlx::query_as::<_, PropertyRow>(&format!(
            "SELECT {} FROM properties WHERE token_contract_address = $1",
            PROPERTY_COLUMNS
        ))
        .bind(token.canonical())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Property::try_from).transpose()
    }

    async fn list_properties(&self) -> MirrorResult<Vec<Property>> {
        let rows = sqlx::query_as::<_, PropertyRow>(&format!(
            "SELECT {} FROM properties ORDER BY created_at DESC",
            PROPERTY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    #[tracing::instrument(skip(self), err)]
    async fn set_property_status(&self, id: Uuid, status: PropertyStatus) -> MirrorResult<bool> {
        let result = sqlx::query("UPDATE properties SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_property_document(&self, document: &PropertyDocument) -> MirrorResult<()> {
        sqlx::query(
            r#"
            INSERT INTO property_documents (id, property_id, file_url, file_cid, name, type_tag, uploaded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(document.id)
        .bind(document.property_id)
        .bind(&document.file_url)
        .bind(&document.file_cid)
        .bind(&document.name)
        .bind(document.type_tag.as_str())
        .bind(document.uploaded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn property_documents(&self, property_id: Uuid) -> MirrorResult<Vec<PropertyDocument>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, property_id AS owner_id, file_url, file_cid, name, type_tag, uploaded_at
            FROM property_documents WHERE property_id = $1 ORDER BY uploaded_at
            "#,
        )
        .bind(property_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    #[tracing::instrument(skip(self, request), fields(request_id = %request.id), err)]
    async fn insert_upload_request(&self, request: &UploadRequest) -> MirrorResult<()> {
        sqlx::query(
            r#"
            INSERT INTO property_upload_requests (id, user_id, wallet_address, display_name, symbol, valuation, token_supply, metadata_cid, status, rejection_reason, property_id, approval_tx_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(request.id)
        .bind(request.user_id)
        .bind(request.wallet_address.canonical())
        .bind(&request.display_name)
        .bind(&request.symbol)
        .bind(&request.valuation)
        .bind(request.token_supply)
        .bind(&request.metadata_cid)
        .bind(request.status.as_str())
        .bind(&request.rejection_reason)
        .bind(request.property_id)
        .bind(&request.approval_tx_hash)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_request_document(&self, document: &UploadRequestDocument) -> MirrorResult<()> {
        sqlx::query(
            r#"
            INSERT INTO upload_request_documents (id, request_id, file_url, file_cid, name, type_tag, uploaded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(document.id)
        .bind(document.request_id)
        .bind(&document.file_url)
        .bind(&document.file_cid)
        .bind(&document.name)
        .bind(document.type_tag.as_str())
        .bind(document.uploaded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upload_request(&self, id: Uuid) -> MirrorResult<Option<UploadRequest>> {
        let row = sqlx::query_as::<_, UploadRequestRow>(&format!(
            "SELECT {} FROM property_upload_requests WHERE id = $1",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(UploadRequest::try_from).transpose()
    }

    async fn request_documents(&self, request_id: Uuid) -> MirrorResult<Vec<UploadRequestDocument>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, request_id AS owner_id, file_url, file_cid, name, type_tag, uploaded_at
            FROM upload_request_documents WHERE request_id = $1 ORDER BY uploaded_at
            "#,
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn list_upload_requests(&self, wallet: Option<&WalletAddress>) -> MirrorResult<Vec<UploadRequest>> {
        let rows = match wallet {
            Some(wallet) => {
                sqlx::query_as::<_, UploadRequestRow>(&format!(
                    "SELECT {} FROM property_upload_requests WHERE wallet_address = $1 ORDER BY created_at DESC",
                    REQUEST_COLUMNS
                ))
                .bind(wallet.canonical())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, UploadRequestRow>(&format!(
                    "SELECT {} FROM property_upload_requests ORDER BY created_at DESC",
                    REQUEST_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        collect(rows)
    }

    #[tracing::instrument(skip(self), err)]
    async fn transition_upload_request(&self, id: Uuid, transition: &RequestTransition) -> MirrorResult<bool> {
        let (property_id, tx_hash, reason) = match transition {
            RequestTransition::Approve { property_id, tx_hash } => (*property_id, Some(tx_hash.as_str()), None),
            RequestTransition::Reject { reason } => (None, None, Some(reason.as_str())),
        };
        let result = sqlx::query(
            r#"
            UPDATE property_upload_requests
            SET status = $2, property_id = $3, approval_tx_hash = $4, rejection_reason = $5, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(transition.target().as_str())
        .bind(property_id)
        .bind(tx_hash)
        .bind(reason)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(skip(self, distribution), fields(tx_hash = %distribution.deposit_tx_hash), err)]
    async fn insert_revenue_distribution(&self, distribution: &RevenueDistribution) -> MirrorResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO revenue_distributions (id, property_id, snapshot_id, total_amount, deposit_tx_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (deposit_tx_hash, snapshot_id) DO NOTHING
            "#,
        )
        .bind(distribution.id)
        .bind(distribution.property_id)
        .bind(distribution.snapshot_id)
        .bind(&distribution.total_amount)
        .bind(&distribution.deposit_tx_hash)
        .bind(distribution.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn revenue_for_property(&self, property_id: Uuid) -> MirrorResult<Vec<RevenueDistribution>> {
        let rows = sqlx::query_as::<_, RevenueRow>(
            r#"
            SELECT id, property_id, snapshot_id, total_amount, deposit_tx_hash, created_at
            FROM revenue_distributions WHERE property_id = $1 ORDER BY created_at
            "#,
        )
        .bind(property_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(RevenueDistribution::from).collect())
    }
}
