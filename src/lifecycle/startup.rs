//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize subsystems in dependency order
//! - Start the event ingestor and the metrics exporter
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The listener binds last, after the contract suite is resolved

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::auth::TokenIssuer;
use crate::blockchain::types::WalletAddress;
use crate::blockchain::{BlockchainError, LedgerClient};
use crate::config::{load_config, AppConfig, ConfigError};
use crate::http::{AppState, HttpServer, UploadLimits};
use crate::ingestor::{Ingestor, IngestorError};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_handler;
use crate::mirror::{MirrorError, PgMirror};
use crate::observability::{init_logging, metrics};
use crate::pinning::{PinError, PinataClient};
use crate::resilience::ResubscribePolicy;

#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    pub config_path: Option<PathBuf>,
    pub skip_migrations: bool,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("logging init failed: {0}")]
    Logging(String),
    #[error("metrics exporter failed: {0}")]
    Metrics(String),
    #[error("mirror store unavailable: {0}")]
    Mirror(#[from] MirrorError),
    #[error("migrations failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("ledger init failed: {0}")]
    Ledger(#[from] BlockchainError),
    #[error("pin client init failed: {0}")]
    Pinning(#[from] PinError),
    #[error("listener: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Ingestor(#[from] IngestorError),
}

/// Start everything and block until the process should exit.
pub async fn run(options: StartupOptions) -> Result<(), StartupError> {
    let config = load_config(options.config_path.as_deref())?;
    init_logging(&config.observability).map_err(|e| StartupError::Logging(e.to_string()))?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "estate-coordinator starting");

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|e: std::net::AddrParseError| StartupError::Metrics(e.to_string()))?;
        metrics::init_metrics(addr).map_err(|e| StartupError::Metrics(e.to_string()))?;
    }

    let mirror = Arc::new(PgMirror::connect(&config.database).await?);
    if config.database.run_migrations && !options.skip_migrations {
        mirror.migrate().await?;
        tracing::info!("Migrations applied");
    }

    let ledger = Arc::new(LedgerClient::connect(config.ledger.clone(), config.ledger.private_key.expose()).await?);
    tracing::info!(
        chain_id = ledger.chain_id().0,
        signer = %ledger.signer_address(),
        "Ledger client ready"
    );

    let pins = Arc::new(PinataClient::new(&config.pinning)?);
    let issuer = Arc::new(TokenIssuer::new(&config.auth));
    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let ingestor = if config.ingestor.enabled {
        let ingestor = Arc::new(Ingestor::new(
            ledger.clone(),
            mirror.clone(),
            ResubscribePolicy::from_config(&config.ingestor),
        ));
        Some(tokio::spawn(ingestor.run(shutdown.token())))
    } else {
        tracing::warn!("Event ingestor disabled; mirror rows rely on the request path only");
        None
    };

    let state = AppState::new(ledger, pins, mirror, issuer, shutdown.clone())
        .with_limits(UploadLimits::from_config(&config.server))
        .with_admin_wallets(admin_wallets(&config));

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let served = HttpServer::new(state, &config.server).run(listener).await;
    shutdown.trigger();

    if let Some(handle) = ingestor {
        match handle.await {
            Ok(Err(e)) => return Err(e.into()),
            Err(e) => tracing::error!(error = %e, "Ingestor task failed to join"),
            Ok(Ok(())) => {}
        }
    }
    served?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn admin_wallets(config: &AppConfig) -> Vec<WalletAddress> {
    config
        .auth
        .admin_wallets
        .iter()
        .filter_map(|raw| raw.parse().ok())
        .collect()
}
