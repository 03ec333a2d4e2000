//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the shared [`AppState`] from the ledger, pin store, and mirror
//! - Create the Axum router with public, authenticated, and admin routes
//! - Wire up middleware (tracing, request ID, timeout, panic recovery, metrics)
//! - Serve until shutdown, then give in-flight requests a bounded drain

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::{CancellationToken, DropGuard};
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::accounts::AccountService;
use crate::admin::setup_admin_router;
use crate::auth::{require_auth, TokenIssuer};
use crate::blockchain::types::WalletAddress;
use crate::blockchain::Ledger;
use crate::config::ServerConfig;
use crate::http::handlers;
use crate::http::middleware::track_requests;
use crate::lifecycle::Shutdown;
use crate::mirror::MirrorStore;
use crate::pinning::PinStore;
use crate::properties::{PropertyCoordinator, PropertyReader};
use crate::submitters::{ApprovalSubmitter, RevenueSubmitter};
use crate::upload_requests::UploadRequestWorkflow;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub coordinator: Arc<PropertyCoordinator>,
    pub reader: Arc<PropertyReader>,
    pub requests: Arc<UploadRequestWorkflow>,
    pub approvals: Arc<ApprovalSubmitter>,
    pub revenue: Arc<RevenueSubmitter>,
    pub pins: Arc<dyn PinStore>,
    pub ledger: Arc<dyn Ledger>,
    pub mirror: Arc<dyn MirrorStore>,
    pub issuer: Arc<TokenIssuer>,
    pub shutdown: Shutdown,
    pub limits: UploadLimits,
}

/// Per-route body caps.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub property_bytes: usize,
    pub file_bytes: usize,
}

impl UploadLimits {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            property_bytes: config.max_property_upload_bytes,
            file_bytes: config.max_file_upload_bytes,
        }
    }
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}

impl AppState {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        pins: Arc<dyn PinStore>,
        mirror: Arc<dyn MirrorStore>,
        issuer: Arc<TokenIssuer>,
        shutdown: Shutdown,
    ) -> Self {
        let coordinator = Arc::new(PropertyCoordinator::new(ledger.clone(), pins.clone(), mirror.clone()));
        Self {
            accounts: Arc::new(AccountService::new(mirror.clone(), issuer.clone())),
            requests: Arc::new(UploadRequestWorkflow::new(coordinator.clone(), pins.clone(), mirror.clone())),
            reader: Arc::new(PropertyReader::new(mirror.clone(), pins.clone())),
            approvals: Arc::new(ApprovalSubmitter::new(ledger.clone(), mirror.clone())),
            revenue: Arc::new(RevenueSubmitter::new(ledger.clone(), mirror.clone())),
            coordinator,
            pins,
            ledger,
            mirror,
            issuer,
            shutdown,
            limits: UploadLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: UploadLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Token for one request's ledger waits. It is cancelled on shutdown, or
    /// when the guard drops because the client went away.
    pub fn request_scope(&self) -> (CancellationToken, DropGuard) {
        let token = self.shutdown.child_token();
        let guard = token.clone().drop_guard();
        (token, guard)
    }

    /// Registrations from these wallets get the admin role.
    pub fn with_admin_wallets(mut self, wallets: Vec<WalletAddress>) -> Self {
        let accounts = AccountService::new(self.mirror.clone(), self.issuer.clone()).with_admin_wallets(wallets);
        self.accounts = Arc::new(accounts);
        self
    }
}

/// Build the full router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let public = Router::new()
        .route("/health", get(handlers::health))
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/properties", get(handlers::list_properties))
        .route("/properties/{id}", get(handlers::get_property))
        .route("/properties/{id}/metadata", get(handlers::property_metadata))
        .route("/properties/{id}/revenue", get(handlers::property_revenue))
        .route("/properties/{id}/token-balance/{wallet}", get(handlers::token_balance));

    let authenticated = Router::new()
        .route("/users/me", get(handlers::me))
        .route("/users/me/password", post(handlers::change_password))
        .route(
            "/upload",
            post(handlers::upload_file).layer(DefaultBodyLimit::max(state.limits.file_bytes)),
        )
        .route(
            "/property-upload-requests",
            post(handlers::submit_upload_request)
                .layer(DefaultBodyLimit::max(state.limits.property_bytes))
                .get(handlers::list_upload_requests),
        )
        .route("/property-upload-requests/{id}", get(handlers::get_upload_request))
        .route_layer(middleware::from_fn_with_state(state.issuer.clone(), require_auth));

    let admin = setup_admin_router(&state);

    Router::new()
        .merge(public)
        .merge(authenticated)
        .merge(admin)
        .with_state(state)
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// HTTP server for the coordinator API.
pub struct HttpServer {
    router: Router,
    shutdown: Shutdown,
    grace: Duration,
}

impl HttpServer {
    pub fn new(state: AppState, config: &ServerConfig) -> Self {
        let shutdown = state.shutdown.clone();
        let router = build_router(state, Duration::from_secs(config.request_timeout_secs));
        Self {
            router,
            shutdown,
            grace: Duration::from_secs(config.shutdown_grace_secs),
        }
    }

    /// Serve until shutdown is triggered, then drain for at most the grace period.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let signal = self.shutdown.clone();
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(async move { signal.wait().await })
            .into_future();

        tokio::select! {
            result = serve => result?,
            _ = self.shutdown.deadline(self.grace) => {
                tracing::warn!(grace_secs = self.grace.as_secs(), "Drain deadline reached, dropping open requests");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
