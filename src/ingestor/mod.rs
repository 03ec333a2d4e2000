//! Ledger event ingestion.
//!
//! # Responsibilities
//! - Keep one subscription per event type alive for the process lifetime
//! - Materialize `PropertyRegistered` into property rows
//! - Materialize `RevenueDeposited` into revenue distribution rows
//!
//! # Data Flow
//! ```text
//! EventFeed::property_registered ─┐
//!                                 ├→ subscriber.rs (resubscribe loop)
//! EventFeed::revenue_deposited  ──┘       → handlers.rs → MirrorStore
//! ```
//!
//! # Design Decisions
//! - Writes are idempotent, so a row written by the request path first is
//!   left alone when its event arrives
//! - No block cursor: events missed while a subscription is down are lost
//! - A fatal subscription error triggers process shutdown

pub mod handlers;
pub mod subscriber;

pub use handlers::{EventHandlers, Outcome};
pub use subscriber::{run_subscription, IngestorError};

use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::blockchain::EventFeed;
use crate::mirror::MirrorStore;
use crate::resilience::ResubscribePolicy;

pub const PROPERTY_STREAM: &str = "property_registered";
pub const REVENUE_STREAM: &str = "revenue_deposited";

pub struct Ingestor {
    feed: Arc<dyn EventFeed>,
    handlers: Arc<EventHandlers>,
    policy: ResubscribePolicy,
}

impl Ingestor {
    pub fn new(feed: Arc<dyn EventFeed>, mirror: Arc<dyn MirrorStore>, policy: ResubscribePolicy) -> Self {
        Self {
            feed,
            handlers: Arc::new(EventHandlers::new(mirror)),
            policy,
        }
    }

    pub async fn run_property_stream(&self, shutdown: CancellationToken) -> Result<(), IngestorError> {
        let feed = self.feed.clone();
        let handlers = self.handlers.clone();
        run_subscription(
            PROPERTY_STREAM,
            self.policy,
            shutdown,
            move || {
                let feed = feed.clone();
                async move { feed.property_registered().await }
            },
            move |event| {
                let handlers = handlers.clone();
                async move { handlers.property_registered(event).await }
            },
        )
        .await
    }

    pub async fn run_revenue_stream(&self, shutdown: CancellationToken) -> Result<(), IngestorError> {
        let feed = self.feed.clone();
        let handlers = self.handlers.clone();
        run_subscription(
            REVENUE_STREAM,
            self.policy,
            shutdown,
            move || {
                let feed = feed.clone();
                async move { feed.revenue_deposited().await }
            },
            move |event| {
                let handlers = handlers.clone();
                async move { handlers.revenue_deposited(event).await }
            },
        )
        .await
    }

    /// Run both streams until `shutdown` fires.
    ///
    /// If either stream fails permanently, `shutdown` is cancelled so the rest
    /// of the process stops too, and the error is returned.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) -> Result<(), IngestorError> {
        tracing::info!("Starting event ingestor");

        let mut streams = JoinSet::new();
        let this = self.clone();
        let token = shutdown.clone();
        streams.spawn(async move { this.run_property_stream(token).await });
        let this = self.clone();
        let token = shutdown.clone();
        streams.spawn(async move { this.run_revenue_stream(token).await });

        let mut first_error = None;
        while let Some(joined) = streams.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Event ingestion stopped, shutting down");
                    shutdown.cancel();
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Ingestor task panicked, shutting down");
                    shutdown.cancel();
                }
            }
        }

        tracing::info!("Event ingestor stopped");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
