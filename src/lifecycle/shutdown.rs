//! Shutdown coordination.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Process-wide cancellation.
///
/// Long-running tasks hold a child token; request handlers derive theirs from
/// it so mining waits stop when the process is going down.
#[derive(Clone, Debug, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token cancelled when shutdown starts.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Token cancelled on shutdown, or earlier by its holder.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn trigger(&self) {
        if !self.token.is_cancelled() {
            tracing::info!("Shutdown triggered");
        }
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn wait(&self) {
        self.token.cancelled().await
    }

    /// Resolve `grace` after shutdown starts. Used to bound in-flight drain.
    pub async fn deadline(&self, grace: Duration) {
        self.wait().await;
        tokio::time::sleep(grace).await;
    }
}
