//! Subscribe, consume, resubscribe.

use futures_util::StreamExt;
use std::future::Future;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::blockchain::{BlockchainError, BlockchainResult, EventStream};
use crate::observability::metrics;
use crate::resilience::ResubscribePolicy;

use super::handlers::Outcome;

#[derive(Debug, Error)]
pub enum IngestorError {
    #[error("{stream} subscription failed permanently: {source}")]
    Fatal {
        stream: &'static str,
        #[source]
        source: BlockchainError,
    },
    #[error("{stream} subscription gave up after {failures} consecutive failures")]
    GaveUp { stream: &'static str, failures: u32 },
}

/// Why a stream stopped delivering.
enum Interruption {
    Cancelled,
    Dropped(String),
}

/// Keep one event stream alive until `shutdown` fires.
///
/// Each event is handed to `handle` in delivery order. A dropped stream is
/// resubscribed after the policy's delay; events delivered while it was down
/// are not recovered. Non-transient errors end the loop.
pub async fn run_subscription<T, S, SFut, H, HFut>(
    stream: &'static str,
    policy: ResubscribePolicy,
    shutdown: CancellationToken,
    mut subscribe: S,
    mut handle: H,
) -> Result<(), IngestorError>
where
    S: FnMut() -> SFut,
    SFut: Future<Output = BlockchainResult<EventStream<T>>>,
    H: FnMut(T) -> HFut,
    HFut: Future<Output = Outcome>,
{
    let mut failures: u32 = 0;

    loop {
        let subscribed = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            result = subscribe() => result,
        };

        match subscribed {
            Ok(events) => {
                tracing::info!(stream, "Subscribed");
                match consume(stream, events, &shutdown, &mut handle, &mut failures).await {
                    Ok(Interruption::Cancelled) => return Ok(()),
                    Ok(Interruption::Dropped(reason)) => {
                        tracing::warn!(stream, reason = %reason, "Subscription dropped");
                    }
                    Err(source) => return Err(IngestorError::Fatal { stream, source }),
                }
            }
            Err(e) if e.is_transient() => {
                tracing::warn!(stream, error = %e, "Subscribe failed");
            }
            Err(source) => return Err(IngestorError::Fatal { stream, source }),
        }

        failures += 1;
        if policy.exhausted(failures) {
            return Err(IngestorError::GaveUp { stream, failures });
        }

        metrics::record_resubscribe(stream);
        let delay = policy.delay_for(failures);
        tracing::info!(stream, failures, delay_ms = delay.as_millis() as u64, "Resubscribing");

        tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

async fn consume<T, H, HFut>(
    stream: &'static str,
    mut events: EventStream<T>,
    shutdown: &CancellationToken,
    handle: &mut H,
    failures: &mut u32,
) -> Result<Interruption, BlockchainError>
where
    H: FnMut(T) -> HFut,
    HFut: Future<Output = Outcome>,
{
    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => return Ok(Interruption::Cancelled),
            next = events.next() => next,
        };

        match next {
            Some(Ok(event)) => {
                *failures = 0;
                let outcome = handle(event).await;
                metrics::record_event(stream, outcome.as_str());
            }
            // One malformed log does not invalidate the subscription.
            Some(Err(BlockchainError::Decode(reason))) => {
                tracing::warn!(stream, reason = %reason, "Undecodable event skipped");
                metrics::record_event(stream, "undecodable");
            }
            Some(Err(e)) if e.is_transient() => return Ok(Interruption::Dropped(e.to_string())),
            Some(Err(e)) => return Err(e),
            None => return Ok(Interruption::Dropped("stream ended".into())),
        }
    }
}
