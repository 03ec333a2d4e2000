//! Metrics collection and exposition.
//!
//! # Metrics
//! - `estate_ledger_tx_submitted_total` (counter): accepted submissions by op
//! - `estate_ledger_tx_failed_total` (counter): failures by op, stage
//! - `estate_pin_uploads_total` (counter): uploads by outcome
//! - `estate_events_ingested_total` (counter): events by stream, outcome
//! - `estate_ingestor_resubscribes_total` (counter): resubscribes by stream
//! - `estate_reconciliation_hazards_total` (counter): hazards by kind
//! - `estate_http_requests_total` (counter): responses by status
//! - `estate_http_request_duration_seconds` (histogram): latency
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op, so tests need no setup
//! - Label values are short fixed vocabularies

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_tx_submitted(op: &str) {
    counter!("estate_ledger_tx_submitted_total", "op" => op.to_string()).increment(1);
}

pub fn record_tx_failed(op: &str, stage: &str) {
    counter!(
        "estate_ledger_tx_failed_total",
        "op" => op.to_string(),
        "stage" => stage.to_string()
    )
    .increment(1);
}

pub fn record_pin_upload(outcome: &'static str) {
    counter!("estate_pin_uploads_total", "outcome" => outcome).increment(1);
}

pub fn record_event(stream: &'static str, outcome: &'static str) {
    counter!(
        "estate_events_ingested_total",
        "stream" => stream,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_resubscribe(stream: &'static str) {
    counter!("estate_ingestor_resubscribes_total", "stream" => stream).increment(1);
}

pub fn record_hazard(kind: &'static str) {
    counter!("estate_reconciliation_hazards_total", "kind" => kind).increment(1);
}

pub fn record_request(status: u16, start: Instant) {
    counter!("estate_http_requests_total", "status" => status.to_string()).increment(1);
    histogram!("estate_http_request_duration_seconds").record(start.elapsed().as_secs_f64());
}
