//! Metrics collection and exposition.
//!
//! # Metrics
//! - `netbridge_completions_total` (counter): completions by `op` and `outcome`
//! - `netbridge_bytes_total` (counter): bytes moved by `direction`
//! - `netbridge_resolutions_total` (counter): resolver calls by `outcome`
//! - `netbridge_active_handles` (gauge): live socket and listener handles
//!
//! # Design Decisions
//! - Label values are static strings; no per-peer cardinality

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Outcome label for a successful completion.
pub const OK: &str = "ok";
/// Outcome label for a failed completion.
pub const ERROR: &str = "error";

/// Install the Prometheus recorder with an HTTP scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Count one emitted completion record.
pub fn record_completion(op: &'static str, outcome: &'static str) {
    ::metrics::counter!("netbridge_completions_total", "op" => op, "outcome" => outcome)
        .increment(1);
}

/// Count bytes read or written.
pub fn record_bytes(direction: &'static str, bytes: usize) {
    ::metrics::counter!("netbridge_bytes_total", "direction" => direction)
        .increment(bytes as u64);
}

/// Count one resolver call.
pub fn record_resolution(outcome: &'static str) {
    ::metrics::counter!("netbridge_resolutions_total", "outcome" => outcome).increment(1);
}

/// One socket or listener handle came alive.
///
/// The gauge is process-wide, so every bridge adjusts it by one rather than
/// publishing its own count.
pub fn handle_opened() {
    ::metrics::gauge!("netbridge_active_handles").increment(1.0);
}

/// One socket or listener handle was released.
pub fn handle_closed() {
    ::metrics::gauge!("netbridge_active_handles").decrement(1.0);
}
