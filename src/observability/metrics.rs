//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bridge_requests_total` (counter): requests by api version and status
//! - `bridge_request_duration_seconds` (histogram): end-to-end latency
//! - `bridge_upstream_attempts_total` (counter): legacy attempts by outcome
//! - `bridge_cache_lookups_total` (counter): v2 lookups by resource and result
//! - `bridge_cache_entries` (gauge): live cache entries
//! - `bridge_circuit_state` (gauge): 0=closed, 1=half_open, 2=open
//! - `bridge_circuit_transitions_total` (counter): breaker transitions
//! - `bridge_transform_skipped_total` (counter): legacy records dropped from lists
//! - `bridge_upstream_reachable` (gauge): last probe result, 1 or 0
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::CircuitState;

/// Install the Prometheus exporter with its own scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(version: &'static str, status: u16, start: Instant) {
    counter!("bridge_requests_total", "version" => version, "status" => status.to_string())
        .increment(1);
    histogram!("bridge_request_duration_seconds", "version" => version)
        .record(start.elapsed().as_secs_f64());
}

/// `outcome` is `ok`, an upstream error kind, or `circuit_open`.
pub fn record_upstream_attempt(outcome: &'static str) {
    counter!("bridge_upstream_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_cache_lookup(resource: &'static str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("bridge_cache_lookups_total", "resource" => resource, "result" => result)
        .increment(1);
}

pub fn record_cache_size(entries: usize) {
    gauge!("bridge_cache_entries").set(entries as f64);
}

pub fn record_circuit_state(state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    gauge!("bridge_circuit_state").set(value);
}

pub fn record_circuit_transition(from: CircuitState, to: CircuitState) {
    counter!(
        "bridge_circuit_transitions_total",
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
    record_circuit_state(to);
}

pub fn record_transform_skipped(resource: &'static str, count: usize) {
    if count > 0 {
        counter!("bridge_transform_skipped_total", "resource" => resource).increment(count as u64);
    }
}

pub fn record_upstream_reachable(reachable: bool) {
    gauge!("bridge_upstream_reachable").set(if reachable { 1.0 } else { 0.0 });
}
