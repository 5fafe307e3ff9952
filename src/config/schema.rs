//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the bridge.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the legacy bridge.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Legacy upstream settings.
    pub legacy: LegacyConfig,

    /// Circuit breaker guarding the legacy upstream.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Health reporting and upstream probe settings.
    pub health: HealthConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Legacy upstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LegacyConfig {
    /// Base URL of the legacy service (scheme + authority, optional path).
    pub base_url: String,

    /// Path prefix prepended to every resource path (e.g. "/legacy").
    pub path_prefix: String,

    /// Timeout for a single upstream attempt in milliseconds.
    pub request_timeout_ms: u64,

    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Total time budget for one attempt sequence, in milliseconds.
    pub retry_budget_ms: u64,

    /// Largest upstream body accepted, in bytes.
    pub max_body_bytes: usize,
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:4000".to_string(),
            path_prefix: "/legacy".to_string(),
            request_timeout_ms: 5_000,
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 2_000,
            retry_budget_ms: 15_000,
            max_body_bytes: 4 * 1024 * 1024, // 4MB
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,

    /// Time the circuit stays open before admitting a trial call, in milliseconds.
    pub reset_timeout_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            reset_timeout_ms: 30_000,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Time-to-live for transformed responses in seconds. Zero disables caching.
    pub ttl_secs: u64,

    /// Interval between expired-entry sweeps in seconds.
    pub sweep_interval_secs: u64,

    /// Upper bound on stored entries.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60,
            sweep_interval_secs: 30,
            max_entries: 10_000,
        }
    }
}

/// Health reporting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Enable the active upstream probe.
    pub probe_enabled: bool,

    /// Path on the legacy service to probe.
    pub probe_path: String,

    /// Probe interval in seconds.
    pub probe_interval_secs: u64,

    /// Probe timeout in milliseconds.
    pub probe_timeout_ms: u64,

    /// Latency at or above which the upstream is considered slow.
    pub slow_threshold_ms: u64,

    /// How long a successful upstream call counts as proof of reachability.
    pub stale_after_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_enabled: true,
            probe_path: "/health".to_string(),
            probe_interval_secs: 10,
            probe_timeout_ms: 2_000,
            slow_threshold_ms: 1_000,
            stale_after_secs: 60,
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
