//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and URLs. All
//! violations are collected rather than stopping at the first one.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::BridgeConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("not a socket address: {}", config.listener.bind_address),
        ));
    }

    match Url::parse(&config.legacy.base_url) {
        Ok(url) if url.scheme() == "http" => {}
        Ok(url) => errors.push(ValidationError::new(
            "legacy.base_url",
            format!("unsupported scheme {}", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("legacy.base_url", e.to_string())),
    }

    if !config.legacy.path_prefix.is_empty() && !config.legacy.path_prefix.starts_with('/') {
        errors.push(ValidationError::new("legacy.path_prefix", "must start with '/'"));
    }
    if config.legacy.request_timeout_ms == 0 {
        errors.push(ValidationError::new("legacy.request_timeout_ms", "must be > 0"));
    }
    if config.legacy.retry_budget_ms < config.legacy.request_timeout_ms {
        errors.push(ValidationError::new(
            "legacy.retry_budget_ms",
            "must be at least legacy.request_timeout_ms",
        ));
    }
    if config.legacy.max_delay_ms < config.legacy.base_delay_ms {
        errors.push(ValidationError::new(
            "legacy.max_delay_ms",
            "must be at least legacy.base_delay_ms",
        ));
    }
    if config.legacy.max_body_bytes == 0 {
        errors.push(ValidationError::new("legacy.max_body_bytes", "must be > 0"));
    }

    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError::new("circuit_breaker.failure_threshold", "must be > 0"));
    }
    if config.circuit_breaker.reset_timeout_ms == 0 {
        errors.push(ValidationError::new("circuit_breaker.reset_timeout_ms", "must be > 0"));
    }

    if config.cache.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("cache.sweep_interval_secs", "must be > 0"));
    }
    if config.cache.max_entries == 0 {
        errors.push(ValidationError::new("cache.max_entries", "must be > 0"));
    }

    if config.health.probe_enabled {
        if config.health.probe_interval_secs == 0 {
            errors.push(ValidationError::new("health.probe_interval_secs", "must be > 0"));
        }
        if config.health.probe_timeout_ms == 0 {
            errors.push(ValidationError::new("health.probe_timeout_ms", "must be > 0"));
        }
        if !config.health.probe_path.starts_with('/') {
            errors.push(ValidationError::new("health.probe_path", "must start with '/'"));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            "expected \"pretty\" or \"json\"",
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&BridgeConfig::default()), Ok(()));
    }

    #[test]
    fn test_reports_every_violation() {
        let mut config = BridgeConfig::default();
        config.legacy.base_url = "ftp://legacy".into();
        config.circuit_breaker.failure_threshold = 0;
        config.cache.max_entries = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "legacy.base_url",
                "circuit_breaker.failure_threshold",
                "cache.max_entries"
            ]
        );
    }

    #[test]
    fn test_budget_must_cover_one_attempt() {
        let mut config = BridgeConfig::default();
        config.legacy.request_timeout_ms = 10_000;
        config.legacy.retry_budget_ms = 1_000;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "legacy.retry_budget_ms");
    }
}
