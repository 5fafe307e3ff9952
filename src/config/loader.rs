//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::BridgeConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value {value:?} for environment variable {var}")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: optional TOML file, then environment overrides, then validation.
pub fn load_config(path: Option<&Path>) -> Result<BridgeConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => BridgeConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply the environment variables that may override file settings.
///
/// `lookup` abstracts the environment so tests don't mutate process state.
pub fn apply_env_overrides<F>(config: &mut BridgeConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("LEGACY_API_URL") {
        config.legacy.base_url = url;
    }
    if let Some(addr) = lookup("BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }
    if let Some(v) = parse_env(&lookup, "LEGACY_TIMEOUT_MS")? {
        config.legacy.request_timeout_ms = v;
    }
    if let Some(v) = parse_env(&lookup, "LEGACY_MAX_RETRIES")? {
        config.legacy.max_retries = v;
    }
    if let Some(v) = parse_env(&lookup, "CACHE_TTL_SECONDS")? {
        config.cache.ttl_secs = v;
    }
    if let Some(v) = parse_env(&lookup, "BREAKER_FAILURE_THRESHOLD")? {
        config.circuit_breaker.failure_threshold = v;
    }
    if let Some(v) = parse_env(&lookup, "BREAKER_RESET_TIMEOUT_MS")? {
        config.circuit_breaker.reset_timeout_ms = v;
    }
    Ok(())
}

fn parse_env<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { var, value }),
        None => Ok(None),
    }
}
