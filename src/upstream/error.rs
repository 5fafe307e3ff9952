//! Upstream failure taxonomy.

use std::time::Duration;

use thiserror::Error;

use crate::upstream::UpstreamResponse;

/// Errors produced by a call to the legacy service.
///
/// Variants that correspond to an actual HTTP answer carry the response so
/// the v1 surface can replay it unchanged.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection could not be established or broke mid-flight.
    #[error("network error: {0}")]
    Network(String),

    /// An attempt exceeded its deadline.
    #[error("upstream timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The legacy service answered with a 5xx status.
    #[error("upstream server error: {}", .0.status)]
    Server(UpstreamResponse),

    /// The legacy service reported the resource as missing.
    #[error("resource not found upstream")]
    NotFound(UpstreamResponse),

    /// The legacy service rejected the request (4xx other than 404).
    #[error("upstream rejected request: {}", .0.status)]
    Client(UpstreamResponse),

    /// The circuit breaker refused the call before any network attempt.
    #[error("circuit breaker is open")]
    CircuitOpen,

    /// The request could not be built (bad path, invalid URL).
    #[error("invalid upstream request: {0}")]
    InvalidRequest(String),
}

impl UpstreamError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            UpstreamError::Network(_) | UpstreamError::Timeout(_) | UpstreamError::Server(_)
        )
    }

    /// Whether this outcome says something bad about upstream health.
    ///
    /// 4xx answers prove the upstream is alive, so they do not count against
    /// the circuit breaker.
    pub fn is_upstream_failure(&self) -> bool {
        self.is_retryable()
    }

    /// The upstream's own answer, when there was one.
    pub fn response(&self) -> Option<&UpstreamResponse> {
        match self {
            UpstreamError::Server(r) | UpstreamError::NotFound(r) | UpstreamError::Client(r) => {
                Some(r)
            }
            _ => None,
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Network(_) => "network",
            UpstreamError::Timeout(_) => "timeout",
            UpstreamError::Server(_) => "server_error",
            UpstreamError::NotFound(_) => "not_found",
            UpstreamError::Client(_) => "client_error",
            UpstreamError::CircuitOpen => "circuit_open",
            UpstreamError::InvalidRequest(_) => "invalid_request",
        }
    }
}
