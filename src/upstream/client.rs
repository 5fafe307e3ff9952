//! Resilient HTTP client for the legacy service.
//!
//! # Responsibilities
//! - Build upstream URLs from base URL, prefix, path segments and query
//! - Enforce per-attempt timeouts and the overall retry budget
//! - Retry connection failures, timeouts and 5xx with jittered backoff
//! - Surface 4xx immediately, 404 as its own variant
//! - Ask the circuit breaker before every attempt and report the outcome
//!
//! Cancellation: dropping the future returned by [`LegacyClient::fetch`]
//! drops the in-flight hyper request and any pending backoff sleep.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time::Instant;
use url::Url;

use crate::config::LegacyConfig;
use crate::health::passive::PassiveHealth;
use crate::http::request::X_REQUEST_ID;
use crate::observability::metrics;
use crate::resilience::{CircuitBreaker, RetryPolicy};
use crate::upstream::{UpstreamError, UpstreamRequest, UpstreamResponse};

const USER_AGENT: &str = concat!("legacy-bridge/", env!("CARGO_PKG_VERSION"));

/// Client for the legacy upstream. Holds no breaker logic; it only asks
/// the injected breaker for a permit per attempt.
#[derive(Clone)]
pub struct LegacyClient {
    http: Client<HttpConnector, Body>,
    base_url: Url,
    path_prefix: String,
    policy: RetryPolicy,
    max_body_bytes: usize,
    breaker: Arc<CircuitBreaker>,
    passive: Arc<PassiveHealth>,
}

impl LegacyClient {
    pub fn new(
        config: &LegacyConfig,
        breaker: Arc<CircuitBreaker>,
        passive: Arc<PassiveHealth>,
    ) -> Result<Self, UpstreamError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| UpstreamError::InvalidRequest(format!("base url {}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(UpstreamError::InvalidRequest(format!(
                "base url {} cannot carry a path",
                config.base_url
            )));
        }

        let http = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            http,
            base_url,
            path_prefix: config.path_prefix.trim_matches('/').to_string(),
            policy: RetryPolicy::from_config(config),
            max_body_bytes: config.max_body_bytes,
            breaker,
            passive,
        })
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET a resource, retrying transient failures within the budget.
    pub async fn fetch(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let url = self.resource_url(request)?;
        let path = request.display_path();
        let deadline = self.policy.start();
        let mut attempt: u32 = 0;
        let mut last_error: Option<UpstreamError> = None;

        loop {
            attempt += 1;

            let permit = match self.breaker.try_acquire() {
                Ok(permit) => permit,
                Err(refusal) => {
                    metrics::record_upstream_attempt("circuit_open");
                    tracing::debug!(
                        request_id = request.request_id.as_deref().unwrap_or("-"),
                        path = %path,
                        attempt,
                        reason = %refusal,
                        "Upstream call refused by circuit breaker"
                    );
                    // A retry refused mid-sequence reports the failure that tripped it.
                    return Err(last_error.unwrap_or(UpstreamError::CircuitOpen));
                }
            };

            let timeout = deadline.attempt_timeout(&self.policy);
            let started = Instant::now();
            let outcome = self.send(&url, request, timeout).await;
            let latency = started.elapsed();

            let err = match outcome {
                Ok(response) => {
                    permit.record_success();
                    self.passive.record_success(latency);
                    metrics::record_upstream_attempt("ok");
                    tracing::debug!(
                        request_id = request.request_id.as_deref().unwrap_or("-"),
                        path = %path,
                        attempt,
                        status = %response.status,
                        latency_ms = latency.as_millis() as u64,
                        "Upstream call succeeded"
                    );
                    return Ok(response);
                }
                Err(err) => err,
            };

            metrics::record_upstream_attempt(err.kind());
            match &err {
                // Never reached the network; says nothing about upstream health.
                UpstreamError::InvalidRequest(_) => drop(permit),
                e if e.is_upstream_failure() => {
                    permit.record_failure();
                    self.passive.record_failure();
                }
                _ => {
                    permit.record_success();
                    self.passive.record_success(latency);
                }
            }

            if !err.is_retryable() {
                return Err(err);
            }

            tracing::warn!(
                request_id = request.request_id.as_deref().unwrap_or("-"),
                path = %path,
                attempt,
                error = %err,
                "Upstream attempt failed"
            );

            if attempt >= self.policy.max_attempts() {
                return Err(err);
            }

            let delay = self.policy.backoff.delay(attempt);
            if !deadline.allows(delay) {
                tracing::warn!(
                    path = %path,
                    attempt,
                    "Retry budget exhausted"
                );
                return Err(err);
            }

            tracing::info!(
                request_id = request.request_id.as_deref().unwrap_or("-"),
                path = %path,
                attempt,
                delay = ?delay,
                "Retrying upstream call"
            );
            last_error = Some(err);
            tokio::time::sleep(delay).await;
        }
    }

    /// One GET against an arbitrary path on the base URL, bypassing the
    /// breaker and retries. Used by the health probe.
    pub async fn probe(&self, path: &str, timeout: Duration) -> Result<UpstreamResponse, UpstreamError> {
        let mut url = self.base_url.clone();
        let joined = format!("{}/{}", url.path().trim_end_matches('/'), path.trim_start_matches('/'));
        url.set_path(&joined);
        url.set_query(None);
        self.send(&url, &UpstreamRequest::default(), timeout).await
    }

    fn resource_url(&self, request: &UpstreamRequest) -> Result<Url, UpstreamError> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| UpstreamError::InvalidRequest("base url cannot carry a path".into()))?;
            segments.pop_if_empty();
            if !self.path_prefix.is_empty() {
                segments.extend(self.path_prefix.split('/'));
            }
            segments.extend(request.segments.iter());
        }
        if let Some(raw) = &request.raw_query {
            url.set_query(Some(raw.as_str()));
        } else if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        Ok(url)
    }

    async fn send(
        &self,
        url: &Url,
        request: &UpstreamRequest,
        timeout: Duration,
    ) -> Result<UpstreamResponse, UpstreamError> {
        if timeout.is_zero() {
            return Err(UpstreamError::Timeout(timeout));
        }

        let mut builder = Request::builder()
            .method(Method::GET)
            .uri(url.as_str())
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, USER_AGENT);
        if let Some(id) = &request.request_id {
            builder = builder.header(X_REQUEST_ID, id.as_str());
        }
        let req = builder
            .body(Body::empty())
            .map_err(|e| UpstreamError::InvalidRequest(e.to_string()))?;

        let exchange = async {
            let response = self
                .http
                .request(req)
                .await
                .map_err(|e| UpstreamError::Network(e.to_string()))?;
            let (parts, body) = response.into_parts();
            let body = axum::body::to_bytes(Body::new(body), self.max_body_bytes)
                .await
                .map_err(|e| UpstreamError::Network(format!("reading body: {}", e)))?;
            Ok::<_, UpstreamError>(UpstreamResponse {
                status: parts.status,
                content_type: parts.headers.get(header::CONTENT_TYPE).cloned(),
                body,
            })
        };

        let response = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| UpstreamError::Timeout(timeout))??;

        classify(response)
    }
}

fn classify(response: UpstreamResponse) -> Result<UpstreamResponse, UpstreamError> {
    let status = response.status;
    if status.is_success() {
        Ok(response)
    } else if status == StatusCode::NOT_FOUND {
        Err(UpstreamError::NotFound(response))
    } else if status.is_server_error() {
        Err(UpstreamError::Server(response))
    } else {
        Err(UpstreamError::Client(response))
    }
}
