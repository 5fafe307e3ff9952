//! Version-aware request handling behind the HTTP layer.
//!
//! v1 replays the legacy answer unchanged. v2 is cache-aside: a hit never
//! touches the upstream; a miss fetches, transforms and stores the result.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::cache::{CacheKey, ResponseCache};
use crate::config::CacheConfig;
use crate::observability::metrics;
use crate::routing::resource::{Lookup, Resource};
use crate::transform::{self, Skipped, TransformError, V2Customer, V2Payment};
use crate::upstream::{LegacyClient, UpstreamError, UpstreamRequest, UpstreamResponse};

/// Transformed payload as stored in the cache and rendered under `data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum V2Data {
    Payment(V2Payment),
    Payments(Vec<V2Payment>),
    Customer(V2Customer),
    Customers(Vec<V2Customer>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Legacy,
}

/// v2 response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sourced {
    pub source: Source,
    pub data: V2Data,
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("legacy payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("legacy payload rejected: {0}")]
    Transform(#[from] TransformError),
}

impl BridgeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::Upstream(UpstreamError::NotFound(_)) => StatusCode::NOT_FOUND,
            BridgeError::Upstream(UpstreamError::Client(response)) => response.status,
            BridgeError::Upstream(UpstreamError::InvalidRequest(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            BridgeError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
            BridgeError::Payload(_) | BridgeError::Transform(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            BridgeError::Upstream(UpstreamError::NotFound(_)) => "NOT_FOUND",
            BridgeError::Upstream(UpstreamError::Client(_)) => "UPSTREAM_REJECTED",
            BridgeError::Upstream(UpstreamError::CircuitOpen) => "CIRCUIT_OPEN",
            BridgeError::Upstream(UpstreamError::Timeout(_)) => "UPSTREAM_TIMEOUT",
            BridgeError::Upstream(UpstreamError::InvalidRequest(_)) => "INTERNAL_ERROR",
            BridgeError::Upstream(_) => "UPSTREAM_UNAVAILABLE",
            BridgeError::Payload(_) | BridgeError::Transform(_) => "INVALID_UPSTREAM_PAYLOAD",
        }
    }
}

/// Routes versioned requests to the legacy client and the response cache.
pub struct Bridge {
    client: LegacyClient,
    cache: Arc<ResponseCache<V2Data>>,
    ttl: Duration,
}

impl Bridge {
    pub fn new(client: LegacyClient, cache: Arc<ResponseCache<V2Data>>, ttl: Duration) -> Self {
        Self { client, cache, ttl }
    }

    pub fn from_config(client: LegacyClient, config: &CacheConfig) -> Self {
        let cache = Arc::new(ResponseCache::new(config.max_entries));
        Self::new(client, cache, Duration::from_secs(config.ttl_secs))
    }

    pub fn client(&self) -> &LegacyClient {
        &self.client
    }

    pub fn cache(&self) -> &Arc<ResponseCache<V2Data>> {
        &self.cache
    }

    /// v1: forward and hand back whatever the legacy service answered.
    ///
    /// `Err` only when there was no answer at all (network, timeout, open
    /// circuit) or the request could not be built.
    pub async fn v1(
        &self,
        resource: Resource,
        id: Option<&str>,
        query: Option<&str>,
        request_id: Option<String>,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let mut segments = vec![resource.as_str().to_string()];
        segments.extend(id.map(str::to_string));
        let request = UpstreamRequest::new(segments)
            .with_raw_query(query)
            .with_request_id(request_id);

        match self.client.fetch(&request).await {
            Ok(response) => Ok(response),
            Err(UpstreamError::Server(response))
            | Err(UpstreamError::NotFound(response))
            | Err(UpstreamError::Client(response)) => Ok(response),
            Err(err) => Err(err),
        }
    }

    /// v2: cache-aside fetch and transform.
    pub async fn v2(
        &self,
        resource: Resource,
        lookup: Lookup,
        request_id: Option<String>,
    ) -> Result<Sourced, BridgeError> {
        let key = lookup.cache_key(resource);
        if let Some(data) = self.cache.get(&key) {
            metrics::record_cache_lookup(resource.as_str(), true);
            tracing::debug!(key = %key, "Cache hit");
            return Ok(Sourced {
                source: Source::Cache,
                data,
            });
        }
        metrics::record_cache_lookup(resource.as_str(), false);

        let request = UpstreamRequest::new(lookup.segments(resource))
            .with_query(lookup.query().to_vec())
            .with_request_id(request_id.clone());
        let response = self.client.fetch(&request).await?;
        let body = response.json()?;

        let data = match (resource, &lookup) {
            (Resource::Payments, Lookup::ById(_)) => V2Data::Payment(transform::transform_payment(&body)?),
            (Resource::Customers, Lookup::ById(_)) => V2Data::Customer(transform::transform_customer(&body)?),
            (Resource::Payments, Lookup::List(_)) => {
                let batch = transform::transform_payments(&body)?;
                report_skipped(resource, &batch.skipped, request_id.as_deref());
                V2Data::Payments(batch.items)
            }
            (Resource::Customers, Lookup::List(_)) => {
                let batch = transform::transform_customers(&body)?;
                report_skipped(resource, &batch.skipped, request_id.as_deref());
                V2Data::Customers(batch.items)
            }
        };

        self.store(key, data.clone());
        Ok(Sourced {
            source: Source::Legacy,
            data,
        })
    }

    /// Drop cached entries for one resource, or everything.
    pub fn invalidate(&self, resource: Option<Resource>) -> usize {
        match resource {
            Some(resource) => {
                let removed = self
                    .cache
                    .invalidate_prefix(&CacheKey::resource_prefix(resource.as_str()));
                tracing::info!(resource = %resource, removed, "Cache invalidated");
                removed
            }
            None => {
                let removed = self.cache.len();
                self.cache.clear();
                tracing::info!(removed, "Cache cleared");
                removed
            }
        }
    }

    fn store(&self, key: CacheKey, data: V2Data) {
        if let Err(e) = self.cache.set(key.clone(), data, self.ttl) {
            tracing::warn!(key = %key, error = %e, "Cache write failed, serving uncached");
        }
    }
}

fn report_skipped(resource: Resource, skipped: &[Skipped], request_id: Option<&str>) {
    for record in skipped {
        tracing::warn!(
            request_id = request_id.unwrap_or("-"),
            resource = %resource,
            index = record.index,
            error = %record.error,
            "Skipping malformed legacy record"
        );
    }
    metrics::record_transform_skipped(resource.as_str(), skipped.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LegacyConfig;
    use crate::health::passive::PassiveHealth;
    use crate::resilience::CircuitBreaker;
    use crate::transform::transform_payment;
    use serde_json::json;

    async fn closed_port() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    async fn bridge() -> Bridge {
        let config = LegacyConfig {
            base_url: closed_port().await,
            max_retries: 0,
            request_timeout_ms: 500,
            ..LegacyConfig::default()
        };
        let breaker = Arc::new(CircuitBreaker::new(3, Duration::from_secs(30)));
        let client = LegacyClient::new(&config, breaker, Arc::new(PassiveHealth::new())).unwrap();
        Bridge::new(client, Arc::new(ResponseCache::new(100)), Duration::from_secs(60))
    }

    fn sample_payment() -> V2Payment {
        transform_payment(&json!({
            "id": 1, "amount": 10, "customer_id": 2, "created_at": "2023-01-01"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_cache_hit_skips_upstream() {
        let bridge = bridge().await;
        let lookup = Lookup::ById("1".into());
        bridge
            .cache()
            .set(
                lookup.cache_key(Resource::Payments),
                V2Data::Payment(sample_payment()),
                Duration::from_secs(60),
            )
            .unwrap();

        let sourced = bridge.v2(Resource::Payments, lookup, None).await.unwrap();
        assert_eq!(sourced.source, Source::Cache);
        assert_eq!(bridge.client().breaker().status().failure_count, 0);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_503_and_not_cached() {
        let bridge = bridge().await;
        let err = bridge
            .v2(Resource::Payments, Lookup::ById("1".into()), None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(bridge.cache().is_empty());

        let err = bridge
            .v1(Resource::Payments, Some("1"), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Network(_)));
    }

    #[test]
    fn test_error_status_mapping() {
        let not_found = BridgeError::from(UpstreamError::NotFound(UpstreamResponse::new(
            StatusCode::NOT_FOUND,
            None,
            "",
        )));
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let rejected = BridgeError::from(UpstreamError::Client(UpstreamResponse::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            None,
            "",
        )));
        assert_eq!(rejected.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        assert_eq!(
            BridgeError::from(UpstreamError::CircuitOpen).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            BridgeError::from(UpstreamError::Timeout(Duration::from_secs(1))).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            BridgeError::from(TransformError::MissingField("id")).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_sourced_shape() {
        let body = serde_json::to_value(Sourced {
            source: Source::Legacy,
            data: V2Data::Payments(vec![sample_payment()]),
        })
        .unwrap();
        assert_eq!(body["source"], "legacy");
        assert_eq!(body["data"][0]["customerId"], "2");
    }

    #[tokio::test]
    async fn test_invalidate_by_resource() {
        let bridge = bridge().await;
        let ttl = Duration::from_secs(60);
        let payment = V2Data::Payment(sample_payment());
        bridge.cache().set(CacheKey::by_id("payments", "1"), payment.clone(), ttl).unwrap();
        bridge.cache().set(CacheKey::by_id("customers", "1"), payment, ttl).unwrap();

        assert_eq!(bridge.invalidate(Some(Resource::Payments)), 1);
        assert_eq!(bridge.invalidate(None), 1);
        assert!(bridge.cache().is_empty());
    }
}
