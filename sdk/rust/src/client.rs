use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::types::{BreakerState, Customer, ErrorEnvelope, Payment, Readiness, Sourced};

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The bridge answered with its structured error envelope.
    #[error("bridge returned {status}: {}", .envelope.error.message)]
    Api {
        status: StatusCode,
        envelope: ErrorEnvelope,
    },

    #[error("invalid bridge url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unexpected response {status}: {body}")]
    Unexpected { status: StatusCode, body: String },
}

impl SdkError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SdkError::Transport(e) => e.status(),
            SdkError::InvalidUrl(_) => None,
            SdkError::Api { status, .. } | SdkError::Unexpected { status, .. } => Some(*status),
        }
    }
}

pub struct BridgeClient {
    client: Client,
    base_url: Url,
}

impl BridgeClient {
    pub fn new(base_url: &str) -> Result<Self, SdkError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, SdkError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(SdkError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        Ok(Self { client, base_url })
    }

    pub async fn payment(&self, id: &str) -> Result<Sourced<Payment>, SdkError> {
        self.get_json(&["v2", "payments", id], &[]).await
    }

    pub async fn payments(&self, query: &[(&str, &str)]) -> Result<Sourced<Vec<Payment>>, SdkError> {
        self.get_json(&["v2", "payments"], query).await
    }

    pub async fn customer(&self, id: &str) -> Result<Sourced<Customer>, SdkError> {
        self.get_json(&["v2", "customers", id], &[]).await
    }

    pub async fn customers(&self, query: &[(&str, &str)]) -> Result<Sourced<Vec<Customer>>, SdkError> {
        self.get_json(&["v2", "customers"], query).await
    }

    /// The aggregate `/health` report. Returned even when the bridge says 503.
    pub async fn health(&self) -> Result<(StatusCode, Value), SdkError> {
        let resp = self.client.get(self.url(&["health"])).send().await?;
        let status = resp.status();
        Ok((status, resp.json().await?))
    }

    pub async fn circuit_breaker(&self) -> Result<BreakerState, SdkError> {
        self.get_json(&["health", "circuit-breaker"], &[]).await
    }

    pub async fn ready(&self) -> Result<bool, SdkError> {
        let resp = self.client.get(self.url(&["health", "ready"])).send().await?;
        let readiness: Readiness = resp.json().await?;
        Ok(readiness.ready)
    }

    pub async fn clear_cache(&self, resource: Option<&str>) -> Result<(), SdkError> {
        let mut segments = vec!["v2", "cache"];
        segments.extend(resource);
        let resp = self.client.delete(self.url(&segments)).send().await?;
        if resp.status() == StatusCode::NO_CONTENT {
            Ok(())
        } else {
            Err(error_from(resp).await)
        }
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, SdkError> {
        let resp = self
            .client
            .get(self.url(segments))
            .query(query)
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(resp.json().await?)
        } else {
            Err(error_from(resp).await)
        }
    }
}

async fn error_from(resp: Response) -> SdkError {
    let status = resp.status();
    let body = match resp.text().await {
        Ok(body) => body,
        Err(e) => return SdkError::Transport(e),
    };
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => SdkError::Api { status, envelope },
        Err(_) => SdkError::Unexpected { status, body },
    }
}
