//! Legacy upstream subsystem.
//!
//! # Data Flow
//! ```text
//! UpstreamRequest (path segments, query pairs or raw query, request id)
//!     → client.rs (per attempt: breaker permit → GET with timeout → classify)
//!     → error.rs (retryable vs terminal)
//!     → UpstreamResponse (status, content type, raw body bytes)
//! ```
//!
//! # Design Decisions
//! - Bodies are kept as raw bytes so v1 can replay them byte-for-byte
//! - Every non-2xx answer becomes an error that still carries the response

pub mod client;
pub mod error;

use axum::body::Bytes;
use axum::http::{HeaderValue, StatusCode};

pub use client::LegacyClient;
pub use error::UpstreamError;

/// A GET request against the legacy service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamRequest {
    /// Path segments below the configured prefix, unencoded.
    pub segments: Vec<String>,
    /// Query pairs, form-encoded onto the URL.
    pub query: Vec<(String, String)>,
    /// Query string sent as-is; wins over `query` when set.
    pub raw_query: Option<String>,
    /// Correlation id forwarded as `x-request-id`.
    pub request_id: Option<String>,
}

impl UpstreamRequest {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_raw_query(mut self, raw_query: Option<&str>) -> Self {
        self.raw_query = raw_query.filter(|q| !q.is_empty()).map(str::to_string);
        self
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    /// Human-readable path for logs.
    pub fn display_path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

/// An answer from the legacy service, kept byte-exact.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn new(status: StatusCode, content_type: Option<&'static str>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: content_type.map(HeaderValue::from_static),
            body: body.into(),
        }
    }

    /// Parse the body as untyped JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = UpstreamRequest::new(["payments", "42"])
            .with_query(vec![("page".into(), "2".into())])
            .with_request_id(Some("abc".into()));
        assert_eq!(req.display_path(), "/payments/42");
        assert_eq!(req.query.len(), 1);
        assert_eq!(req.request_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_response_json() {
        let resp = UpstreamResponse::new(StatusCode::OK, Some("application/json"), r#"{"id":1}"#);
        assert_eq!(resp.json().unwrap()["id"], 1);

        let resp = UpstreamResponse::new(StatusCode::OK, None, "<html>");
        assert!(resp.json().is_err());
    }
}
