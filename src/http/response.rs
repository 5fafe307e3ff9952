//! Response rendering: the v2 error envelope and v1 replay.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::routing::BridgeError;
use crate::transform::to_iso8601;
use crate::upstream::{UpstreamError, UpstreamResponse};

/// Structured API error rendered as
/// `{ "error": { "code", "message", "timestamp", "path" } }`.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub path: String,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
    timestamp: String,
    path: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>, path: &str) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            path: path.to_string(),
        }
    }

    pub fn not_found(path: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", format!("no route for {}", path), path)
    }

    pub fn from_bridge(err: &BridgeError, path: &str) -> Self {
        Self::new(err.status_code(), err.error_code(), err.to_string(), path)
    }

    /// v1 calls that never got an answer from the legacy service.
    pub fn from_upstream(err: UpstreamError, path: &str) -> Self {
        Self::from_bridge(&BridgeError::Upstream(err), path)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = ErrorEnvelope {
            error: ErrorBody {
                code: self.code,
                message: &self.message,
                timestamp: to_iso8601(&chrono::Utc::now()),
                path: &self.path,
            },
        };
        (self.status, Json(envelope)).into_response()
    }
}

/// Replay a legacy answer: same status, same content type, same bytes.
pub fn replay(upstream: UpstreamResponse) -> Response {
    let mut response = Response::new(Body::from(upstream.body));
    *response.status_mut() = upstream.status;
    if let Some(content_type) = upstream.content_type {
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    response
}
