//! `/v1`: legacy-shaped passthrough. The query string is forwarded untouched.

use std::time::Instant;

use axum::extract::{OriginalUri, Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};

use crate::http::request::RequestIdExt;
use crate::http::response::{replay, ApiError};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::routing::Resource;

pub async fn list(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    passthrough(state, &resource, None, uri.query(), uri.path(), &headers).await
}

pub async fn get_one(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    passthrough(state, &resource, Some(&id), uri.query(), uri.path(), &headers).await
}

async fn passthrough(
    state: AppState,
    resource: &str,
    id: Option<&str>,
    query: Option<&str>,
    path: &str,
    headers: &HeaderMap,
) -> Response {
    let start = Instant::now();
    let Ok(resource) = resource.parse::<Resource>() else {
        let response = ApiError::not_found(path).into_response();
        metrics::record_request("v1", response.status().as_u16(), start);
        return response;
    };

    let response = match state
        .bridge
        .v1(resource, id, query, headers.request_id())
        .await
    {
        Ok(upstream) => replay(upstream),
        Err(err) => {
            tracing::warn!(path = %path, error = %err, "Legacy service did not answer");
            ApiError::from_upstream(err, path).into_response()
        }
    };
    metrics::record_request("v1", response.status().as_u16(), start);
    response
}
