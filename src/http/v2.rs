//! `/v2`: stable, transformed, cached.

use std::time::Instant;

use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::http::request::RequestIdExt;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::routing::{Lookup, Resource};

pub async fn list(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(query): Query<Vec<(String, String)>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    serve(state, &resource, Lookup::List(query), uri.path(), &headers).await
}

pub async fn get_one(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    serve(state, &resource, Lookup::ById(id), uri.path(), &headers).await
}

async fn serve(
    state: AppState,
    resource: &str,
    lookup: Lookup,
    path: &str,
    headers: &HeaderMap,
) -> Response {
    let start = Instant::now();
    let response = match resource.parse::<Resource>() {
        Err(_) => ApiError::not_found(path).into_response(),
        Ok(resource) => match state.bridge.v2(resource, lookup, headers.request_id()).await {
            Ok(sourced) => (StatusCode::OK, Json(sourced)).into_response(),
            Err(err) => {
                if err.status_code().is_server_error() {
                    tracing::warn!(path = %path, error = %err, "v2 request failed");
                } else {
                    tracing::debug!(path = %path, error = %err, "v2 request rejected");
                }
                ApiError::from_bridge(&err, path).into_response()
            }
        },
    };
    metrics::record_request("v2", response.status().as_u16(), start);
    response
}

/// `DELETE /v2/cache`
pub async fn clear_cache(State(state): State<AppState>) -> StatusCode {
    state.bridge.invalidate(None);
    StatusCode::NO_CONTENT
}

/// `DELETE /v2/cache/{resource}`
pub async fn invalidate_resource(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    OriginalUri(uri): OriginalUri,
) -> Response {
    match resource.parse::<Resource>() {
        Ok(resource) => {
            state.bridge.invalidate(Some(resource));
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string(), uri.path())
            .into_response(),
    }
}
