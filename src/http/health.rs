//! Health endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::http::server::AppState;
use crate::resilience::CircuitState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BreakerBody {
    state: CircuitState,
    failures: u32,
    last_failure_time: Option<DateTime<Utc>>,
}

/// `GET /health`: 200 unless unhealthy.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.health.report();
    (report.status.http_status(), Json(report))
}

/// `GET /health/circuit-breaker`
pub async fn circuit_breaker(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.health.breaker_status();
    Json(BreakerBody {
        state: status.state,
        failures: status.failure_count,
        last_failure_time: status.last_failure_time,
    })
}

/// `GET /health/ready`
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.health.is_ready();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(json!({ "ready": ready })))
}

/// `GET /health/live`: never looks at the upstream.
pub async fn live() -> impl IntoResponse {
    Json(json!({ "alive": true }))
}
