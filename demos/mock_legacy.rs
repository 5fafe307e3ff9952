//! A flaky pretend legacy API for trying the bridge by hand.
//!
//! ```text
//! cargo run --example mock_legacy            # listens on 127.0.0.1:4000
//! MOCK_FAIL_RATE=0.5 MOCK_DELAY_MS=300 cargo run --example mock_legacy
//! ```
//!
//! Serves `/legacy/payments[/{id}]`, `/legacy/customers[/{id}]` and `/health`
//! with snake_case records, string amounts and naive timestamps.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use rand::Rng;
use serde_json::{json, Value};

#[derive(Clone)]
struct Flakiness {
    fail_rate: f64,
    delay: Duration,
}

fn payments() -> Vec<Value> {
    vec![
        json!({"id": 1, "amount": "123.45", "currency": "usd", "status": "paid",
               "customer_id": 42, "created_at": "2023-01-01T00:00:00"}),
        json!({"id": 2, "amount": 19.99, "currency": "eur", "status": "declined",
               "customer_id": 42, "created_at": "2023-01-02 08:30:00"}),
        json!({"id": 3, "amount": "7", "status": "processing",
               "customer_id": 7, "created_at": 1672704000}),
        // Malformed on purpose: the bridge skips it in lists.
        json!({"id": 4, "amount": "-3.00", "currency": "usd", "status": "paid",
               "customer_id": 7, "created_at": "2023-01-04"}),
    ]
}

fn customers() -> Vec<Value> {
    vec![
        json!({"id": 42, "first_name": "Ada", "last_name": "Lovelace",
               "email": "ada@example.com", "meta": {"tier": "gold"},
               "created_at": "2022-12-10 09:15:00"}),
        json!({"id": 7, "first_name": "Grace", "last_name": null,
               "created_at": "2022-11-01"}),
    ]
}

async fn chaos(flaky: &Flakiness) -> Option<Response> {
    if !flaky.delay.is_zero() {
        tokio::time::sleep(flaky.delay).await;
    }
    if rand::thread_rng().gen_bool(flaky.fail_rate) {
        return Some((StatusCode::SERVICE_UNAVAILABLE, "legacy backend overloaded").into_response());
    }
    None
}

async fn list(State(flaky): State<Arc<Flakiness>>, records: Vec<Value>) -> Response {
    if let Some(failure) = chaos(&flaky).await {
        return failure;
    }
    let total = records.len();
    Json(json!({ "data": records, "total": total })).into_response()
}

async fn find(State(flaky): State<Arc<Flakiness>>, records: Vec<Value>, id: String) -> Response {
    if let Some(failure) = chaos(&flaky).await {
        return failure;
    }
    match records.into_iter().find(|r| r["id"].to_string() == id) {
        Some(record) => Json(record).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"error": "no such record"}))).into_response(),
    }
}

fn env_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let flaky = Arc::new(Flakiness {
        fail_rate: env_or("MOCK_FAIL_RATE", 0.2_f64).clamp(0.0, 1.0),
        delay: Duration::from_millis(env_or("MOCK_DELAY_MS", 50)),
    });

    let app = Router::new()
        .route("/health", get(|| async { Json(json!({"ok": true})) }))
        .route(
            "/legacy/payments",
            get(|state: State<Arc<Flakiness>>| list(state, payments())),
        )
        .route(
            "/legacy/payments/{id}",
            get(|state: State<Arc<Flakiness>>, Path(id): Path<String>| find(state, payments(), id)),
        )
        .route(
            "/legacy/customers",
            get(|state: State<Arc<Flakiness>>| list(state, customers())),
        )
        .route(
            "/legacy/customers/{id}",
            get(|state: State<Arc<Flakiness>>, Path(id): Path<String>| find(state, customers(), id)),
        )
        .with_state(flaky.clone());

    let addr: SocketAddr = env_or("MOCK_ADDR", SocketAddr::from(([127, 0, 0, 1], 4000)));
    println!(
        "Mock legacy API listening on http://{} (fail rate {:.0}%, delay {:?})",
        addr,
        flaky.fail_rate * 100.0,
        flaky.delay
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
