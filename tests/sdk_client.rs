//! The Rust SDK against a live bridge.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use bridge_sdk::{BridgeClient, SdkError};
use reqwest::StatusCode;
use serde_json::json;

mod common;

fn legacy_backend_body(target: &str) -> (u16, String) {
    let path = target.split('?').next().unwrap_or(target);
    match path {
        "/legacy/payments/1" => (
            200,
            json!({"id": 1, "amount": "12.50", "currency": "gbp", "status": "success",
                   "customer_id": 9, "created_at": "2023-03-01 12:00:00"})
            .to_string(),
        ),
        "/legacy/customers" => (
            200,
            json!([
                {"id": 9, "first_name": "Ada", "last_name": "Lovelace",
                 "meta": {"tier": "gold"}, "created_at": "2022-12-10"}
            ])
            .to_string(),
        ),
        _ => (404, json!({"error": "missing"}).to_string()),
    }
}

#[tokio::test]
async fn test_sdk_round_trip() {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = hits.clone();
    let backend = common::start_programmable_backend(move |req| {
        counter.fetch_add(1, Ordering::SeqCst);
        let answer = legacy_backend_body(&req.target);
        async move { answer }
    })
    .await;
    let bridge = common::start_bridge(common::test_config(backend)).await;
    let sdk = BridgeClient::with_client(common::http_client(), &bridge.url("/")).unwrap();

    let payment = sdk.payment("1").await.unwrap();
    assert_eq!(payment.source, "legacy");
    assert_eq!(payment.data.amount, 12.5);
    assert_eq!(payment.data.currency, "GBP");
    assert_eq!(payment.data.status, "completed");
    assert_eq!(payment.data.customer_id, "9");
    assert_eq!(payment.data.created_at, "2023-03-01T12:00:00.000Z");

    let again = sdk.payment("1").await.unwrap();
    assert_eq!(again.source, "cache");
    assert_eq!(again.data, payment.data);

    let customers = sdk.customers(&[("page", "1")]).await.unwrap();
    assert_eq!(customers.data.len(), 1);
    assert_eq!(customers.data[0].full_name, "Ada Lovelace");
    assert_eq!(customers.data[0].email, None);
    assert_eq!(customers.data[0].metadata["tier"], "gold");

    sdk.clear_cache(Some("payments")).await.unwrap();
    let refetched = sdk.payment("1").await.unwrap();
    assert_eq!(refetched.source, "legacy");
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_sdk_surfaces_error_envelope() {
    let backend = common::start_programmable_backend(|req| {
        let answer = legacy_backend_body(&req.target);
        async move { answer }
    })
    .await;
    let bridge = common::start_bridge(common::test_config(backend)).await;
    let sdk = BridgeClient::with_client(common::http_client(), &bridge.url("")).unwrap();

    let err = sdk.payment("404").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    match err {
        SdkError::Api { envelope, .. } => {
            assert_eq!(envelope.error.code, "NOT_FOUND");
            assert_eq!(envelope.error.path, "/v2/payments/404");
        }
        other => panic!("expected an error envelope, got {:?}", other),
    }

    let err = sdk.clear_cache(Some("invoices")).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn test_sdk_health_surface() {
    let bridge = common::start_bridge(common::test_config(common::closed_addr().await)).await;
    let sdk = BridgeClient::with_client(common::http_client(), &bridge.url("")).unwrap();

    let (status, report) = sdk.health().await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["status"], "degraded");

    let breaker = sdk.circuit_breaker().await.unwrap();
    assert_eq!(breaker.state, "closed");
    assert_eq!(breaker.failures, 0);
    assert_eq!(breaker.last_failure_time, None);

    assert!(sdk.ready().await.unwrap());
}
