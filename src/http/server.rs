//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router for `/v1`, `/v2` and `/health`
//! - Wire up middleware (request id, tracing, request timeout)
//! - Serve until the shutdown signal fires, then drain

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::OriginalUri,
    http::Request,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::BridgeConfig;
use crate::health::HealthReporter;
use crate::http::request::{RequestIdExt, UuidRequestId};
use crate::http::response::ApiError;
use crate::http::{health, v1, v2};
use crate::routing::Bridge;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<Bridge>,
    pub health: Arc<HealthReporter>,
}

/// HTTP server for the bridge.
pub struct HttpServer {
    router: Router,
    config: BridgeConfig,
}

impl HttpServer {
    pub fn new(config: BridgeConfig, state: AppState) -> Self {
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(config: &BridgeConfig, state: AppState) -> Router {
        let v1_routes = Router::new()
            .route("/{resource}", get(v1::list))
            .route("/{resource}/{id}", get(v1::get_one));

        let v2_routes = Router::new()
            .route("/cache", delete(v2::clear_cache))
            .route("/cache/{resource}", delete(v2::invalidate_resource))
            .route("/{resource}", get(v2::list))
            .route("/{resource}/{id}", get(v2::get_one));

        Router::new()
            .nest("/v1", v1_routes)
            .nest("/v2", v2_routes)
            .route("/health", get(health::health))
            .route("/health/circuit-breaker", get(health::circuit_breaker))
            .route("/health/ready", get(health::ready))
            .route("/health/live", get(health::live))
            .fallback(fallback)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            path = %request.uri().path(),
                            request_id = %request.headers().request_id().unwrap_or_default(),
                        )
                    }))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            legacy = %self.config.legacy.base_url,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

async fn fallback(OriginalUri(uri): OriginalUri) -> Response {
    ApiError::not_found(uri.path()).into_response()
}
