//! Legacy API bridge library.
//!
//! Puts a stable, versioned HTTP surface in front of a fragile legacy
//! service: `/v1` replays the legacy answers unchanged, `/v2` serves cached,
//! schema-normalized data, and `/health` reports on both.

pub mod cache;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod transform;
pub mod upstream;

pub use config::BridgeConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
