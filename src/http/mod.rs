//! HTTP surface of the bridge.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, trace span, request timeout)
//!     → v1.rs  /v1/{resource}[/{id}]  → replay legacy answer
//!     → v2.rs  /v2/{resource}[/{id}]  → { source, data } or error envelope
//!     → health.rs /health[/circuit-breaker|/ready|/live]
//!     → response.rs (error envelope, byte-exact replay)
//! ```

pub mod health;
pub mod request;
pub mod response;
pub mod server;
pub mod v1;
pub mod v2;

pub use request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{AppState, HttpServer};
