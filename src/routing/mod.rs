//! Version routing.
//!
//! # Data Flow
//! ```text
//! /v1/{resource}[/{id}]
//!     → bridge.rs v1 (client fetch, replay status + body)
//!
//! /v2/{resource}[/{id}]
//!     → resource.rs (Lookup → cache key, legacy path)
//!     → bridge.rs v2 (cache hit → done; miss → fetch → transform → store)
//! ```
//!
//! # Design Decisions
//! - Errors and not-found results are never cached
//! - Cache write failures are logged; the response is still served
//! - List transforms skip bad records instead of failing the request

pub mod bridge;
pub mod resource;

pub use bridge::{Bridge, BridgeError, Source, Sourced, V2Data};
pub use resource::{Lookup, Resource, UnknownResource};
