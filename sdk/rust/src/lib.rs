//! Typed client for the legacy bridge's v2 and health surfaces.

pub mod client;
pub mod types;

pub use client::{BridgeClient, SdkError};
pub use types::*;
