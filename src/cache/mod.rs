//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! v2 request
//!     → key.rs (deterministic key per resource + id / query)
//!     → store.rs get (lazy expiry check)
//!     → hit: serve; miss: caller fetches, transforms, then store.rs set
//! Background:
//!     sweeper task → store.rs sweep_expired (until shutdown)
//! ```
//!
//! # Design Decisions
//! - Cache-aside only: the cache never talks to the upstream
//! - In-memory, per process; nothing is persisted
//! - Errors and not-found results are never written

pub mod key;
pub mod store;

pub use key::CacheKey;
pub use store::{CacheError, CacheStatus, ResponseCache};
