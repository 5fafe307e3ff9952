//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → breaker + passive health → client → bridge, probe, reporter
//!     → spawn sweeper + probe → serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → server drains, tasks exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
pub use startup::{assemble, run, Components, StartupError};
