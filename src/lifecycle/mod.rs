//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT, token, deadline, trigger → stop request
//!
//! Shutdown (shutdown.rs):
//!     start listener ─┬─ listener fails → return its error
//!                     └─ stop request → disable keep-alives
//!                                      → deregistration delay
//!                                      → bounded drain → result
//! ```
//!
//! # Design Decisions
//! - One run per server handle; nothing is reused across runs
//! - Shutdown is strictly sequential and cannot be aborted once started
//! - Drain has a deadline: remaining connections are force-closed

pub mod error;
pub mod shutdown;
pub mod signals;

pub use error::ServeError;
pub use shutdown::{
    listen_and_serve, listen_and_serve_tls, run, ServerHandle, ShutdownConfig, DEFAULT_DRAIN_TIMEOUT,
    DEFAULT_SHUTDOWN_DELAY,
};
pub use signals::{CancellationSignal, Deadline, OsSignal, StopSubscription, StopTrigger};
