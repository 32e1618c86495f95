//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → axum-server accept loop (plain or rustls)
//!     → idle.rs (per-connection idle timeout)
//!     → tls.rs (PEM files → rustls config for the HTTPS listener)
//!     → Hand off to HTTP layer
//! ```

pub mod idle;
pub mod tls;

pub use idle::{IdleTimeoutAcceptor, IdleTimeoutStream};
pub use tls::TlsFiles;
