//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, timeout, keep-alive gate)
//!     → forward_auth.rs (optional upstream authorization)
//!     → application router
//!     → renderer.rs (JSON / text / raw responses)
//!     → Send to client
//! ```

pub mod forward_auth;
pub mod headers;
pub mod renderer;
pub mod server;

pub use forward_auth::{forward_auth_middleware, ForwardAuth, ForwardAuthError};
pub use server::{HttpServer, ServerOptions};
