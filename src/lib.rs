//! Graceful HTTP serving toolkit
//!
//! Runs an HTTP listener until it fails or a stop signal arrives, then
//! deregisters, drains in-flight requests within a deadline and reports a
//! single result. Forward auth, response rendering, ECS logging and periodic
//! tasks are provided alongside.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod periodic;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::{listen_and_serve, listen_and_serve_tls, run, ServeError, ShutdownConfig};
