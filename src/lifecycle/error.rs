//! Errors surfaced by the server lifecycle.

use std::io;
use std::net::{AddrParseError, SocketAddr};

use thiserror::Error;
use tokio::task::JoinError;

/// Terminal failure of a serve run.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The listener could not bind or stopped accepting on its own.
    #[error("failed to listen on {addr}: {source}")]
    Listen {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Certificate or key could not be loaded for the TLS listener.
    #[error("failed to load TLS configuration: {0}")]
    Tls(#[source] io::Error),

    /// The configured bind address is not a socket address.
    #[error("invalid bind address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: AddrParseError,
    },

    /// The listener task panicked or was aborted.
    #[error("listener task failed: {0}")]
    Task(#[from] JoinError),

    /// In-flight connections outlived the drain deadline and were closed.
    #[error("drain deadline exceeded with {open_connections} connection(s) still open")]
    DrainTimeout { open_connections: usize },

    /// The drain phase failed.
    #[error("shutdown failed: {0}")]
    Shutdown(#[source] Box<ServeError>),

    /// Subscribing to OS termination signals failed.
    #[error("failed to register signal handler: {0}")]
    SignalRegistration(#[source] io::Error),
}

impl ServeError {
    /// Whether this error (or the drain failure it wraps) is a deadline overrun.
    pub fn is_deadline_exceeded(&self) -> bool {
        match self {
            ServeError::DrainTimeout { .. } => true,
            ServeError::Shutdown(inner) => inner.is_deadline_exceeded(),
            _ => false,
        }
    }
}
