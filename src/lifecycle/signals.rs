//! Cancellation sources that start a graceful shutdown.
//!
//! # Responsibilities
//! - Subscribe to SIGTERM/SIGINT for the duration of one serve run
//! - Adapt explicit cancellation (token, deadline, broadcast trigger)
//!
//! # Design Decisions
//! - One operation, `stopped()`, regardless of where the stop comes from
//! - `stopped()` must be cancel-safe: callers re-create the future in `select!` loops
//! - OS subscriptions are released when the `OsSignal` is dropped

use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::ServeError;

/// A single-fire stop request.
pub trait CancellationSignal: Send {
    /// Resolve once a stop has been requested.
    fn stopped(&mut self) -> impl Future<Output = ()> + Send;
}

/// Subscription to the process termination signals.
///
/// On unix this listens for SIGINT and SIGTERM, elsewhere for Ctrl-C.
#[derive(Debug)]
pub struct OsSignal {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl OsSignal {
    /// Register the signal handlers. Must be called inside a Tokio runtime.
    #[cfg(unix)]
    pub fn register() -> Result<Self, ServeError> {
        use tokio::signal::unix::{signal, SignalKind};

        let interrupt = signal(SignalKind::interrupt()).map_err(ServeError::SignalRegistration)?;
        let terminate = signal(SignalKind::terminate()).map_err(ServeError::SignalRegistration)?;
        Ok(Self { interrupt, terminate })
    }

    #[cfg(not(unix))]
    pub fn register() -> Result<Self, ServeError> {
        Ok(Self {})
    }
}

impl CancellationSignal for OsSignal {
    #[cfg(unix)]
    async fn stopped(&mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => tracing::info!(signal = "SIGINT", "Stop signal received"),
            _ = self.terminate.recv() => tracing::info!(signal = "SIGTERM", "Stop signal received"),
        }
    }

    #[cfg(not(unix))]
    async fn stopped(&mut self) {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!(signal = "ctrl-c", "Stop signal received"),
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C, waiting forever");
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Stop once a point in time has been reached.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn at(instant: Instant) -> Self {
        Self(instant)
    }

    pub fn after(duration: Duration) -> Self {
        Self(Instant::now() + duration)
    }
}

impl CancellationSignal for Deadline {
    async fn stopped(&mut self) {
        tokio::time::sleep_until(self.0).await;
    }
}

impl CancellationSignal for CancellationToken {
    async fn stopped(&mut self) {
        self.cancelled().await;
    }
}

/// Broadcast trigger that any number of tasks can subscribe to.
pub struct StopTrigger {
    tx: broadcast::Sender<()>,
}

impl StopTrigger {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the trigger. Only stops fired after this call are observed.
    pub fn subscribe(&self) -> StopSubscription {
        StopSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Fire the trigger.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of subscriptions still alive.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for StopTrigger {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of a [`StopTrigger`].
///
/// A dropped trigger or a lagged receiver also counts as a stop request.
pub struct StopSubscription {
    rx: broadcast::Receiver<()>,
}

impl CancellationSignal for StopSubscription {
    async fn stopped(&mut self) {
        if let Err(e) = self.rx.recv().await {
            tracing::debug!(error = %e, "Stop trigger channel ended");
        }
    }
}
