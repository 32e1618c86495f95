//! Two-phase graceful shutdown of a running server.
//!
//! ```text
//! start() ──────────────────────────────┐
//!                                        ├─ first wins
//! signal.stopped() ──┐                   │
//!                    ▼                   │
//!   disable keep-alives                  │
//!   sleep(shutdown_delay)   (LB deregisters)
//!   shutdown(now + drain_timeout)        │
//!                    ▼                   ▼
//!               drain result      listener result
//! ```

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::http::HttpServer;
use crate::lifecycle::signals::CancellationSignal;
use crate::lifecycle::ServeError;
use crate::observability::metrics::{self, DrainOutcome};

/// Default pause between the stop signal and the start of draining.
pub const DEFAULT_SHUTDOWN_DELAY: Duration = Duration::from_secs(5);

/// Default upper bound for in-flight requests to finish.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// A listener the coordinator can start, gate and drain.
pub trait ServerHandle: Send + Sync + 'static {
    /// Serve until the listener fails or is closed by [`ServerHandle::shutdown`].
    ///
    /// Returns `Ok(())` only when closed through `shutdown`.
    fn start(&self) -> impl Future<Output = Result<(), ServeError>> + Send;

    /// Stop reusing connections for further requests.
    fn disable_keep_alives(&self);

    /// Stop accepting and wait for in-flight requests, at most until `deadline`.
    fn shutdown(&self, deadline: Instant) -> impl Future<Output = Result<(), ServeError>> + Send;
}

/// Hook run at the start of a shutdown phase.
pub type PhaseHook = Arc<dyn Fn() + Send + Sync>;

/// Timing of the shutdown sequence.
///
/// Zero durations mean "unset" and are replaced by the defaults.
#[derive(Clone, Default)]
pub struct ShutdownConfig {
    /// Time to wait after the stop signal before draining.
    pub shutdown_delay: Duration,
    /// Maximum time in-flight requests get to complete.
    pub drain_timeout: Duration,
    /// Called once the stop signal has been received.
    pub on_signal: Option<PhaseHook>,
    /// Called right before draining starts.
    pub on_drain: Option<PhaseHook>,
}

impl ShutdownConfig {
    pub fn new(shutdown_delay: Duration, drain_timeout: Duration) -> Self {
        Self {
            shutdown_delay,
            drain_timeout,
            ..Self::default()
        }
    }

    pub fn on_signal(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_signal = Some(Arc::new(hook));
        self
    }

    pub fn on_drain(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_drain = Some(Arc::new(hook));
        self
    }

    /// Fill unset durations with the defaults.
    pub fn with_defaults(mut self) -> Self {
        if self.shutdown_delay.is_zero() {
            self.shutdown_delay = DEFAULT_SHUTDOWN_DELAY;
        }
        if self.drain_timeout.is_zero() {
            self.drain_timeout = DEFAULT_DRAIN_TIMEOUT;
        }
        self
    }
}

impl fmt::Debug for ShutdownConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownConfig")
            .field("shutdown_delay", &self.shutdown_delay)
            .field("drain_timeout", &self.drain_timeout)
            .field("on_signal", &self.on_signal.is_some())
            .field("on_drain", &self.on_drain.is_some())
            .finish()
    }
}

/// Run `handle` until it stops on its own or `signal` fires, then drain it.
///
/// The signal is owned by this call and released on every return path.
pub async fn run<H, S>(handle: Arc<H>, mut signal: S, config: ShutdownConfig) -> Result<(), ServeError>
where
    H: ServerHandle,
    S: CancellationSignal,
{
    let config = config.with_defaults();

    let server = Arc::clone(&handle);
    let mut serving = tokio::spawn(async move { server.start().await });

    tokio::select! {
        biased;
        result = &mut serving => {
            tracing::debug!("Listener returned before any stop request");
            return result?;
        }
        _ = signal.stopped() => {}
    }

    // The listener may have failed in the same instant the signal fired.
    if serving.is_finished() {
        return serving.await?;
    }
    drop(signal);

    handle.disable_keep_alives();

    tracing::debug!(
        shutdown_delay = ?config.shutdown_delay,
        "Shutdown signal received, waiting {:?} for load balancer to deregister",
        config.shutdown_delay
    );
    if let Some(hook) = &config.on_signal {
        hook();
    }

    tokio::time::sleep(config.shutdown_delay).await;

    tracing::debug!(drain_timeout = ?config.drain_timeout, "Draining existing connections");
    if let Some(hook) = &config.on_drain {
        hook();
    }

    let drain_started = Instant::now();
    let deadline = drain_started + config.drain_timeout;
    let drained = handle.shutdown(deadline).await;
    metrics::record_drain(drain_started.elapsed(), DrainOutcome::of(&drained));

    match drained {
        Ok(()) => {
            tracing::debug!("Server shutdown complete");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Draining connections failed");
            Err(ServeError::Shutdown(Box::new(e)))
        }
    }
}

/// Serve plain HTTP until `signal` fires, then shut down gracefully.
pub async fn listen_and_serve<S>(server: HttpServer, signal: S, config: ShutdownConfig) -> Result<(), ServeError>
where
    S: CancellationSignal,
{
    run(Arc::new(server), signal, config).await
}

/// Serve HTTPS with the given PEM certificate and key until `signal` fires.
pub async fn listen_and_serve_tls<S>(
    server: HttpServer,
    cert_path: impl Into<PathBuf>,
    key_path: impl Into<PathBuf>,
    signal: S,
    config: ShutdownConfig,
) -> Result<(), ServeError>
where
    S: CancellationSignal,
{
    run(Arc::new(server.with_tls(cert_path, key_path)), signal, config).await
}
