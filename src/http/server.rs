//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap an application `Router` with the standard middleware stack
//!   (request id, tracing, request timeout, keep-alive gate)
//! - Serve it over plain TCP or rustls via axum-server, with header read and
//!   idle connection timeouts
//! - Implement [`ServerHandle`] so the lifecycle coordinator can drain it

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode, Version},
    middleware::{self, Next},
    response::Response,
    Router,
};
use axum_server::Handle;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use hyper_util::server::conn::auto;
use tokio::time::Instant;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::lifecycle::{ServeError, ServerHandle};
use crate::net::{IdleTimeoutAcceptor, TlsFiles};

/// Default time a single request may take before it is answered with 408.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time a client has to send complete HTTP/1 request headers.
pub const DEFAULT_READ_HEADER_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time a connection may sit without any bytes moving.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// How often the drain loop re-checks the open connection count.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Per-server tunables. Zero values are replaced by [`ServerOptions::with_defaults`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerOptions {
    pub request_timeout: Duration,
    pub read_header_timeout: Duration,
    pub idle_timeout: Duration,
}

impl ServerOptions {
    pub fn with_defaults(mut self) -> Self {
        if self.request_timeout.is_zero() {
            self.request_timeout = DEFAULT_REQUEST_TIMEOUT;
        }
        if self.read_header_timeout.is_zero() {
            self.read_header_timeout = DEFAULT_READ_HEADER_TIMEOUT;
        }
        if self.idle_timeout.is_zero() {
            self.idle_timeout = DEFAULT_IDLE_TIMEOUT;
        }
        self
    }

    /// Apply the connection-level timeouts to hyper's connection builder.
    ///
    /// hyper's header timer needs an explicit timer and also bounds the wait
    /// for the next request on an idle HTTP/1 keep-alive connection.
    fn configure(&self, builder: &mut auto::Builder<TokioExecutor>) {
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(self.read_header_timeout);
    }
}

/// An HTTP(S) listener serving one application router.
pub struct HttpServer {
    addr: SocketAddr,
    router: Router,
    options: ServerOptions,
    tls: Option<TlsFiles>,
    handle: Handle,
    keep_alives: Arc<AtomicBool>,
}

impl HttpServer {
    /// Create a server for `router` bound to `addr` once started.
    pub fn new(addr: SocketAddr, router: Router) -> Self {
        Self {
            addr,
            router,
            options: ServerOptions::default().with_defaults(),
            tls: None,
            handle: Handle::new(),
            keep_alives: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Create a server from the listener and timeout sections of the config.
    pub fn from_config(config: &ServiceConfig, router: Router) -> Result<Self, ServeError> {
        let address = &config.listener.bind_address;
        let addr: SocketAddr = address.parse().map_err(|source| ServeError::InvalidAddress {
            address: address.clone(),
            source,
        })?;

        let timeouts = &config.timeouts;
        let mut server = Self::new(addr, router).with_options(ServerOptions {
            request_timeout: Duration::from_secs(timeouts.request_secs),
            read_header_timeout: Duration::from_secs(timeouts.read_header_secs),
            idle_timeout: Duration::from_secs(timeouts.idle_secs),
        });
        if let Some(tls) = &config.listener.tls {
            server = server.with_tls(&tls.cert_path, &tls.key_path);
        }
        Ok(server)
    }

    pub fn with_options(mut self, options: ServerOptions) -> Self {
        self.options = options.with_defaults();
        self
    }

    /// Serve HTTPS using the PEM certificate and key at the given paths.
    pub fn with_tls(mut self, cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        self.tls = Some(TlsFiles::new(cert_path, key_path));
        self
    }

    /// Wait until the listener is bound and return its address.
    ///
    /// Returns `None` if binding failed.
    pub async fn listening(&self) -> Option<SocketAddr> {
        self.handle.listening().await
    }

    pub fn keep_alives_enabled(&self) -> bool {
        self.keep_alives.load(Ordering::Acquire)
    }

    pub fn options(&self) -> ServerOptions {
        self.options
    }

    /// Build the application with all middleware layers.
    fn app(&self) -> Router {
        self.router
            .clone()
            .layer(middleware::from_fn_with_state(
                Arc::clone(&self.keep_alives),
                keep_alive_gate,
            ))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                self.options.request_timeout,
            ))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }
}

impl ServerHandle for HttpServer {
    async fn start(&self) -> Result<(), ServeError> {
        let app = self.app().into_make_service_with_connect_info::<SocketAddr>();
        let idle = IdleTimeoutAcceptor::new(self.options.idle_timeout);

        let served = match &self.tls {
            None => {
                tracing::info!(address = %self.addr, "HTTP server starting");
                let mut server = axum_server::bind(self.addr)
                    .acceptor(idle)
                    .handle(self.handle.clone());
                self.options.configure(server.http_builder());
                server.serve(app).await
            }
            Some(tls) => {
                let rustls = tls.load().await.map_err(ServeError::Tls)?;
                tracing::info!(address = %self.addr, "HTTPS server starting");
                let mut server = axum_server::bind_rustls(self.addr, rustls)
                    .map(|acceptor| acceptor.acceptor(idle))
                    .handle(self.handle.clone());
                self.options.configure(server.http_builder());
                server.serve(app).await
            }
        };

        served.map_err(|source| ServeError::Listen {
            addr: self.addr,
            source,
        })?;

        tracing::info!(address = %self.addr, "HTTP server stopped");
        Ok(())
    }

    fn disable_keep_alives(&self) {
        self.keep_alives.store(false, Ordering::Release);
        tracing::debug!(address = %self.addr, "Keep-alives disabled");
    }

    async fn shutdown(&self, deadline: Instant) -> Result<(), ServeError> {
        let grace = deadline.saturating_duration_since(Instant::now());
        self.handle.graceful_shutdown(Some(grace));

        let drained = async {
            while self.handle.connection_count() > 0 {
                tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
            }
        };

        match tokio::time::timeout_at(deadline, drained).await {
            Ok(()) => Ok(()),
            Err(_) => {
                let open_connections = self.handle.connection_count();
                tracing::warn!(open_connections, "Drain deadline exceeded, closing remaining connections");
                Err(ServeError::DrainTimeout { open_connections })
            }
        }
    }
}

/// Ask HTTP/1 clients to close the connection once keep-alives are off.
async fn keep_alive_gate(State(keep_alives): State<Arc<AtomicBool>>, request: Request, next: Next) -> Response {
    let version = request.version();
    let http1 = version != Version::HTTP_2 && version != Version::HTTP_3;
    let mut response = next.run(request).await;
    if http1 && !keep_alives.load(Ordering::Acquire) {
        response
            .headers_mut()
            .insert(header::CONNECTION, HeaderValue::from_static("close"));
    }
    response
}
