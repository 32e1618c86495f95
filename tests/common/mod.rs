//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use servekit::lifecycle::{run, CancellationSignal, ServeError, ShutdownConfig};
use servekit::HttpServer;
use tokio::task::JoinHandle;

/// A server running under the lifecycle coordinator on an ephemeral port.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub server: Arc<HttpServer>,
    pub result: JoinHandle<Result<(), ServeError>>,
}

impl RunningServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start `router` on 127.0.0.1:0 and wait until it is listening.
pub async fn start_server<S>(router: Router, signal: S, config: ShutdownConfig) -> RunningServer
where
    S: CancellationSignal + 'static,
{
    let server = HttpServer::new("127.0.0.1:0".parse().unwrap(), router);
    run_server(server, signal, config).await
}

/// Run an already configured server and wait until it is listening.
pub async fn run_server<S>(server: HttpServer, signal: S, config: ShutdownConfig) -> RunningServer
where
    S: CancellationSignal + 'static,
{
    let server = Arc::new(server);
    let result = tokio::spawn(run(server.clone(), signal, config));
    let addr = server.listening().await.expect("server failed to bind");

    RunningServer { addr, server, result }
}

/// Routes used by most tests: `/` answers immediately, `/slow/{ms}` sleeps first.
pub fn test_router() -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route(
            "/slow/{ms}",
            get(|axum::extract::Path(ms): axum::extract::Path<u64>| async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                "done"
            }),
        )
}

/// HTTP client that ignores proxy environment variables.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap()
}
