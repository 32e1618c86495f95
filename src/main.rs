//! servekit
//!
//! Serves a health endpoint, optionally behind forward auth, and shuts down
//! gracefully on SIGINT/SIGTERM.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request      ┌───────────────────────────────────────────────┐
//!     ────────────────────┼─▶ axum-server ─▶ middleware ─▶ forward auth ─┼──▶ auth upstream
//!                         │   (plain/TLS)    (id, trace,   (optional)    │
//!                         │                   timeout)         │         │
//!                         │                                    ▼         │
//!     Client Response     │                               /healthz       │
//!     ◀───────────────────┼───────────────────────────────────┘          │
//!                         │                                              │
//!     SIGINT/SIGTERM ─────┼─▶ lifecycle: delay ─▶ drain ─▶ exit status   │
//!                         └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use axum::{http::StatusCode, response::Response, routing::get, Router};
use clap::Parser;
use serde_json::json;

use servekit::config::{load_config, ServiceConfig};
use servekit::http::{renderer, ForwardAuth, HttpServer};
use servekit::lifecycle::{listen_and_serve, OsSignal, ShutdownConfig};
use servekit::observability::{logging, metrics, ErrorAttrs};

#[derive(Parser)]
#[command(name = "servekit")]
#[command(about = "HTTP service with graceful shutdown", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("failed to load {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => ServiceConfig::default(),
    };

    if let Err(e) = logging::init(&config.observability) {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "servekit starting");

    match serve(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %ErrorAttrs::new(e.as_ref()), "{e}");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?);
    }

    let mut router = Router::new().route("/healthz", get(healthz));
    if let Some(auth) = &config.forward_auth {
        let auth = ForwardAuth::from_config(auth)?;
        tracing::info!(url = %auth.url(), "Forward auth enabled");
        router = auth.wrap(router);
    }

    let server = HttpServer::from_config(&config, router)?;
    let signal = OsSignal::register()?;
    listen_and_serve(server, signal, ShutdownConfig::from(&config.shutdown)).await?;
    Ok(())
}

async fn healthz() -> Response {
    renderer::json(StatusCode::OK, &json!({ "status": "ok" }))
}
