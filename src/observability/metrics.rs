//! Metrics collection and exposition.
//!
//! # Metrics
//! - `servekit_shutdowns_total` (counter): completed drains by outcome
//! - `servekit_drain_duration_seconds` (histogram): time spent draining
//! - `servekit_forward_auth_decisions_total` (counter): allowed/denied/error
//! - `servekit_periodic_runs_total` (counter): periodic task executions
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::lifecycle::ServeError;

/// Install the Prometheus exporter and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);

    if let Err(e) = builder.install() {
        tracing::error!(error = %e, "Failed to install Prometheus recorder");
    } else {
        tracing::info!(address = %addr, "Prometheus metrics exporter started");
    }
}

/// How a drain phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    Clean,
    DeadlineExceeded,
    Failed,
}

impl DrainOutcome {
    pub fn of(result: &Result<(), ServeError>) -> Self {
        match result {
            Ok(()) => DrainOutcome::Clean,
            Err(e) if e.is_deadline_exceeded() => DrainOutcome::DeadlineExceeded,
            Err(_) => DrainOutcome::Failed,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            DrainOutcome::Clean => "clean",
            DrainOutcome::DeadlineExceeded => "deadline_exceeded",
            DrainOutcome::Failed => "failed",
        }
    }
}

/// Record the outcome of a drain phase.
pub fn record_drain(elapsed: Duration, outcome: DrainOutcome) {
    counter!("servekit_shutdowns_total", "outcome" => outcome.as_str()).increment(1);
    histogram!("servekit_drain_duration_seconds").record(elapsed.as_secs_f64());
}

/// Outcome of a forward-auth check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Allowed,
    Denied,
    Error,
}

impl AuthDecision {
    fn as_str(self) -> &'static str {
        match self {
            AuthDecision::Allowed => "allowed",
            AuthDecision::Denied => "denied",
            AuthDecision::Error => "error",
        }
    }
}

pub fn record_auth_decision(decision: AuthDecision) {
    counter!("servekit_forward_auth_decisions_total", "outcome" => decision.as_str()).increment(1);
}

pub fn record_periodic_run() {
    counter!("servekit_periodic_runs_total").increment(1);
}
