//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::lifecycle::ShutdownConfig;

/// Root configuration for a served instance.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Deregistration delay and drain timeout.
    pub shutdown: ShutdownSettings,

    /// Upstream auth service. Requests are unauthenticated when absent.
    pub forward_auth: Option<ForwardAuthConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Timeout configuration. Zero selects the built-in default.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Time allowed to send complete request headers, in seconds.
    pub read_header_secs: u64,

    /// Time a connection may stay silent before it is closed, in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 10,
            read_header_secs: 5,
            idle_secs: 120,
        }
    }
}

/// Shutdown phase durations. Zero selects the built-in default.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownSettings {
    /// Time between the stop signal and draining, in milliseconds.
    pub shutdown_delay_ms: u64,

    /// Upper bound on the drain phase, in milliseconds.
    pub drain_timeout_ms: u64,
}

impl From<&ShutdownSettings> for ShutdownConfig {
    fn from(settings: &ShutdownSettings) -> Self {
        ShutdownConfig::new(
            Duration::from_millis(settings.shutdown_delay_ms),
            Duration::from_millis(settings.drain_timeout_ms),
        )
    }
}

/// Forward auth upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ForwardAuthConfig {
    /// Absolute http(s) URL of the auth endpoint.
    pub url: String,

    /// Value sent as `X-Forwarded-Host`.
    pub x_forwarded_host: String,

    /// Upstream request timeout in seconds.
    #[serde(default = "default_auth_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_auth_timeout_secs() -> u64 {
    10
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// ECS JSON lines or human-readable output.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "debug".to_string(),
            log_format: LogFormat::Json,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: ServiceConfig = toml::from_str("").unwrap();

        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert!(config.listener.tls.is_none());
        assert_eq!(config.timeouts.request_secs, 10);
        assert_eq!(config.timeouts.read_header_secs, 5);
        assert_eq!(config.timeouts.idle_secs, 120);
        assert!(config.forward_auth.is_none());
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn full_document_parses() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:8443"
            tls = { cert_path = "cert.pem", key_path = "key.pem" }

            [shutdown]
            shutdown_delay_ms = 1500
            drain_timeout_ms = 3000

            [forward_auth]
            url = "http://auth.local/check"
            x_forwarded_host = "app.example.com"

            [observability]
            log_format = "pretty"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.tls.as_ref().unwrap().key_path, "key.pem");
        let auth = config.forward_auth.unwrap();
        assert_eq!(auth.timeout_secs, 10);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);

        let shutdown = ShutdownConfig::from(&config.shutdown);
        assert_eq!(shutdown.shutdown_delay, Duration::from_millis(1500));
        assert_eq!(shutdown.drain_timeout, Duration::from_secs(3));
    }

    #[test]
    fn zero_shutdown_settings_fall_back_to_defaults() {
        let shutdown = ShutdownConfig::from(&ShutdownSettings::default()).with_defaults();
        assert_eq!(shutdown.shutdown_delay, crate::lifecycle::DEFAULT_SHUTDOWN_DELAY);
        assert_eq!(shutdown.drain_timeout, crate::lifecycle::DEFAULT_DRAIN_TIMEOUT);
    }
}
