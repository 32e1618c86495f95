//! Log attributes describing requests and errors.
//!
//! Both types render as a JSON object through `Display`, so they can be attached
//! to any event: `tracing::error!(error = %ErrorAttrs::new(&e), "...")`.

use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::Request;
use serde::Serialize;

use crate::http::headers::{AUTHORIZATION, COOKIE, MASKED, USER_AGENT, X_FORWARDED_FOR};

/// Client and header details of an incoming request.
///
/// `Cookie` and `Authorization` values are never recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestAttrs {
    #[serde(rename = "client.ip", skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    #[serde(rename = "client.address", skip_serializing_if = "Option::is_none")]
    pub client_address: Option<String>,
    #[serde(rename = "user_agent.original", skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(rename = "http.request.headers.raw", skip_serializing_if = "Option::is_none")]
    pub headers_raw: Option<String>,
}

impl RequestAttrs {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let headers = request.headers();
        let header_str = |name| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let client_ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        let mut raw: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for (name, value) in headers {
            let values = raw.entry(name.as_str()).or_default();
            if *name == COOKIE || *name == AUTHORIZATION {
                // Credentials collapse to one masked value, however many were sent.
                if values.is_empty() {
                    values.push(MASKED.to_string());
                }
            } else {
                values.push(String::from_utf8_lossy(value.as_bytes()).into_owned());
            }
        }
        let headers_raw = if raw.is_empty() {
            None
        } else {
            serde_json::to_string(&raw).ok()
        };

        Self {
            client_ip,
            client_address: header_str(X_FORWARDED_FOR),
            user_agent: header_str(USER_AGENT),
            headers_raw,
        }
    }
}

impl fmt::Display for RequestAttrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Message, cause chain and stack trace of an error.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorAttrs {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
    pub stack_trace: String,
}

impl ErrorAttrs {
    pub fn new(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Self {
            message: error.to_string(),
            causes,
            stack_trace: Backtrace::force_capture().to_string(),
        }
    }
}

impl fmt::Display for ErrorAttrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
