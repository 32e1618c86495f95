//! Forward authentication middleware.
//!
//! Every request is first described to an upstream auth service with a
//! `GET` carrying `X-Forwarded-*` headers. A `200` lets the request through
//! with the upstream's `Remote-User`; anything else is relayed to the client
//! as-is.
//!
//! # Request Flow
//! ```text
//! Client → forward_auth_middleware → GET auth url
//!     200     → set Remote-User → inner handler
//!     non-200 → relay status, body, Content-Type
//!     error   → 500
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::Response,
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use url::Url;

use crate::config::ForwardAuthConfig;
use crate::http::headers::{
    AUTHORIZATION, CONTENT_TYPE, COOKIE, REMOTE_USER, USER_AGENT, X_FORWARDED_HOST, X_FORWARDED_METHOD,
    X_FORWARDED_PROTO, X_FORWARDED_URI,
};
use crate::http::renderer;
use crate::observability::metrics::{record_auth_decision, AuthDecision};
use crate::observability::{ErrorAttrs, RequestAttrs};

pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_PROTO: &str = "https";

#[derive(Debug, Error)]
pub enum ForwardAuthError {
    #[error("invalid auth url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("auth url must be http or https, got {0}")]
    UnsupportedScheme(String),
    #[error("failed to build auth client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Delegates authorization of each request to an upstream service.
#[derive(Debug, Clone)]
pub struct ForwardAuth {
    url: Url,
    x_forwarded_host: String,
    client: reqwest::Client,
}

impl ForwardAuth {
    pub fn new(url: &str, x_forwarded_host: impl Into<String>) -> Result<Self, ForwardAuthError> {
        Self::with_timeout(url, x_forwarded_host, DEFAULT_AUTH_TIMEOUT)
    }

    /// Zero `timeout_secs` selects [`DEFAULT_AUTH_TIMEOUT`].
    pub fn from_config(config: &ForwardAuthConfig) -> Result<Self, ForwardAuthError> {
        let timeout = match config.timeout_secs {
            0 => DEFAULT_AUTH_TIMEOUT,
            secs => Duration::from_secs(secs),
        };
        Self::with_timeout(&config.url, config.x_forwarded_host.clone(), timeout)
    }

    fn with_timeout(
        url: &str,
        x_forwarded_host: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ForwardAuthError> {
        let parsed = Url::parse(url).map_err(|source| ForwardAuthError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ForwardAuthError::UnsupportedScheme(parsed.scheme().to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            url: parsed,
            x_forwarded_host: x_forwarded_host.into(),
            client,
        })
    }

    /// Replace the HTTP client used to reach the auth service.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Put every route of `router` behind this auth check.
    pub fn wrap(self, router: Router) -> Router {
        router.layer(middleware::from_fn_with_state(Arc::new(self), forward_auth_middleware))
    }

    // `Request<Body>` is not `Sync`; only its parts may be borrowed across awaits.
    async fn authorize(&self, method: &Method, uri: &Uri, headers: &HeaderMap) -> Result<Verdict, reqwest::Error> {
        let proto = headers
            .get(X_FORWARDED_PROTO)
            .filter(|v| !v.is_empty())
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_PROTO);
        let request_uri = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

        let mut upstream = self
            .client
            .get(self.url.clone())
            .header(X_FORWARDED_METHOD, method.as_str())
            .header(X_FORWARDED_PROTO, proto)
            .header(X_FORWARDED_HOST, self.x_forwarded_host.as_str())
            .header(X_FORWARDED_URI, request_uri);

        for name in [USER_AGENT, COOKIE, AUTHORIZATION] {
            if let Some(value) = headers.get(&name) {
                upstream = upstream.header(name, value.clone());
            }
        }
        if !headers.contains_key(AUTHORIZATION) {
            if let Some(credentials) = basic_credentials(uri) {
                upstream = upstream.header(AUTHORIZATION, credentials);
            }
        }

        let response = upstream.send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let body = response.bytes().await?;
            return Ok(Verdict::Deny {
                status,
                body,
                content_type,
            });
        }

        Ok(Verdict::Allow {
            remote_user: response.headers().get(REMOTE_USER).cloned(),
        })
    }
}

enum Verdict {
    Allow {
        remote_user: Option<axum::http::HeaderValue>,
    },
    Deny {
        status: StatusCode,
        body: axum::body::Bytes,
        content_type: String,
    },
}

/// Axum middleware running a [`ForwardAuth`] check before the inner handler.
pub async fn forward_auth_middleware(
    State(auth): State<Arc<ForwardAuth>>,
    mut request: Request,
    next: Next,
) -> Response {
    let verdict = auth
        .authorize(request.method(), request.uri(), request.headers())
        .await;
    match verdict {
        Ok(Verdict::Allow { remote_user }) => {
            record_auth_decision(AuthDecision::Allowed);
            set_remote_user(request.headers_mut(), remote_user);
            next.run(request).await
        }
        Ok(Verdict::Deny {
            status,
            body,
            content_type,
        }) => {
            record_auth_decision(AuthDecision::Denied);
            tracing::debug!(status = status.as_u16(), uri = %request.uri(), "Forward auth denied request");
            renderer::data(status, body, &content_type)
        }
        Err(e) => {
            record_auth_decision(AuthDecision::Error);
            tracing::error!(
                error = %ErrorAttrs::new(&e),
                request = %RequestAttrs::from_request(&request),
                "{e}"
            );
            renderer::text(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn set_remote_user(headers: &mut HeaderMap, remote_user: Option<axum::http::HeaderValue>) {
    match remote_user {
        Some(user) => {
            headers.insert(REMOTE_USER, user);
        }
        None => {
            headers.remove(REMOTE_USER);
        }
    }
}

/// `Basic` credentials from `user:password@` in the request URI, if both are present.
fn basic_credentials(uri: &Uri) -> Option<String> {
    let authority = uri.authority()?.as_str();
    let (userinfo, _) = authority.rsplit_once('@')?;
    let (user, password) = userinfo.split_once(':')?;
    Some(format!("Basic {}", STANDARD.encode(format!("{user}:{password}"))))
}
