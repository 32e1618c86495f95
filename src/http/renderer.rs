//! Response rendering helpers.
//!
//! # Design Decisions
//! - Rendering never panics: failures are logged and answered with a 500
//! - Content types always carry an explicit charset for text formats

use axum::{
    body::{Body, Bytes},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::http::headers::CONTENT_TYPE;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Render `data` as JSON with the given status.
pub fn json<T: Serialize + ?Sized>(status: StatusCode, data: &T) -> Response {
    match serde_json::to_vec(data) {
        Ok(body) => with_content_type(status, Body::from(body), HeaderValue::from_static(JSON_CONTENT_TYPE)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode JSON response");
            text(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}

/// Render plain UTF-8 text with the given status.
pub fn text(status: StatusCode, text: impl Into<String>) -> Response {
    with_content_type(
        status,
        Body::from(text.into()),
        HeaderValue::from_static(TEXT_CONTENT_TYPE),
    )
}

/// Render raw bytes with the given status and content type.
///
/// An empty content type leaves the header unset.
pub fn data(status: StatusCode, bytes: impl Into<Bytes>, content_type: &str) -> Response {
    let body = Body::from(bytes.into());
    if content_type.is_empty() {
        return (status, body).into_response();
    }

    let value = match HeaderValue::from_str(content_type) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(error = %e, content_type, "Invalid content type, falling back");
            HeaderValue::from_static(FALLBACK_CONTENT_TYPE)
        }
    };
    with_content_type(status, body, value)
}

fn with_content_type(status: StatusCode, body: Body, content_type: HeaderValue) -> Response {
    let mut response = (status, body).into_response();
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    response
}
