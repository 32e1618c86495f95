//! Header names shared by the forward-auth middleware and the request logger.

use axum::http::HeaderName;

pub use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, USER_AGENT};

pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub const X_FORWARDED_METHOD: HeaderName = HeaderName::from_static("x-forwarded-method");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_URI: HeaderName = HeaderName::from_static("x-forwarded-uri");
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const REMOTE_USER: HeaderName = HeaderName::from_static("remote-user");

/// Placeholder written instead of credential header values.
pub const MASKED: &str = "<masked>";
