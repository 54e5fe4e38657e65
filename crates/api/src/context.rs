use axum::http::HeaderValue;
use uuid::Uuid;

/// Header carrying the request correlation id, in and out.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id of the request being served.
///
/// Taken from the caller's `x-request-id` when present, generated otherwise.
/// Immutable once attached to the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    request_id: String,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }

    /// Use the caller's id if it is a usable header value, else mint a UUIDv7.
    pub fn from_header(value: Option<&HeaderValue>) -> Self {
        value
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty() && v.len() <= 128)
            .map(Self::new)
            .unwrap_or_else(|| Self::new(Uuid::now_v7().to_string()))
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}
