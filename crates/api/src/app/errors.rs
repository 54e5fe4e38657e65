use axum::http::StatusCode;
use axum::response::IntoResponse;

use orders_core::{QueryError, ServiceError};

use crate::app::dto::ErrorBody;

/// `{"status": <code>, "message": <text>}` with the matching HTTP status.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        axum::Json(ErrorBody {
            status: status.as_u16(),
            message: message.into(),
        }),
    )
        .into_response()
}

/// Translate a domain error 1:1 into a response.
pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::warn!(status = status.as_u16(), message = %err.message(), "request failed");
    }
    json_error(status, err.message())
}

pub fn query_error_to_response(err: QueryError) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, err.to_string())
}
