use std::time::Instant;

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

use orders_infra::maintenance::MaintenanceSwitch;

use crate::app::errors;
use crate::context::{REQUEST_ID_HEADER, RequestContext};

pub const MAINTENANCE_MESSAGE: &str = "Service is undergoing maintenance, check back in a minute.";

/// Attach a [`RequestContext`], run the request inside a span carrying its id,
/// and echo the id on the response.
pub async fn request_id_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let ctx = RequestContext::from_header(req.headers().get(REQUEST_ID_HEADER));
    let span = tracing::info_span!(
        "request",
        request_id = %ctx.request_id(),
        method = %req.method(),
        path = %req.uri().path(),
    );
    req.extensions_mut().insert(ctx.clone());

    let started = Instant::now();
    let mut res = next.run(req).instrument(span.clone()).await;

    span.in_scope(|| {
        tracing::info!(
            status = res.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
    });

    if let Ok(value) = HeaderValue::from_str(ctx.request_id()) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

/// Short-circuit with 503 while maintenance mode is on.
pub async fn maintenance_middleware(
    State(switch): State<MaintenanceSwitch>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    if switch.is_enabled() {
        return errors::json_error(StatusCode::SERVICE_UNAVAILABLE, MAINTENANCE_MESSAGE);
    }
    next.run(req).await
}
