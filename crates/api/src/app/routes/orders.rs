use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use orders_core::{OrderId, QueryParameters};

use crate::app::services::OrderApi;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order))
        .route("/:id/customer", get(get_order_customer))
}

fn parse_order_id(raw: &str) -> Result<OrderId, axum::response::Response> {
    raw.parse::<OrderId>()
        .map_err(errors::service_error_to_response)
}

pub async fn list_orders(
    Extension(api): Extension<Arc<OrderApi>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> axum::response::Response {
    let query = match QueryParameters::from_pairs(pairs) {
        Ok(q) => q,
        Err(e) => return errors::query_error_to_response(e),
    };

    match api.orders().list_orders(&query).await {
        Ok(orders) => (StatusCode::OK, Json(orders)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(api): Extension<Arc<OrderApi>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_order_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match api.orders().get_order(id).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_order_customer(
    Extension(api): Extension<Arc<OrderApi>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_order_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match api.customer_for_order(id).await {
        Ok(customer) => (StatusCode::OK, Json(customer)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_order(
    Extension(api): Extension<Arc<OrderApi>>,
    body: Result<Json<dto::OrderRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_error(rejection.status(), rejection.body_text()),
    };

    match api.orders().create_order(body.into_new_order()).await {
        Ok(order) => (StatusCode::CREATED, Json(order)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
