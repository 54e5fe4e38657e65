use axum::Router;

pub mod orders;
pub mod system;

/// Order endpoints, served at `/orders` and at `/v1/orders`.
pub fn router() -> Router {
    Router::new()
        .nest("/orders", orders::router())
        .nest("/v1/orders", orders::router())
}
