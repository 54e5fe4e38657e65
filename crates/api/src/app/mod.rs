//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: business operations (orders, customer lookup)
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent `{status, message}` error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use reqwest::Url;
use thiserror::Error;
use tower::ServiceBuilder;

use orders_infra::config::{AppConfig, DiscoveryBackend};
use orders_infra::customer_client::{CustomerClient, CustomerClientError};
use orders_infra::discovery::{ConsulClient, DiscoveryError, ServiceLocator, ServiceRegistry, StaticRegistry};
use orders_infra::maintenance::MaintenanceSwitch;
use orders_infra::order_store::{InMemoryOrderStore, OrderStore, PostgresOrderStore, StoreError};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::{OrderApi, OrdersService};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("order store: {0}")]
    Store(#[from] StoreError),

    #[error("service discovery: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("customer client: {0}")]
    Customers(#[from] CustomerClientError),

    #[error("invalid consul url '{url}': {reason}")]
    ConsulUrl { url: String, reason: String },
}

/// Router plus the handles the binary needs for its background tasks.
pub struct Application {
    pub router: Router,
    pub maintenance: MaintenanceSwitch,
    /// Set when discovery runs against Consul.
    pub consul: Option<ConsulClient>,
}

/// Wire stores, discovery and clients from configuration and build the router.
pub async fn build_app(config: &AppConfig) -> Result<Application, BuildError> {
    let store: Arc<dyn OrderStore> = match &config.database {
        Some(db) => {
            let store = PostgresOrderStore::connect(&db.url, db.max_connections).await?;
            store.ensure_schema().await?;
            tracing::info!("using postgres order store");
            Arc::new(store)
        }
        None => {
            tracing::info!("no database configured, using in-memory order store");
            Arc::new(InMemoryOrderStore::new())
        }
    };

    let (registry, consul): (Arc<dyn ServiceRegistry>, Option<ConsulClient>) = match config.discovery.backend {
        DiscoveryBackend::Static => (
            Arc::new(StaticRegistry::from_instances(&config.discovery.instances)?),
            None,
        ),
        DiscoveryBackend::Consul => {
            let base = Url::parse(&config.discovery.consul_url).map_err(|e| BuildError::ConsulUrl {
                url: config.discovery.consul_url.clone(),
                reason: e.to_string(),
            })?;
            let client = ConsulClient::new(base, reqwest::Client::new());
            (Arc::new(client.clone()), Some(client))
        }
    };

    let locator = ServiceLocator::new(registry, config.discovery.customer_service.clone());
    let customers = CustomerClient::new(config.customers.timeout())?;
    let api = Arc::new(OrderApi::new(OrdersService::new(store), locator, customers));

    let maintenance = MaintenanceSwitch::new(config.rest.maintenance);

    Ok(Application {
        router: router(api, maintenance.clone()),
        maintenance,
        consul,
    })
}

/// The full HTTP router over an already wired [`OrderApi`].
pub fn router(api: Arc<OrderApi>, maintenance: MaintenanceSwitch) -> Router {
    // Everything but /health honours maintenance mode.
    let orders = routes::router()
        .layer(Extension(api))
        .layer(axum::middleware::from_fn_with_state(
            maintenance,
            middleware::maintenance_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(orders)
        .fallback(routes::system::not_found)
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::request_id_middleware)))
}
