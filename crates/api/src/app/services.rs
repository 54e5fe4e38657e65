//! Business operations behind the HTTP handlers.
//!
//! - [`OrdersService`]: list/get/create over the order store.
//! - [`OrderApi`]: the endpoint-facing facade; adds the customer lookup, which
//!   resolves the customer service and calls it over HTTP.

use std::sync::Arc;

use tracing::instrument;

use orders_core::{CustomerResponse, NewOrder, Order, OrderId, QueryParameters, ServiceError, ServiceResult};
use orders_infra::customer_client::{CustomerClient, CustomerClientError};
use orders_infra::discovery::{Resolution, ServiceLocator};
use orders_infra::order_store::{OrderStore, StoreError};

pub const ORDER_NOT_FOUND: &str = "Order not found!";
pub const SERVICE_URL_NOT_FOUND: &str = "Service URL not found!";

fn store_error(err: StoreError) -> ServiceError {
    match err {
        StoreError::NotFound(_) => ServiceError::not_found(ORDER_NOT_FOUND),
        StoreError::Storage(msg) => ServiceError::internal(msg),
    }
}

#[derive(Clone)]
pub struct OrdersService {
    store: Arc<dyn OrderStore>,
}

impl OrdersService {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    pub async fn list_orders(&self, query: &QueryParameters) -> ServiceResult<Vec<Order>> {
        self.store.list(query).await.map_err(store_error)
    }

    pub async fn get_order(&self, id: OrderId) -> ServiceResult<Order> {
        self.store.get(id).await.map_err(store_error)
    }

    pub async fn create_order(&self, order: NewOrder) -> ServiceResult<Order> {
        let created = self.store.create(order).await.map_err(store_error)?;
        tracing::info!(order_id = %created.id, customer_id = created.customer_id, "order created");
        Ok(created)
    }
}

/// Everything the order endpoints need, injected at construction.
pub struct OrderApi {
    orders: OrdersService,
    locator: ServiceLocator,
    customers: CustomerClient,
}

impl OrderApi {
    pub fn new(orders: OrdersService, locator: ServiceLocator, customers: CustomerClient) -> Self {
        Self {
            orders,
            locator,
            customers,
        }
    }

    pub fn orders(&self) -> &OrdersService {
        &self.orders
    }

    /// Customer of an order, fetched from the customer service.
    ///
    /// Any remote status other than 200 (a remote 404 included) is reported
    /// as a 500 naming that status.
    #[instrument(skip(self, id), fields(order_id = %id))]
    pub async fn customer_for_order(&self, id: OrderId) -> ServiceResult<CustomerResponse> {
        let order = self.orders.get_order(id).await?;

        let base = match self.locator.resolve().await {
            Resolution::Found(base) => base,
            Resolution::NotFound => {
                tracing::warn!(service = %self.locator.target(), "customer service not registered");
                return Err(ServiceError::not_found(SERVICE_URL_NOT_FOUND));
            }
        };

        self.customers
            .get_customer(&base, order.customer_id)
            .await
            .map_err(|e| match e {
                CustomerClientError::Status(code) => ServiceError::internal(format!(
                    "Service returned error status code: {code}"
                )),
                other => ServiceError::internal(other.to_string()),
            })
    }
}
