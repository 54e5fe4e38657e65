//! Order storage boundary.
//!
//! The store is the sole authority for order identity. `create` is atomic:
//! either the order is persisted with a fresh id or nothing is written.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use orders_core::{NewOrder, Order, OrderId, QueryParameters};

pub use in_memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;

/// Order store operation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("order {0} not found")]
    NotFound(OrderId),

    /// Backend I/O failure (connection loss, constraint violation, ...).
    #[error("storage error: {0}")]
    Storage(String),
}

/// Durable order record store.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Orders matching `query`, sorted and paginated as it requests.
    async fn list(&self, query: &QueryParameters) -> Result<Vec<Order>, StoreError>;

    async fn get(&self, id: OrderId) -> Result<Order, StoreError>;

    /// Assign an identity and persist in one atomic step.
    async fn create(&self, order: NewOrder) -> Result<Order, StoreError>;
}

#[async_trait]
impl<S> OrderStore for Arc<S>
where
    S: OrderStore + ?Sized,
{
    async fn list(&self, query: &QueryParameters) -> Result<Vec<Order>, StoreError> {
        (**self).list(query).await
    }

    async fn get(&self, id: OrderId) -> Result<Order, StoreError> {
        (**self).get(id).await
    }

    async fn create(&self, order: NewOrder) -> Result<Order, StoreError> {
        (**self).create(order).await
    }
}
