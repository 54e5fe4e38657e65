use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::instrument;

use orders_core::{NewOrder, Order, OrderId, QueryParameters};

use super::{OrderStore, StoreError};

#[derive(Debug)]
struct Inner {
    next_id: i64,
    orders: BTreeMap<OrderId, Order>,
}

/// In-memory order store for tests/dev.
///
/// Ids start at 1 and are assigned under the write lock, so concurrent
/// creates never share an id.
#[derive(Debug)]
pub struct InMemoryOrderStore {
    inner: RwLock<Inner>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_id: 1,
                orders: BTreeMap::new(),
            }),
        }
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner.orders.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl Default for InMemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> StoreError {
    StoreError::Storage("order store lock poisoned".to_string())
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    #[instrument(skip_all, fields(filters = query.filters.len()))]
    async fn list(&self, query: &QueryParameters) -> Result<Vec<Order>, StoreError> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(query.apply(inner.orders.values().cloned()))
    }

    #[instrument(skip(self, id), fields(order_id = %id))]
    async fn get(&self, id: OrderId) -> Result<Order, StoreError> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        inner.orders.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    #[instrument(skip_all, fields(customer_id = order.customer_id))]
    async fn create(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        let id = OrderId::new(inner.next_id);
        inner.next_id += 1;

        let order = order.into_order(id);
        inner.orders.insert(id, order.clone());
        Ok(order)
    }
}
