use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Store-assigned order identifier.
///
/// Only the order store mints these; callers never choose an id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(i64);

impl OrderId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<OrderId> for i64 {
    fn from(value: OrderId) -> Self {
        value.0
    }
}

impl FromStr for OrderId {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|e| ServiceError::bad_request(format!("Invalid order id '{s}': {e}")))
    }
}

/// A persisted order linking a customer to a purchase description.
///
/// Serialized in the camelCase shape the peer customer service expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    /// Reference to a customer owned by the customer service (not enforced here).
    pub customer_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Order fields before the store has assigned an identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewOrder {
    pub customer_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl NewOrder {
    /// Attach a store-assigned id.
    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            customer_id: self.customer_id,
            title: self.title,
            description: self.description,
        }
    }
}
