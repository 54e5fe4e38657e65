//! Request/response DTOs and mapping to/from domain types.

use serde::{Deserialize, Serialize};

use orders_core::NewOrder;

/// Body of `POST /orders`. Any `id` sent by the caller is ignored.
///
/// Missing and `null` fields are both accepted; a missing customer becomes 0.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderRequest {
    pub customer_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl OrderRequest {
    pub fn into_new_order(self) -> NewOrder {
        NewOrder {
            customer_id: self.customer_id.unwrap_or(0),
            title: self.title,
            description: self.description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ignores_caller_supplied_id() {
        let req: OrderRequest = serde_json::from_value(serde_json::json!({
            "id": 999,
            "customerId": 100,
            "title": "New order",
            "description": "This is a new order."
        }))
        .unwrap();

        let new = req.into_new_order();
        assert_eq!(new.customer_id, 100);
        assert_eq!(new.title.as_deref(), Some("New order"));
    }

    #[test]
    fn missing_fields_default() {
        let req: OrderRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(req.into_new_order(), NewOrder::default());
    }

    #[test]
    fn null_fields_are_accepted() {
        let req: OrderRequest = serde_json::from_value(serde_json::json!({
            "customerId": null,
            "title": "t",
            "description": null
        }))
        .unwrap();

        let new = req.into_new_order();
        assert_eq!(new.customer_id, 0);
        assert_eq!(new.title.as_deref(), Some("t"));
        assert_eq!(new.description, None);
    }
}
