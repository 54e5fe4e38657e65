//! `orders-core`: order domain building blocks.
//!
//! This crate contains **pure domain** types (no infrastructure concerns):
//! the order record, its identifier, the remote customer DTO, the query
//! parameter model and the single domain error surfaced to API callers.

pub mod customer;
pub mod error;
pub mod order;
pub mod query;

pub use customer::CustomerResponse;
pub use error::{ServiceError, ServiceResult};
pub use order::{NewOrder, Order, OrderId};
pub use query::{QueryError, QueryParameters};
