//! Infrastructure layer: order storage, service discovery, outbound clients, config.

pub mod config;
pub mod customer_client;
pub mod discovery;
pub mod maintenance;
pub mod order_store;
