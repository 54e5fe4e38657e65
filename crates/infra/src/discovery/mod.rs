//! Service discovery: resolve a logical service to a base URL.
//!
//! A service is addressed by name, version and environment ([`ServiceQuery`]).
//! Registries ([`ServiceRegistry`]) list the live instances; the
//! [`ServiceLocator`] picks one and answers with an explicit [`Resolution`].
//! "Nothing registered" is a normal outcome, never an error.

pub mod consul;
pub mod locator;
pub mod registration;
pub mod static_registry;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use consul::{ConsulClient, ConsulRegistration};
pub use locator::ServiceLocator;
pub use registration::SelfRegistration;
pub use static_registry::{StaticInstance, StaticRegistry};

/// Logical service coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceQuery {
    pub name: String,
    pub version: String,
    pub environment: String,
}

impl ServiceQuery {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            environment: environment.into(),
        }
    }
}

impl core::fmt::Display for ServiceQuery {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}@{}", self.environment, self.name, self.version)
    }
}

/// Outcome of resolving a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(Url),
    NotFound,
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("registry request failed: {0}")]
    Request(String),

    #[error("registry returned status {0}")]
    Status(u16),

    #[error("invalid service address: {0}")]
    InvalidAddress(String),

    #[error("registry state poisoned")]
    Poisoned,
}

/// Registry of live service instances.
#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    /// Base URLs of the healthy instances of `query`. Empty when none are registered.
    async fn instances(&self, query: &ServiceQuery) -> Result<Vec<Url>, DiscoveryError>;
}
