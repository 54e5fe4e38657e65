use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::{DiscoveryError, ServiceQuery, ServiceRegistry};

/// A statically configured service instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticInstance {
    pub name: String,
    pub version: String,
    pub environment: String,
    pub url: String,
}

/// In-process registry fed from configuration (or by tests at runtime).
#[derive(Debug, Default)]
pub struct StaticRegistry {
    instances: RwLock<Vec<(ServiceQuery, Url)>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_instances<'a, I>(instances: I) -> Result<Self, DiscoveryError>
    where
        I: IntoIterator<Item = &'a StaticInstance>,
    {
        let registry = Self::new();
        for inst in instances {
            let url = Url::parse(&inst.url)
                .map_err(|e| DiscoveryError::InvalidAddress(format!("{}: {e}", inst.url)))?;
            registry.register(
                ServiceQuery::new(&inst.name, &inst.version, &inst.environment),
                url,
            )?;
        }
        Ok(registry)
    }

    pub fn register(&self, query: ServiceQuery, url: Url) -> Result<(), DiscoveryError> {
        let mut instances = self.instances.write().map_err(|_| DiscoveryError::Poisoned)?;
        instances.push((query, url));
        Ok(())
    }

    /// Remove every instance of `query`; returns how many were dropped.
    pub fn deregister(&self, query: &ServiceQuery) -> Result<usize, DiscoveryError> {
        let mut instances = self.instances.write().map_err(|_| DiscoveryError::Poisoned)?;
        let before = instances.len();
        instances.retain(|(q, _)| q != query);
        Ok(before - instances.len())
    }
}

#[async_trait]
impl ServiceRegistry for StaticRegistry {
    async fn instances(&self, query: &ServiceQuery) -> Result<Vec<Url>, DiscoveryError> {
        let instances = self.instances.read().map_err(|_| DiscoveryError::Poisoned)?;
        Ok(instances
            .iter()
            .filter(|(q, _)| q == query)
            .map(|(_, url)| url.clone())
            .collect())
    }
}
