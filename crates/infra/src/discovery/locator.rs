use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::instrument;

use super::{Resolution, ServiceQuery, ServiceRegistry};

/// Resolves one configured target service through a registry.
///
/// Instances are handed out round-robin. Registry failures resolve to
/// `NotFound` (logged), so callers only ever deal with the two outcomes.
pub struct ServiceLocator {
    registry: Arc<dyn ServiceRegistry>,
    target: ServiceQuery,
    cursor: AtomicUsize,
}

impl ServiceLocator {
    pub fn new(registry: Arc<dyn ServiceRegistry>, target: ServiceQuery) -> Self {
        Self {
            registry,
            target,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn target(&self) -> &ServiceQuery {
        &self.target
    }

    /// Resolve the configured target.
    pub async fn resolve(&self) -> Resolution {
        self.resolve_query(&self.target).await
    }

    #[instrument(skip(self, query), fields(service = %query))]
    pub async fn resolve_query(&self, query: &ServiceQuery) -> Resolution {
        match self.registry.instances(query).await {
            Ok(instances) if instances.is_empty() => {
                tracing::debug!("no instance registered");
                Resolution::NotFound
            }
            Ok(instances) => {
                let i = self.cursor.fetch_add(1, Ordering::Relaxed) % instances.len();
                Resolution::Found(instances[i].clone())
            }
            Err(e) => {
                tracing::warn!(error = %e, "service registry lookup failed");
                Resolution::NotFound
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use reqwest::Url;

    use super::*;
    use crate::discovery::{DiscoveryError, StaticRegistry};

    fn customers() -> ServiceQuery {
        ServiceQuery::new("customer-service", "1.0.0", "dev")
    }

    struct BrokenRegistry;

    #[async_trait]
    impl ServiceRegistry for BrokenRegistry {
        async fn instances(&self, _query: &ServiceQuery) -> Result<Vec<Url>, DiscoveryError> {
            Err(DiscoveryError::Status(500))
        }
    }

    #[tokio::test]
    async fn empty_registry_is_not_found() {
        let locator = ServiceLocator::new(Arc::new(StaticRegistry::new()), customers());
        assert_eq!(locator.resolve().await, Resolution::NotFound);
    }

    #[tokio::test]
    async fn registry_failure_is_not_found() {
        let locator = ServiceLocator::new(Arc::new(BrokenRegistry), customers());
        assert_eq!(locator.resolve().await, Resolution::NotFound);
    }

    #[tokio::test]
    async fn instances_rotate() {
        let registry = Arc::new(StaticRegistry::new());
        let a = Url::parse("http://10.0.0.1:9000").unwrap();
        let b = Url::parse("http://10.0.0.2:9000").unwrap();
        registry.register(customers(), a.clone()).unwrap();
        registry.register(customers(), b.clone()).unwrap();

        let locator = ServiceLocator::new(registry, customers());
        assert_eq!(locator.resolve().await, Resolution::Found(a.clone()));
        assert_eq!(locator.resolve().await, Resolution::Found(b));
        assert_eq!(locator.resolve().await, Resolution::Found(a));
    }

    #[tokio::test]
    async fn version_and_environment_must_match() {
        let registry = Arc::new(StaticRegistry::new());
        let url = Url::parse("http://10.0.0.1:9000").unwrap();
        registry
            .register(ServiceQuery::new("customer-service", "2.0.0", "dev"), url.clone())
            .unwrap();
        registry
            .register(ServiceQuery::new("customer-service", "1.0.0", "prod"), url)
            .unwrap();

        let locator = ServiceLocator::new(registry, customers());
        assert_eq!(locator.resolve().await, Resolution::NotFound);
    }
}
