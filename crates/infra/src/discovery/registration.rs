use std::time::Duration;

use tokio::task::JoinHandle;

use super::{ConsulClient, ConsulRegistration, DiscoveryError};

/// This process's registration in Consul.
///
/// A background task keeps the TTL check passing until [`deregister`] is
/// called (normally from the shutdown path).
///
/// [`deregister`]: SelfRegistration::deregister
pub struct SelfRegistration {
    client: ConsulClient,
    service_id: String,
    heartbeat: JoinHandle<()>,
}

impl SelfRegistration {
    pub async fn start(
        client: ConsulClient,
        registration: ConsulRegistration,
        ping_interval: Duration,
    ) -> Result<Self, DiscoveryError> {
        client.register(&registration).await?;
        tracing::info!(
            service_id = %registration.id,
            service = %registration.name,
            "registered with consul"
        );

        let check_id = registration.check.check_id.clone();
        let pinger = client.clone();
        let heartbeat = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(ping_interval);
            loop {
                ticker.tick().await;
                if let Err(e) = pinger.pass_check(&check_id).await {
                    tracing::warn!(check_id = %check_id, error = %e, "ttl check update failed");
                }
            }
        });

        Ok(Self {
            client,
            service_id: registration.id,
            heartbeat,
        })
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Stop the heartbeat and remove the service from the catalog.
    pub async fn deregister(self) -> Result<(), DiscoveryError> {
        self.heartbeat.abort();
        self.client.deregister(&self.service_id).await?;
        tracing::info!(service_id = %self.service_id, "deregistered from consul");
        Ok(())
    }
}
