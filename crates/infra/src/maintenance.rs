//! Maintenance mode: a process-wide switch, optionally mirrored from Consul KV.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::discovery::{ConsulClient, ServiceQuery};

/// Shared on/off flag read by the HTTP middleware on every request.
#[derive(Debug, Clone, Default)]
pub struct MaintenanceSwitch(Arc<AtomicBool>);

impl MaintenanceSwitch {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Set the flag; returns the previous value.
    pub fn set(&self, enabled: bool) -> bool {
        self.0.swap(enabled, Ordering::Relaxed)
    }
}

/// Consul KV key holding the maintenance flag of `service`.
pub fn maintenance_key(service: &ServiceQuery) -> String {
    format!(
        "environments/{}/services/{}/{}/config/rest-config/maintenance",
        service.environment, service.name, service.version
    )
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Poll `key` every `every` and mirror its value into `switch`.
///
/// A missing key or an unreachable agent leaves the current value untouched.
pub fn spawn_consul_watch(
    client: ConsulClient,
    key: String,
    switch: MaintenanceSwitch,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match client.kv_get(&key).await {
                Ok(Some(raw)) => match parse_flag(&raw) {
                    Some(enabled) => {
                        if switch.set(enabled) != enabled {
                            tracing::info!(key = %key, enabled, "maintenance mode changed");
                        }
                    }
                    None => tracing::warn!(key = %key, value = %raw, "ignoring non-boolean maintenance flag"),
                },
                Ok(None) => {}
                Err(e) => tracing::warn!(key = %key, error = %e, "maintenance flag lookup failed"),
            }
        }
    })
}
