//! Configuration loading and representation.
//!
//! Sources, lowest to highest precedence:
//! 1. built-in defaults
//! 2. a TOML file (`config.toml` unless `ORDERS_CONFIG` points elsewhere)
//! 3. `ORDERS_`-prefixed environment variables, nested with `__`
//!    (`ORDERS_SERVER__PORT=8081`, `ORDERS_REST__MAINTENANCE=true`)

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::discovery::{ServiceQuery, StaticInstance};

pub const ENV_PREFIX: &str = "ORDERS_";
pub const CONFIG_PATH_VAR: &str = "ORDERS_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(#[from] figment::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// This service's own identity, used when registering with discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub version: String,
    pub environment: String,
    /// Address advertised to the registry; the agent's view of us when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "orders-service".to_string(),
            version: "1.0.0".to_string(),
            environment: "dev".to_string(),
            address: None,
        }
    }
}

impl ServiceConfig {
    pub fn query(&self) -> ServiceQuery {
        ServiceQuery::new(&self.name, &self.version, &self.environment)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryBackend {
    #[default]
    Static,
    Consul,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub backend: DiscoveryBackend,
    pub consul_url: String,
    /// Register this service on startup (Consul backend only).
    pub register: bool,
    pub ttl_secs: u64,
    pub ping_interval_secs: u64,
    /// Where the customer lookup endpoint sends its calls.
    pub customer_service: ServiceQuery,
    /// Instances known to the static backend.
    pub instances: Vec<StaticInstance>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            backend: DiscoveryBackend::Static,
            consul_url: "http://localhost:8500".to_string(),
            register: false,
            ttl_secs: 30,
            ping_interval_secs: 20,
            customer_service: ServiceQuery::new("customer-service", "1.0.0", "dev"),
            instances: Vec::new(),
        }
    }
}

impl DiscoveryConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomersConfig {
    pub timeout_ms: u64,
}

impl Default for CustomersConfig {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

impl CustomersConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestConfig {
    pub maintenance: bool,
    /// Follow the maintenance flag in Consul KV (Consul backend only).
    pub watch: bool,
    pub watch_interval_secs: u64,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            maintenance: false,
            watch: false,
            watch_interval_secs: 10,
        }
    }
}

impl RestConfig {
    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub service: ServiceConfig,
    /// In-memory storage when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseConfig>,
    pub discovery: DiscoveryConfig,
    pub customers: CustomersConfig,
    pub rest: RestConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load(path: &str) -> Result<Self, ConfigError> {
        Ok(Self::figment(path).extract()?)
    }

    /// Load from `$ORDERS_CONFIG`, falling back to `config.toml`.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(&path)
    }
}
