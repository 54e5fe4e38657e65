//! Consul agent client: health-filtered lookup, service registration and KV reads.
//!
//! Services are registered under `<environment>-<name>` and tagged
//! `version=<version>`, so one Consul catalog can hold several environments
//! and versions of the same service side by side.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{DiscoveryError, ServiceQuery, ServiceRegistry};

/// Catalog name of a service inside Consul.
pub fn consul_service_name(query: &ServiceQuery) -> String {
    format!("{}-{}", query.environment, query.name)
}

pub fn version_tag(version: &str) -> String {
    format!("version={version}")
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConsulCheck {
    #[serde(rename = "CheckID")]
    pub check_id: String,
    #[serde(rename = "TTL")]
    pub ttl: String,
    pub deregister_critical_service_after: String,
}

/// Payload for `PUT /v1/agent/service/register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConsulRegistration {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub port: u16,
    pub check: ConsulCheck,
}

impl ConsulRegistration {
    /// Registration with a TTL check the owner must keep passing.
    pub fn for_service(
        query: &ServiceQuery,
        instance_id: &str,
        address: Option<String>,
        port: u16,
        ttl_secs: u64,
    ) -> Self {
        let name = consul_service_name(query);
        let id = format!("{name}-{instance_id}");
        Self {
            check: ConsulCheck {
                check_id: format!("service:{id}"),
                ttl: format!("{ttl_secs}s"),
                deregister_critical_service_after: format!("{}s", ttl_secs * 4),
            },
            id,
            name,
            tags: vec![version_tag(&query.version)],
            address,
            port,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthNode {
    #[serde(default)]
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthService {
    #[serde(default)]
    address: String,
    port: u16,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// One entry of `GET /v1/health/service/<name>`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthEntry {
    node: HealthNode,
    service: HealthService,
}

/// Base URLs of the entries carrying the requested version tag.
///
/// The service address wins over the node address when both are set.
fn instances_from_health(entries: Vec<HealthEntry>, version: &str) -> Vec<Url> {
    let tag = version_tag(version);
    entries
        .into_iter()
        .filter(|e| {
            e.service
                .tags
                .as_ref()
                .is_some_and(|tags| tags.iter().any(|t| *t == tag))
        })
        .filter_map(|e| {
            let host = if e.service.address.is_empty() {
                e.node.address
            } else {
                e.service.address
            };
            if host.is_empty() {
                return None;
            }
            let host = if host.contains(':') { format!("[{host}]") } else { host };
            Url::parse(&format!("http://{host}:{}", e.service.port)).ok()
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ConsulClient {
    http: reqwest::Client,
    base: Url,
}

impl ConsulClient {
    /// `base` may carry a path prefix (an agent behind a proxy); it is kept.
    pub fn new(mut base: Url, http: reqwest::Client) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { http, base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, DiscoveryError> {
        self.base
            .join(path)
            .map_err(|e| DiscoveryError::InvalidAddress(format!("{}{path}: {e}", self.base)))
    }

    async fn put(&self, url: Url, body: Option<&ConsulRegistration>) -> Result<(), DiscoveryError> {
        let req = self.http.put(url);
        let req = match body {
            Some(body) => req.json(body),
            None => req,
        };
        let res = req
            .send()
            .await
            .map_err(|e| DiscoveryError::Request(e.to_string()))?;
        if !res.status().is_success() {
            return Err(DiscoveryError::Status(res.status().as_u16()));
        }
        Ok(())
    }

    #[instrument(skip_all, fields(service_id = %registration.id), err)]
    pub async fn register(&self, registration: &ConsulRegistration) -> Result<(), DiscoveryError> {
        let url = self.endpoint("v1/agent/service/register")?;
        self.put(url, Some(registration)).await
    }

    pub async fn pass_check(&self, check_id: &str) -> Result<(), DiscoveryError> {
        let url = self.endpoint(&format!("v1/agent/check/pass/{check_id}"))?;
        self.put(url, None).await
    }

    #[instrument(skip(self), err)]
    pub async fn deregister(&self, service_id: &str) -> Result<(), DiscoveryError> {
        let url = self.endpoint(&format!("v1/agent/service/deregister/{service_id}"))?;
        self.put(url, None).await
    }

    /// Raw value of a KV key; `None` when the key does not exist.
    pub async fn kv_get(&self, key: &str) -> Result<Option<String>, DiscoveryError> {
        let mut url = self.endpoint(&format!("v1/kv/{key}"))?;
        url.query_pairs_mut().append_key_only("raw");

        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| DiscoveryError::Request(e.to_string()))?;
        match res.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => res
                .text()
                .await
                .map(Some)
                .map_err(|e| DiscoveryError::Request(e.to_string())),
            s => Err(DiscoveryError::Status(s.as_u16())),
        }
    }
}

#[async_trait]
impl ServiceRegistry for ConsulClient {
    #[instrument(skip(self, query), fields(service = %query))]
    async fn instances(&self, query: &ServiceQuery) -> Result<Vec<Url>, DiscoveryError> {
        let mut url = self.endpoint(&format!("v1/health/service/{}", consul_service_name(query)))?;
        url.query_pairs_mut().append_pair("passing", "true");

        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| DiscoveryError::Request(e.to_string()))?;
        if !res.status().is_success() {
            return Err(DiscoveryError::Status(res.status().as_u16()));
        }

        let entries: Vec<HealthEntry> = res
            .json()
            .await
            .map_err(|e| DiscoveryError::Request(e.to_string()))?;
        Ok(instances_from_health(entries, &query.version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_entries_are_filtered_by_version_tag() {
        let entries: Vec<HealthEntry> = serde_json::from_value(serde_json::json!([
            {
                "Node": { "Node": "agent-1", "Address": "10.0.0.1" },
                "Service": { "ID": "dev-customer-service-a", "Address": "", "Port": 9000, "Tags": ["version=1.0.0"] },
                "Checks": []
            },
            {
                "Node": { "Address": "10.0.0.2" },
                "Service": { "Address": "172.17.0.5", "Port": 9001, "Tags": ["version=1.0.0"] }
            },
            {
                "Node": { "Address": "10.0.0.3" },
                "Service": { "Address": "", "Port": 9002, "Tags": ["version=2.0.0"] }
            },
            {
                "Node": { "Address": "10.0.0.4" },
                "Service": { "Address": "", "Port": 9003, "Tags": null }
            }
        ]))
        .unwrap();

        let urls = instances_from_health(entries, "1.0.0");
        assert_eq!(
            urls,
            vec![
                Url::parse("http://10.0.0.1:9000").unwrap(),
                Url::parse("http://172.17.0.5:9001").unwrap(),
            ]
        );
    }

    #[test]
    fn registration_payload_uses_consul_field_names() {
        let query = ServiceQuery::new("orders-service", "1.0.0", "dev");
        let reg = ConsulRegistration::for_service(&query, "abc", None, 8080, 30);

        let json = serde_json::to_value(&reg).unwrap();
        assert_eq!(json["ID"], "dev-orders-service-abc");
        assert_eq!(json["Name"], "dev-orders-service");
        assert_eq!(json["Tags"][0], "version=1.0.0");
        assert_eq!(json["Port"], 8080);
        assert!(json.get("Address").is_none());
        assert_eq!(json["Check"]["CheckID"], "service:dev-orders-service-abc");
        assert_eq!(json["Check"]["TTL"], "30s");
        assert_eq!(json["Check"]["DeregisterCriticalServiceAfter"], "120s");
    }

    #[test]
    fn endpoints_join_onto_the_agent_url() {
        let client = ConsulClient::new(
            Url::parse("http://localhost:8500").unwrap(),
            reqwest::Client::new(),
        );
        assert_eq!(
            client.endpoint("v1/agent/service/register").unwrap().as_str(),
            "http://localhost:8500/v1/agent/service/register"
        );
    }

    #[test]
    fn endpoints_keep_a_proxy_path_prefix() {
        let client = ConsulClient::new(
            Url::parse("http://proxy/consul").unwrap(),
            reqwest::Client::new(),
        );
        assert_eq!(client.base().as_str(), "http://proxy/consul/");
        assert_eq!(
            client.endpoint("v1/kv/some/key").unwrap().as_str(),
            "http://proxy/consul/v1/kv/some/key"
        );
    }
}
