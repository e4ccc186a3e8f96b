//! Consul adapters over the HTTP API.
//!
//! - KV: `GET /v1/kv/<key>?raw` with the key's modify index taken from the
//!   `X-Consul-Index` header; conditional writes via `PUT ?cas=<index>`,
//!   where index 0 means "create only".
//! - Catalog: `GET /v1/health/service/<name>?passing=true[&tag=<tag>]`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::domain::{Revision, ServiceInstance};
use crate::ports::{
    CatalogError, KeyValueStore, PutOutcome, ServiceCatalog, StoreError, VersionedValue,
};

const INDEX_HEADER: &str = "X-Consul-Index";
const TOKEN_HEADER: &str = "X-Consul-Token";

#[derive(Debug, Clone)]
pub struct ConsulConfig {
    /// `host:port` or a full `http(s)://` base URL
    pub address: String,
    /// ACL token sent as `X-Consul-Token`
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            address: "localhost:8500".to_string(),
            token: None,
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConsulError {
    #[error("invalid consul address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Shared HTTP client for both Consul adapters.
#[derive(Debug, Clone)]
pub struct ConsulClient {
    http: Client,
    base: Url,
    token: Option<String>,
}

impl ConsulClient {
    pub fn new(config: &ConsulConfig) -> Result<Self, ConsulError> {
        let base = parse_base_url(&config.address)?;
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            base,
            token: config.token.clone(),
        })
    }

    fn url(&self, prefix: &[&str], path: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.extend(prefix);
            segments.extend(path.split('/'));
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.header(TOKEN_HEADER, token),
            None => builder,
        }
    }
}

fn parse_base_url(address: &str) -> Result<Url, ConsulError> {
    let with_scheme = if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{address}")
    };
    let url = Url::parse(&with_scheme).map_err(|e| ConsulError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ConsulError::InvalidAddress {
            address: address.to_string(),
            reason: "not a base URL".into(),
        });
    }
    Ok(url)
}

/// URL path normalization folds `.` and `..` segments into their parent,
/// which would alias two distinct keys onto one Consul entry.
fn check_key(key: &str) -> Result<(), StoreError> {
    let dotted = key.split('/').any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    });
    if dotted {
        return Err(StoreError::Protocol(format!(
            "key {key:?} contains a dot path segment"
        )));
    }
    Ok(())
}

fn parse_index(value: Option<&str>) -> Result<Revision, StoreError> {
    let raw = value.ok_or_else(|| StoreError::Protocol(format!("missing {INDEX_HEADER}")))?;
    raw.trim()
        .parse::<u64>()
        .map(Revision)
        .map_err(|_| StoreError::Protocol(format!("bad {INDEX_HEADER}: {raw:?}")))
}

fn parse_cas_reply(body: &str) -> Result<bool, StoreError> {
    match body.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(StoreError::Protocol(format!("unexpected CAS reply {other:?}"))),
    }
}

// =============================================================================
// KEY-VALUE STORE
// =============================================================================

#[derive(Debug, Clone)]
pub struct ConsulKeyValueStore {
    client: ConsulClient,
}

impl ConsulKeyValueStore {
    pub fn new(client: ConsulClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KeyValueStore for ConsulKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, StoreError> {
        check_key(key)?;
        let mut url = self.client.url(&["v1", "kv"], key);
        url.query_pairs_mut().append_key_only("raw");

        let response = self
            .client
            .request(Method::GET, url)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(StoreError::Protocol(format!(
                "GET {key} returned {}",
                response.status()
            )));
        }

        let revision = parse_index(
            response
                .headers()
                .get(INDEX_HEADER)
                .and_then(|v| v.to_str().ok()),
        )?;
        let value = response
            .bytes()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Some(VersionedValue {
            value: value.to_vec(),
            revision,
        }))
    }

    async fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        expected: Revision,
    ) -> Result<PutOutcome, StoreError> {
        check_key(key)?;
        let mut url = self.client.url(&["v1", "kv"], key);
        url.query_pairs_mut()
            .append_pair("cas", &expected.0.to_string());

        let response = self
            .client
            .request(Method::PUT, url)
            .body(value)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Protocol(format!(
                "PUT {key} returned {}",
                response.status()
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if !parse_cas_reply(&body)? {
            debug!(key, expected = %expected, "consul CAS rejected");
            return Ok(PutOutcome::Conflict);
        }

        // The write's own index is not returned by Consul; callers re-read
        // before the next conditional write.
        Ok(PutOutcome::Written(expected))
    }
}

// =============================================================================
// SERVICE CATALOG
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthEntry {
    node: HealthNode,
    service: HealthService,
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
    #[serde(rename = "ID")]
    id: String,
    #[serde(default)]
    address: String,
    port: u16,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

impl From<HealthEntry> for ServiceInstance {
    fn from(entry: HealthEntry) -> Self {
        // An empty service address means "use the agent's node address".
        let address = if entry.service.address.is_empty() {
            entry.node.address
        } else {
            entry.service.address
        };
        let mut instance = ServiceInstance::new(entry.service.id, address, entry.service.port);
        instance.tags = entry.service.tags.unwrap_or_default();
        instance
    }
}

#[derive(Debug, Clone)]
pub struct ConsulServiceCatalog {
    client: ConsulClient,
}

impl ConsulServiceCatalog {
    pub fn new(client: ConsulClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ServiceCatalog for ConsulServiceCatalog {
    async fn query_healthy(
        &self,
        service: &str,
        tag: Option<&str>,
    ) -> Result<Vec<ServiceInstance>, CatalogError> {
        let mut url = self.client.url(&["v1", "health", "service"], service);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("passing", "true");
            if let Some(tag) = tag {
                query.append_pair("tag", tag);
            }
        }

        let response = self
            .client
            .request(Method::GET, url)
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CatalogError::Protocol(format!(
                "health query for {service} returned {}",
                response.status()
            )));
        }

        let entries: Vec<HealthEntry> = response
            .json()
            .await
            .map_err(|e| CatalogError::Protocol(e.to_string()))?;
        Ok(entries.into_iter().map(ServiceInstance::from).collect())
    }
}
