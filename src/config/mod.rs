// Configuration management from environment variables and the sources file

use dotenv::dotenv;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Timeouts applied to each kind of external call
#[derive(Debug, Clone)]
pub struct Timeouts {
    pub meta: Duration,
    pub manifest: Duration,
    pub allocations: Duration,
    pub chain_head: Duration,
    pub entity_stats: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            meta: Duration::from_secs(15),
            manifest: Duration::from_secs(15),
            allocations: Duration::from_secs(15),
            chain_head: Duration::from_secs(10),
            entity_stats: Duration::from_secs(5),
        }
    }
}

/// Endpoints of the external services the status pipeline talks to
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Graph gateway base, without the `/subgraphs/id/...` suffix
    pub gateway_url: String,
    /// Primary IPFS `cat` endpoint, queried with `?arg={cid}`
    pub ipfs_gateway_url: String,
    /// Public IPFS gateway, queried as `{url}/{cid}`
    pub ipfs_fallback_url: String,
    /// Local backend exposing `/api/entity-stats`
    pub backend_url: String,
}

/// Configuration settings for the status API server
#[derive(Debug, Clone)]
pub struct ApiConfig {
    // Server configuration
    pub host: String,
    pub port: u16,

    // Sources file and credentials
    pub sources_path: String,
    pub api_key_override: Option<String>,

    pub endpoints: EndpointConfig,
    pub timeouts: Timeouts,
}

impl ApiConfig {
    /// Creates configuration instance from environment variables with defaults
    pub fn from_env() -> Self {
        dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .unwrap_or(8000);
        let sources_path =
            env::var("GRAPH_CONFIG_PATH").unwrap_or_else(|_| "config.json".to_string());
        let api_key_override = env::var("GRAPH_API_KEY").ok().filter(|k| !k.is_empty());

        let endpoints = EndpointConfig {
            gateway_url: env::var("GRAPH_GATEWAY_URL")
                .unwrap_or_else(|_| "https://gateway.thegraph.com/api".to_string()),
            ipfs_gateway_url: env::var("IPFS_GATEWAY_URL").unwrap_or_else(|_| {
                "https://ipfs.network.thegraph.com/api/v0/cat".to_string()
            }),
            ipfs_fallback_url: env::var("IPFS_FALLBACK_URL")
                .unwrap_or_else(|_| "https://ipfs.io/ipfs".to_string()),
            backend_url: env::var("BACKEND_API_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8001".to_string()),
        };

        Self {
            host,
            port,
            sources_path,
            api_key_override,
            endpoints,
            timeouts: Timeouts::default(),
        }
    }

    /// Returns formatted server address string (host:port)
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// One logical indexing pipeline as declared in the sources file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub subgraph_id: String,
    /// Entity name -> local table name, in file order
    #[serde(default)]
    pub entities: IndexMap<String, String>,
}

/// Contents of the sources file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
}

impl SourcesConfig {
    /// Reads and parses the sources file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Only the sources with `enabled: true`
    pub fn enabled_sources(&self) -> BTreeMap<String, SourceConfig> {
        self.sources
            .iter()
            .filter(|(_, source)| source.enabled)
            .map(|(name, source)| (name.clone(), source.clone()))
            .collect()
    }
}
