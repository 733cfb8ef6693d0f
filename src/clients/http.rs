//! reqwest-backed implementation of [`StatusSource`].
//!
//! One shared `reqwest::Client`; each call sets its own timeout and makes a
//! single attempt.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

use super::error::ClientError;
use super::networks;
use super::StatusSource;
use crate::config::{ApiConfig, EndpointConfig, Timeouts};
use crate::models::{
    EntityCounts, IndexerInfo, IndexerSummary, Manifest, MetaSnapshot, SubgraphMeta,
};

/// Graph network subgraph holding indexer allocations
pub const NETWORK_SUBGRAPH_ID: &str = "DZz4kDTdmzWLWsV373w2bSmoar3umKKH9y82SUKr5qmp";

const META_QUERY: &str = "{_meta{block{number hash timestamp}deployment hasIndexingErrors}}";

const ALLOCATIONS_QUERY: &str = r#"query ($ipfsHash: String!) {
  subgraphDeployments(where: {ipfsHash: $ipfsHash}, first: 1) {
    id
    ipfsHash
    stakedTokens
    signalledTokens
    indexerAllocations(
      first: 50
      orderBy: allocatedTokens
      orderDirection: desc
      where: { status: Active }
    ) {
      id
      allocatedTokens
      indexer {
        id
        stakedTokens
        defaultDisplayName
      }
    }
  }
}"#;

const MAX_LISTED_INDEXERS: usize = 10;

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: Option<String>,
}

impl<T> GraphQlResponse<T> {
    fn first_error(&self) -> Option<String> {
        self.errors.first().map(|e| {
            e.message
                .clone()
                .unwrap_or_else(|| "Unknown error".to_string())
        })
    }
}

#[derive(Debug, Deserialize)]
struct MetaData {
    #[serde(rename = "_meta")]
    meta: Option<SubgraphMeta>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentsData {
    #[serde(default)]
    subgraph_deployments: Vec<DeploymentAllocations>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentAllocations {
    staked_tokens: Option<String>,
    signalled_tokens: Option<String>,
    #[serde(default)]
    indexer_allocations: Vec<Allocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Allocation {
    allocated_tokens: String,
    indexer: AllocationIndexer,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllocationIndexer {
    id: String,
    default_display_name: Option<String>,
}

impl AllocationIndexer {
    fn display_name(&self) -> String {
        match self.default_display_name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => format!("{}...", self.id.chars().take(10).collect::<String>()),
        }
    }
}

/// Talks to the Graph gateway, IPFS, chain RPC endpoints and the local backend
pub struct HttpStatusSource {
    client: Client,
    api_key: String,
    endpoints: EndpointConfig,
    timeouts: Timeouts,
    rpc_endpoints: HashMap<String, String>,
}

impl HttpStatusSource {
    pub fn new(config: &ApiConfig, api_key: String) -> Result<Self, ClientError> {
        Self::with_endpoints(config.endpoints.clone(), config.timeouts.clone(), api_key)
    }

    pub fn with_endpoints(
        endpoints: EndpointConfig,
        timeouts: Timeouts,
        api_key: String,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            api_key,
            endpoints,
            timeouts,
            rpc_endpoints: networks::default_rpc_endpoints(),
        })
    }

    /// Replaces the network -> RPC endpoint table
    pub fn with_rpc_endpoints(mut self, rpc_endpoints: HashMap<String, String>) -> Self {
        self.rpc_endpoints = rpc_endpoints;
        self
    }

    fn subgraph_url(&self, subgraph_id: &str) -> String {
        format!(
            "{}/subgraphs/id/{}",
            self.endpoints.gateway_url.trim_end_matches('/'),
            subgraph_id
        )
    }

    fn manifest_urls(&self, deployment_id: &str) -> [String; 2] {
        [
            format!("{}?arg={}", self.endpoints.ipfs_gateway_url, deployment_id),
            format!(
                "{}/{}",
                self.endpoints.ipfs_fallback_url.trim_end_matches('/'),
                deployment_id
            ),
        ]
    }

    async fn post_graphql<T: DeserializeOwned>(
        &self,
        subgraph_id: &str,
        body: Value,
        timeout: Duration,
    ) -> Result<GraphQlResponse<T>, ClientError> {
        let response = self
            .client
            .post(self.subgraph_url(subgraph_id))
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(timeout)
            .send()
            .await?;

        // The gateway reports query errors in the body, whatever the status
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn query_meta(&self, subgraph_id: &str) -> Result<SubgraphMeta, ClientError> {
        let response: GraphQlResponse<MetaData> = self
            .post_graphql(subgraph_id, json!({ "query": META_QUERY }), self.timeouts.meta)
            .await?;

        let error = response.first_error();
        match (response.data.and_then(|d| d.meta), error) {
            (Some(meta), _) => Ok(meta),
            (None, Some(error)) => Err(ClientError::Upstream(error)),
            (None, None) => Err(ClientError::Upstream("Invalid response".to_string())),
        }
    }

    async fn query_allocations(&self, deployment_id: &str) -> Result<IndexerInfo, ClientError> {
        let body = json!({
            "query": ALLOCATIONS_QUERY,
            "variables": { "ipfsHash": deployment_id },
        });
        let response: GraphQlResponse<DeploymentsData> = self
            .post_graphql(NETWORK_SUBGRAPH_ID, body, self.timeouts.allocations)
            .await?;

        let error = response.first_error();
        let deployment = response
            .data
            .and_then(|d| d.subgraph_deployments.into_iter().next());

        match (deployment, error) {
            (Some(deployment), _) => Ok(summarize_allocations(deployment)),
            (None, Some(error)) => Err(ClientError::Upstream(error)),
            // Not indexed by anyone on the network
            (None, None) => Ok(IndexerInfo::default()),
        }
    }

    async fn get_manifest_from(&self, url: &str) -> Result<Manifest, ClientError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeouts.manifest)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        Manifest::from_yaml(&text)
            .ok_or_else(|| ClientError::Decode("manifest is not valid YAML".to_string()))
    }

    async fn query_chain_head(&self, network: &str) -> Result<u64, ClientError> {
        let url = self
            .rpc_endpoints
            .get(network)
            .ok_or_else(|| ClientError::UnknownNetwork(network.to_string()))?;

        let request_body = json!({
            "jsonrpc": "2.0",
            "method": "eth_blockNumber",
            "params": [],
            "id": 1
        });

        let response = self
            .client
            .post(url)
            .json(&request_body)
            .timeout(self.timeouts.chain_head)
            .send()
            .await?;

        let response_json: Value = response.json().await?;

        if let Some(error) = response_json.get("error") {
            return Err(ClientError::Upstream(error.to_string()));
        }

        let result = response_json
            .get("result")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::Decode("No result in response".to_string()))?;

        parse_block_number(result)
    }

    async fn query_entity_counts(&self) -> Result<EntityCounts, ClientError> {
        let url = format!(
            "{}/api/entity-stats",
            self.endpoints.backend_url.trim_end_matches('/')
        );
        let response = self
            .client
            .get(url)
            .timeout(self.timeouts.entity_stats)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }

        let stats: HashMap<String, Value> = response.json().await?;
        Ok(stats
            .into_iter()
            .map(|(key, stat)| {
                let count = stat.get("count").and_then(Value::as_u64).unwrap_or(0);
                (key, count)
            })
            .collect())
    }
}

fn summarize_allocations(deployment: DeploymentAllocations) -> IndexerInfo {
    let indexers = deployment
        .indexer_allocations
        .iter()
        .take(MAX_LISTED_INDEXERS)
        .map(|allocation| IndexerSummary {
            id: allocation.indexer.id.clone(),
            name: allocation.indexer.display_name(),
            allocated: allocation.allocated_tokens.clone(),
        })
        .collect();

    IndexerInfo {
        error: None,
        indexer_count: deployment.indexer_allocations.len(),
        total_stake: Some(deployment.staked_tokens.unwrap_or_else(|| "0".to_string())),
        signal: Some(deployment.signalled_tokens.unwrap_or_else(|| "0".to_string())),
        indexers,
    }
}

/// Parses an `eth_blockNumber` hex quantity
fn parse_block_number(raw: &str) -> Result<u64, ClientError> {
    let digits = raw.trim_start_matches("0x");
    u64::from_str_radix(digits, 16)
        .map_err(|e| ClientError::Decode(format!("Invalid block number {}: {}", raw, e)))
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch_entity_counts(&self) -> EntityCounts {
        match self.query_entity_counts().await {
            Ok(counts) => counts,
            Err(e) => {
                tracing::warn!("Failed to load local entity counts: {}", e);
                EntityCounts::new()
            }
        }
    }

    async fn fetch_meta(&self, subgraph_id: &str) -> MetaSnapshot {
        match self.query_meta(subgraph_id).await {
            Ok(meta) => MetaSnapshot::Meta(meta),
            Err(e) => {
                tracing::warn!("Meta query failed for subgraph {}: {}", subgraph_id, e);
                MetaSnapshot::error(e.to_string())
            }
        }
    }

    async fn fetch_manifest(&self, deployment_id: &str) -> Option<Manifest> {
        for url in self.manifest_urls(deployment_id) {
            match self.get_manifest_from(&url).await {
                Ok(manifest) => return Some(manifest),
                Err(e) => tracing::warn!("Manifest fetch from {} failed: {}", url, e),
            }
        }
        None
    }

    async fn fetch_indexer_allocations(&self, deployment_id: &str) -> IndexerInfo {
        match self.query_allocations(deployment_id).await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!("Allocation query failed for {}: {}", deployment_id, e);
                IndexerInfo::failed(e.to_string())
            }
        }
    }

    async fn fetch_chain_head(&self, network: &str) -> Option<u64> {
        match self.query_chain_head(network).await {
            Ok(block) => Some(block),
            Err(ClientError::UnknownNetwork(_)) => {
                tracing::debug!("No RPC endpoint configured for network {}", network);
                None
            }
            Err(e) => {
                tracing::warn!("Chain head query failed for {}: {}", network, e);
                None
            }
        }
    }
}
