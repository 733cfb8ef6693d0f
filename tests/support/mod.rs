#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use graph_status_api::clients::StatusSource;
use graph_status_api::config::{SourceConfig, SourcesConfig};
use graph_status_api::models::{
    EntityCounts, IndexerInfo, IndexerSummary, Manifest, MetaBlock, MetaSnapshot, StatusEvent,
    SubgraphMeta,
};
use graph_status_api::services::{GraphStatusService, RunOutcome};
use tokio::sync::mpsc;

/// In-memory upstreams that record every call made to them
#[derive(Default)]
pub struct FakeSource {
    pub metas: HashMap<String, MetaSnapshot>,
    pub manifests: HashMap<String, Manifest>,
    pub allocations: HashMap<String, IndexerInfo>,
    pub heads: HashMap<String, u64>,
    pub counts: EntityCounts,
    /// Latency added to every upstream call
    pub delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl FakeSource {
    async fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }
}

#[async_trait]
impl StatusSource for FakeSource {
    async fn fetch_entity_counts(&self) -> EntityCounts {
        self.record("counts".to_string()).await;
        self.counts.clone()
    }

    async fn fetch_meta(&self, subgraph_id: &str) -> MetaSnapshot {
        self.record(format!("meta:{}", subgraph_id)).await;
        self.metas
            .get(subgraph_id)
            .cloned()
            .unwrap_or_else(|| MetaSnapshot::error("subgraph not found"))
    }

    async fn fetch_manifest(&self, deployment_id: &str) -> Option<Manifest> {
        self.record(format!("manifest:{}", deployment_id)).await;
        self.manifests.get(deployment_id).cloned()
    }

    async fn fetch_indexer_allocations(&self, deployment_id: &str) -> IndexerInfo {
        self.record(format!("allocations:{}", deployment_id)).await;
        self.allocations
            .get(deployment_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn fetch_chain_head(&self, network: &str) -> Option<u64> {
        self.record(format!("head:{}", network)).await;
        self.heads.get(network).copied()
    }
}

pub fn meta(block: u64, deployment: &str) -> MetaSnapshot {
    MetaSnapshot::Meta(SubgraphMeta {
        block: MetaBlock {
            number: block,
            hash: Some(format!("0x{:x}", block)),
            timestamp: Some(1_700_000_000),
        },
        deployment: Some(deployment.to_string()),
        has_indexing_errors: false,
    })
}

pub fn manifest(network: &str, start_block: u64, entities: &[&str]) -> Manifest {
    let entities = entities
        .iter()
        .map(|e| format!("        - {}\n", e))
        .collect::<String>();
    let raw = format!(
        r#"dataSources:
  - name: Exchange
    network: {network}
    source:
      address: "0xabc"
      startBlock: {start_block}
    mapping:
      entities:
{entities}templates:
  - name: Market
    network: {network}
    mapping:
      entities:
        - Market
"#
    );
    Manifest::from_yaml(&raw).unwrap()
}

pub fn allocations(count: usize) -> IndexerInfo {
    IndexerInfo {
        error: None,
        indexer_count: count,
        total_stake: Some("1000".to_string()),
        signal: Some("10".to_string()),
        indexers: (0..count.min(10))
            .map(|i| IndexerSummary {
                id: format!("0x{:040x}", i),
                name: format!("indexer-{}", i),
                allocated: "100".to_string(),
            })
            .collect(),
    }
}

pub fn source(enabled: bool, subgraph_id: &str, entities: &[(&str, &str)]) -> SourceConfig {
    SourceConfig {
        enabled,
        subgraph_id: subgraph_id.to_string(),
        entities: entities
            .iter()
            .map(|(entity, table)| (entity.to_string(), table.to_string()))
            .collect(),
    }
}

pub fn sources(entries: Vec<(&str, SourceConfig)>) -> SourcesConfig {
    SourcesConfig {
        api_key: "test-key".to_string(),
        sources: entries
            .into_iter()
            .map(|(name, source)| (name.to_string(), source))
            .collect(),
    }
}

/// Runs the pipeline once and collects every event it emitted
pub async fn collect_run(
    service: &GraphStatusService,
    config: &SourcesConfig,
) -> (Vec<StatusEvent>, RunOutcome) {
    let (tx, mut rx) = mpsc::channel(64);
    let outcome = service.run(config, &tx).await;
    drop(tx);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (events, outcome)
}
