//! Graph status pipeline.
//!
//! One run walks five strictly sequential stages: local entity counts, meta
//! fan-out, deployment fan-out (manifest and allocations in parallel), chain
//! head fan-out, and assembly. Within a stage every call is issued at once
//! and the stage ends when all of them resolved. Results are joined by
//! source name, deployment id or network, never by completion order.
//!
//! Events go to an mpsc sender. A failed send means the consumer went away;
//! the run then stops before starting its next stage.

use chrono::Utc;
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use super::manifest::parse_contract_nodes;
use super::manifest_cache::ManifestCache;
use super::progress::{compute_progress, ChainHeads};
use crate::clients::StatusSource;
use crate::config::{SourceConfig, SourcesConfig};
use crate::models::{
    ContractNode, EntityCounts, IndexerInfo, Manifest, MetaSnapshot, SourceStats, SourceStatus,
    StatusEvent, StatusReport,
};

pub const NO_SOURCES_MESSAGE: &str = "no sources enabled";

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// The event consumer disconnected before the terminal event
    Disconnected,
}

struct Disconnected;

/// Output of the deployment stage for one source
#[derive(Default)]
struct DeploymentInfo {
    deployment_id: Option<String>,
    nodes: Vec<ContractNode>,
    output_entities: BTreeSet<String>,
    indexer_info: IndexerInfo,
}

pub struct GraphStatusService {
    source: Arc<dyn StatusSource>,
    manifests: ManifestCache,
}

impl GraphStatusService {
    pub fn new(source: Arc<dyn StatusSource>) -> Self {
        Self {
            source,
            manifests: ManifestCache::new(),
        }
    }

    pub fn manifest_cache(&self) -> &ManifestCache {
        &self.manifests
    }

    /// Runs the pipeline once over the enabled sources, pushing events to `events`
    pub async fn run(
        &self,
        config: &SourcesConfig,
        events: &mpsc::Sender<StatusEvent>,
    ) -> RunOutcome {
        let started = Instant::now();
        match self.run_stages(config, events).await {
            Ok(()) => {
                tracing::info!(
                    "Graph status run finished in {} ms",
                    started.elapsed().as_millis()
                );
                RunOutcome::Completed
            }
            Err(Disconnected) => {
                tracing::debug!("Status consumer disconnected, run abandoned");
                RunOutcome::Disconnected
            }
        }
    }

    async fn run_stages(
        &self,
        config: &SourcesConfig,
        events: &mpsc::Sender<StatusEvent>,
    ) -> Result<(), Disconnected> {
        let enabled = config.enabled_sources();
        if enabled.is_empty() {
            emit(events, StatusEvent::status(NO_SOURCES_MESSAGE)).await?;
            let report = StatusReport {
                sources: BTreeMap::new(),
                generated_at: Some(Utc::now().to_rfc3339()),
            };
            emit(events, StatusEvent::Done { data: report }).await?;
            return Ok(());
        }

        tracing::info!("Starting graph status run for {} sources", enabled.len());

        emit(events, StatusEvent::status("Loading local entity counts...")).await?;
        let entity_counts = self.source.fetch_entity_counts().await;

        emit(
            events,
            StatusEvent::status(format!("Querying {} subgraph meta...", enabled.len())),
        )
        .await?;
        let mut metas = self.fetch_metas(&enabled).await;

        emit(
            events,
            StatusEvent::status("Fetching manifests and indexer allocations..."),
        )
        .await?;
        let mut deployments = self.fetch_deployments(&metas).await;

        let networks: BTreeSet<String> = deployments
            .values()
            .flat_map(|info| info.nodes.iter().map(|node| node.network.clone()))
            .filter(|network| !network.is_empty())
            .collect();

        let mut chain_heads = ChainHeads::new();
        if !networks.is_empty() {
            emit(
                events,
                StatusEvent::status(format!(
                    "Querying block heights for {} chains...",
                    networks.len()
                )),
            )
            .await?;
            self.resolve_chain_heads(&networks, &mut chain_heads).await;
        }

        emit(events, StatusEvent::status("Computing statistics...")).await?;
        let mut report = StatusReport {
            sources: BTreeMap::new(),
            generated_at: Some(Utc::now().to_rfc3339()),
        };
        for (name, source_config) in &enabled {
            let meta = metas
                .remove(name)
                .unwrap_or_else(|| MetaSnapshot::error("meta query did not complete"));
            let deployment = deployments.remove(name).unwrap_or_default();
            let status = assemble_source(
                name,
                source_config,
                meta,
                deployment,
                &entity_counts,
                &chain_heads,
            );
            report.sources.insert(name.clone(), status);
        }

        emit(events, StatusEvent::status("Done")).await?;
        emit(events, StatusEvent::Done { data: report }).await
    }

    async fn fetch_metas(
        &self,
        enabled: &BTreeMap<String, SourceConfig>,
    ) -> HashMap<String, MetaSnapshot> {
        let tasks = enabled.iter().map(|(name, source_config)| async move {
            let meta = self.source.fetch_meta(&source_config.subgraph_id).await;
            (name.clone(), meta)
        });
        join_all(tasks).await.into_iter().collect()
    }

    /// Manifest and allocations for every source with a usable deployment id
    async fn fetch_deployments(
        &self,
        metas: &HashMap<String, MetaSnapshot>,
    ) -> HashMap<String, DeploymentInfo> {
        let tasks = metas
            .iter()
            .filter_map(|(name, meta)| meta.deployment_id().map(|id| (name, id)))
            .map(|(name, deployment_id)| async move {
                let (manifest, indexer_info) = tokio::join!(
                    self.manifest(deployment_id),
                    self.source.fetch_indexer_allocations(deployment_id)
                );
                let (nodes, output_entities) = parse_contract_nodes(manifest.as_deref());
                let info = DeploymentInfo {
                    deployment_id: Some(deployment_id.to_string()),
                    nodes,
                    output_entities,
                    indexer_info,
                };
                (name.clone(), info)
            });
        join_all(tasks).await.into_iter().collect()
    }

    async fn manifest(&self, deployment_id: &str) -> Option<Arc<Manifest>> {
        if let Some(manifest) = self.manifests.get(deployment_id) {
            return Some(manifest);
        }

        let manifest = Arc::new(self.source.fetch_manifest(deployment_id).await?);
        self.manifests.insert(deployment_id, manifest.clone());
        Some(manifest)
    }

    /// Resolves each network missing from `chain_heads` exactly once
    async fn resolve_chain_heads(
        &self,
        networks: &BTreeSet<String>,
        chain_heads: &mut ChainHeads,
    ) {
        let tasks = networks
            .iter()
            .filter(|network| !chain_heads.contains_key(*network))
            .map(|network| async move {
                let head = self.source.fetch_chain_head(network).await;
                (network.clone(), head)
            });

        for (network, head) in join_all(tasks).await {
            if let Some(head) = head {
                chain_heads.entry(network).or_insert(head);
            }
        }
    }
}

async fn emit(events: &mpsc::Sender<StatusEvent>, event: StatusEvent) -> Result<(), Disconnected> {
    events.send(event).await.map_err(|_| Disconnected)
}

fn assemble_source(
    name: &str,
    source_config: &SourceConfig,
    meta: MetaSnapshot,
    deployment: DeploymentInfo,
    entity_counts: &EntityCounts,
    chain_heads: &ChainHeads,
) -> SourceStatus {
    let DeploymentInfo {
        deployment_id,
        mut nodes,
        output_entities,
        indexer_info,
    } = deployment;

    let progress = compute_progress(&mut nodes, meta.indexed_block(), chain_heads);

    let configured_entities: Vec<String> = source_config.entities.keys().cloned().collect();
    let entity_stats = configured_entities
        .iter()
        .map(|entity| {
            let key = format!("{}/{}", name, entity);
            let count = entity_counts.get(&key).copied().unwrap_or(0);
            (entity.clone(), count)
        })
        .collect();

    SourceStatus {
        source_name: name.to_string(),
        subgraph_id: source_config.subgraph_id.clone(),
        deployment_id,
        meta,
        contract_nodes: nodes,
        output_entities: output_entities.into_iter().collect(),
        configured_entities,
        entity_stats,
        indexer_info,
        stats: SourceStats { progress },
    }
}
