// Status records produced by one pipeline run and the events carrying them

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Local row counts keyed as `"{source}/{entity}"`
pub type EntityCounts = HashMap<String, u64>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaBlock {
    pub number: u64,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

/// `_meta` of a subgraph at the time of the query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubgraphMeta {
    pub block: MetaBlock,
    #[serde(default)]
    pub deployment: Option<String>,
    #[serde(default)]
    pub has_indexing_errors: bool,
}

/// Outcome of a meta query, serialized either as the meta itself or as `{ "error": ... }`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetaSnapshot {
    Meta(SubgraphMeta),
    Error { error: String },
}

impl MetaSnapshot {
    pub fn error(message: impl Into<String>) -> Self {
        MetaSnapshot::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, MetaSnapshot::Error { .. })
    }

    /// Highest indexed block, 0 when the query failed
    pub fn indexed_block(&self) -> u64 {
        match self {
            MetaSnapshot::Meta(meta) => meta.block.number,
            MetaSnapshot::Error { .. } => 0,
        }
    }

    /// Deployment content id, if the query succeeded and returned one
    pub fn deployment_id(&self) -> Option<&str> {
        match self {
            MetaSnapshot::Meta(meta) => meta.deployment.as_deref().filter(|d| !d.is_empty()),
            MetaSnapshot::Error { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Static,
    Dynamic,
}

/// One declared contract or template of a deployment manifest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractNode {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub network: String,
    pub network_display: String,
    pub address: String,
    pub start_block: u64,
    pub entities: Vec<String>,
    pub indexed: u64,
    pub head: Option<u64>,
    pub behind: u64,
    /// Only set on static nodes, once progress has been computed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexerSummary {
    pub id: String,
    pub name: String,
    pub allocated: String,
}

/// Indexers allocated to a deployment
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexerInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub indexer_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_stake: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,
    pub indexers: Vec<IndexerSummary>,
}

impl IndexerInfo {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceStats {
    pub progress: f64,
}

/// Everything known about one configured source after a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceStatus {
    pub source_name: String,
    pub subgraph_id: String,
    pub deployment_id: Option<String>,
    pub meta: MetaSnapshot,
    pub contract_nodes: Vec<ContractNode>,
    pub output_entities: Vec<String>,
    pub configured_entities: Vec<String>,
    pub entity_stats: IndexMap<String, u64>,
    pub indexer_info: IndexerInfo,
    pub stats: SourceStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusReport {
    pub sources: BTreeMap<String, SourceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
}

/// Event pushed to the consumer while a run progresses
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StatusEvent {
    Status { message: String },
    Done { data: StatusReport },
}

impl StatusEvent {
    pub fn status(message: impl Into<String>) -> Self {
        StatusEvent::Status {
            message: message.into(),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, StatusEvent::Done { .. })
    }
}
