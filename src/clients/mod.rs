//! External services consulted during a status run.
//!
//! Every method is infallible from the caller's point of view: failures come
//! back as error markers (`MetaSnapshot::Error`, `IndexerInfo::error`) or as
//! `None`, so one broken upstream never aborts the run.

pub mod error;
pub mod http;
pub mod networks;

pub use error::ClientError;
pub use http::HttpStatusSource;

use async_trait::async_trait;

use crate::models::{EntityCounts, IndexerInfo, Manifest, MetaSnapshot};

#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Current local row counts, keyed `"{source}/{entity}"`
    async fn fetch_entity_counts(&self) -> EntityCounts;

    /// Indexing state of a subgraph
    async fn fetch_meta(&self, subgraph_id: &str) -> MetaSnapshot;

    /// Deployment manifest; `None` when no gateway could provide it
    async fn fetch_manifest(&self, deployment_id: &str) -> Option<Manifest>;

    /// Active indexer allocations for a deployment
    async fn fetch_indexer_allocations(&self, deployment_id: &str) -> IndexerInfo;

    /// Latest block of a network; `None` when unknown or unreachable
    async fn fetch_chain_head(&self, network: &str) -> Option<u64>;
}
