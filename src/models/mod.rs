// Data types shared by the clients, the calculators and the orchestrator

pub mod manifest;
pub mod status;

pub use manifest::{ContractSource, DataSourceDecl, Manifest, MappingDecl};
pub use status::{
    ContractNode, EntityCounts, IndexerInfo, IndexerSummary, MetaBlock, MetaSnapshot, NodeKind,
    SourceStats, SourceStatus, StatusEvent, StatusReport, SubgraphMeta,
};
