// Status pipeline services

pub mod graph_status;
pub mod manifest;
pub mod manifest_cache;
pub mod progress;

pub use graph_status::{GraphStatusService, RunOutcome};
pub use manifest_cache::ManifestCache;
