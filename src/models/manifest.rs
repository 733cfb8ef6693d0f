//! Deployment manifest as published to IPFS.
//!
//! Only the parts needed to describe tracked contracts are modelled. Every
//! field is optional or defaulted so that a manifest missing sub-sections
//! still deserializes into empty lists instead of failing.

use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Manifest {
    /// Statically declared contract instances
    pub data_sources: Vec<DataSourceDecl>,
    /// Contract factories instantiated at runtime
    pub templates: Vec<DataSourceDecl>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DataSourceDecl {
    pub name: Option<String>,
    pub network: Option<String>,
    pub source: ContractSource,
    pub mapping: MappingDecl,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContractSource {
    pub address: Option<String>,
    pub start_block: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MappingDecl {
    pub entities: Vec<String>,
}

impl Manifest {
    /// Parses manifest YAML; `None` when the content is not a manifest.
    /// An empty or `null` document carries no manifest either.
    pub fn from_yaml(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            tracing::debug!("Manifest content is empty");
            return None;
        }

        match serde_yaml::from_str::<Option<Manifest>>(raw) {
            Ok(Some(manifest)) => Some(manifest),
            Ok(None) => {
                tracing::debug!("Manifest content is a null document");
                None
            }
            Err(e) => {
                tracing::debug!("Manifest content is not valid YAML: {}", e);
                None
            }
        }
    }
}
