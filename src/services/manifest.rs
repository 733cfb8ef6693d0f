// Turns a deployment manifest into contract nodes

use std::collections::BTreeSet;

use crate::clients::networks;
use crate::models::{ContractNode, DataSourceDecl, Manifest, NodeKind};

/// Contract nodes declared by a manifest and the sorted union of the entities they write.
///
/// A missing manifest yields no nodes and no entities.
pub fn parse_contract_nodes(
    manifest: Option<&Manifest>,
) -> (Vec<ContractNode>, BTreeSet<String>) {
    let Some(manifest) = manifest else {
        return (Vec::new(), BTreeSet::new());
    };

    let mut entities = BTreeSet::new();
    let mut nodes = Vec::with_capacity(manifest.data_sources.len() + manifest.templates.len());

    for data_source in &manifest.data_sources {
        entities.extend(data_source.mapping.entities.iter().cloned());
        nodes.push(build_node(data_source, NodeKind::Static));
    }

    for template in &manifest.templates {
        entities.extend(template.mapping.entities.iter().cloned());
        nodes.push(build_node(template, NodeKind::Dynamic));
    }

    (nodes, entities)
}

fn build_node(decl: &DataSourceDecl, kind: NodeKind) -> ContractNode {
    let network = decl.network.clone().unwrap_or_else(|| "unknown".to_string());

    // Templates have no deployed address or start block
    let (address, start_block) = match kind {
        NodeKind::Static => (
            decl.source.address.clone().unwrap_or_default(),
            decl.source.start_block.unwrap_or(0),
        ),
        NodeKind::Dynamic => (String::new(), 0),
    };

    ContractNode {
        name: decl.name.clone().unwrap_or_else(|| "unknown".to_string()),
        kind,
        network_display: networks::display_name(&network),
        network,
        address,
        start_block,
        entities: decl.mapping.entities.clone(),
        indexed: 0,
        head: None,
        behind: 0,
        progress: None,
    }
}
