//! Sync progress of contract nodes.
//!
//! `progress` is `(indexed - start_block) / (head - start_block) * 100`,
//! rounded to two decimals. It is not clamped: an indexed block ahead of a
//! stale head yields a value above 100.

use std::collections::HashMap;

use crate::models::{ContractNode, NodeKind};

/// Latest known block per network, for one run
pub type ChainHeads = HashMap<String, u64>;

/// Fills `indexed`, `head`, `behind` and `progress` on every node and
/// returns the mean progress of the static nodes whose progress is computable.
pub fn compute_progress(
    nodes: &mut [ContractNode],
    indexed_block: u64,
    chain_heads: &ChainHeads,
) -> f64 {
    let mut included = Vec::new();

    for node in nodes.iter_mut() {
        let head = chain_heads.get(&node.network).copied();

        node.indexed = indexed_block;
        node.head = head;
        node.behind = match head {
            Some(head) if head > 0 && indexed_block > 0 => head.saturating_sub(indexed_block),
            _ => 0,
        };

        if node.kind == NodeKind::Dynamic {
            continue;
        }

        match head {
            Some(head) if head > 0 && indexed_block > 0 => {
                let total_range = head as f64 - node.start_block as f64;
                let progress = if total_range > 0.0 {
                    let indexed_range = indexed_block as f64 - node.start_block as f64;
                    round2(indexed_range / total_range * 100.0)
                } else {
                    100.0
                };
                node.progress = Some(progress);
                included.push(progress);
            }
            _ => node.progress = Some(0.0),
        }
    }

    if included.is_empty() {
        return 0.0;
    }
    round2(included.iter().sum::<f64>() / included.len() as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
