//! Static table of supported networks.
//!
//! Chain heads can only be resolved for networks listed here; any other
//! network key is reported with an unknown head.

use std::collections::HashMap;

const NETWORKS: &[(&str, &str, &str)] = &[
    ("matic", "https://polygon-rpc.com", "Polygon"),
    ("polygon", "https://polygon-rpc.com", "Polygon"),
    ("mainnet", "https://eth.llamarpc.com", "Ethereum"),
    ("arbitrum-one", "https://arb1.arbitrum.io/rpc", "Arbitrum"),
    ("optimism", "https://mainnet.optimism.io", "Optimism"),
    ("base", "https://mainnet.base.org", "Base"),
];

/// Human readable network name, falling back to the key itself
pub fn display_name(network: &str) -> String {
    NETWORKS
        .iter()
        .find(|(key, _, _)| *key == network)
        .map(|(_, _, name)| name.to_string())
        .unwrap_or_else(|| network.to_string())
}

/// The full network -> RPC endpoint table
pub fn default_rpc_endpoints() -> HashMap<String, String> {
    NETWORKS
        .iter()
        .map(|(key, url, _)| (key.to_string(), url.to_string()))
        .collect()
}
