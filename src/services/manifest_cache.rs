//! Process-wide manifest cache.
//!
//! Keys are deployment content ids, so a cached manifest never goes stale
//! and entries are never invalidated. The map grows with every distinct
//! deployment seen; a long-lived process tracking many redeploying subgraphs
//! should call `clear` periodically or cap the number of entries.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::models::Manifest;

pub struct ManifestCache {
    manifests: RwLock<HashMap<String, Arc<Manifest>>>,
}

impl ManifestCache {
    pub fn new() -> Self {
        Self {
            manifests: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, deployment_id: &str) -> Option<Arc<Manifest>> {
        if let Ok(cache) = self.manifests.read() {
            cache.get(deployment_id).cloned()
        } else {
            None
        }
    }

    /// Concurrent inserts for one id store identical content, so the last write wins harmlessly
    pub fn insert(&self, deployment_id: &str, manifest: Arc<Manifest>) {
        if let Ok(mut cache) = self.manifests.write() {
            cache.insert(deployment_id.to_string(), manifest);
        }
    }

    pub fn len(&self) -> usize {
        self.manifests.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut cache) = self.manifests.write() {
            cache.clear();
        }
    }
}

impl Default for ManifestCache {
    fn default() -> Self {
        Self::new()
    }
}
