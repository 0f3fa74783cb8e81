//! Per-source bookkeeping of contributed descriptors.
//!
//! Keyed by the source-relative path the source reports (before
//! classification), since that is the only name a source knows an asset by
//! when it later reports a change or removal.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::asset::AssetDescriptor;

#[derive(Debug, Default)]
pub(crate) struct Ledger {
    /// Insertion order.
    owned: Vec<Arc<AssetDescriptor>>,
    by_path: BTreeMap<String, Arc<AssetDescriptor>>,
}

impl Ledger {
    pub fn get(&self, path: &str) -> Option<&Arc<AssetDescriptor>> {
        self.by_path.get(path)
    }

    /// Record `descriptor` under `path`, returning the descriptor it replaces.
    /// A replacement keeps the insertion position of the old one.
    pub fn insert(&mut self, path: String, descriptor: Arc<AssetDescriptor>) -> Option<Arc<AssetDescriptor>> {
        let prev = self.by_path.insert(path, Arc::clone(&descriptor));
        match prev.as_ref().and_then(|p| self.owned.iter().position(|o| Arc::ptr_eq(o, p))) {
            Some(idx) => self.owned[idx] = descriptor,
            None => self.owned.push(descriptor),
        }
        prev
    }

    pub fn remove(&mut self, path: &str) -> Option<Arc<AssetDescriptor>> {
        let removed = self.by_path.remove(path)?;
        self.owned.retain(|o| !Arc::ptr_eq(o, &removed));
        Some(removed)
    }

    /// Remove every entry below the folder `dir`, deepest paths first.
    pub fn remove_under(&mut self, dir: &str) -> Vec<Arc<AssetDescriptor>> {
        let prefix = format!("{dir}/");
        let mut keys: Vec<String> = if dir.is_empty() {
            self.by_path.keys().cloned().collect()
        } else {
            self.by_path
                .range(prefix.clone()..)
                .take_while(|(key, _)| key.starts_with(&prefix))
                .map(|(key, _)| key.clone())
                .collect()
        };
        keys.sort_by_key(|key| std::cmp::Reverse(key.matches('/').count()));
        keys.iter().filter_map(|key| self.remove(key)).collect()
    }

    /// Remove everything, most recently inserted first.
    pub fn drain(&mut self) -> Vec<Arc<AssetDescriptor>> {
        self.by_path.clear();
        let mut owned = std::mem::take(&mut self.owned);
        owned.reverse();
        owned
    }

    /// Descriptors in insertion order.
    pub fn owned(&self) -> &[Arc<AssetDescriptor>] {
        &self.owned
    }

    pub fn len(&self) -> usize {
        self.owned.len()
    }
}
