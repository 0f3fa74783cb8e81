//! Locked overlay state and the single-step insert/remove primitive.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::asset::{AssetDescriptor, SourceId};
use crate::source::ContentSource;
use crate::utils::path::parent;

use super::conflict::{Conflict, Diagnostic};
use super::ledger::Ledger;

/// A registered source with its bookkeeping.
pub(crate) struct SourceEntry {
    pub id: SourceId,
    pub source: Arc<dyn ContentSource>,
    pub ledger: Ledger,
}

pub(crate) struct OverlayState {
    /// Virtual path -> descriptor. The root `""` is always present.
    pub global: FxHashMap<String, Arc<AssetDescriptor>>,
    /// `"sourceName:/path"` -> descriptor.
    pub aliases: FxHashMap<String, Arc<AssetDescriptor>>,
    /// Registration order.
    pub sources: Vec<SourceEntry>,
    pub conflicts: Vec<Conflict>,
    pub loaded: bool,
    pub disposed: bool,
    pub next_id: u32,
}

#[inline]
fn alias_key(source_name: &str, path: &str) -> String {
    format!("{source_name}:/{path}")
}

impl OverlayState {
    pub fn new() -> Self {
        let mut global = FxHashMap::default();
        global.insert(String::new(), Arc::new(AssetDescriptor::directory("")));
        Self {
            global,
            aliases: FxHashMap::default(),
            sources: Vec::new(),
            conflicts: Vec::new(),
            loaded: false,
            disposed: false,
            next_id: 0,
        }
    }

    pub fn source(&self, id: SourceId) -> Option<&SourceEntry> {
        self.sources.iter().find(|entry| entry.id == id)
    }

    pub fn source_mut(&mut self, id: SourceId) -> Option<&mut SourceEntry> {
        self.sources.iter_mut().find(|entry| entry.id == id)
    }

    /// Most recent other descriptor claiming the path of `gone`, searching
    /// the latest registered source first.
    pub fn fallback_for(&self, gone: &Arc<AssetDescriptor>) -> Option<Arc<AssetDescriptor>> {
        self.sources.iter().rev().find_map(|entry| {
            entry
                .ledger
                .owned()
                .iter()
                .rev()
                .find(|d| d.path() == gone.path() && !Arc::ptr_eq(d, gone))
                .cloned()
        })
    }

    /// Empty the overlay down to its root, handing back the sources.
    pub fn clear(&mut self) -> Vec<SourceEntry> {
        self.global.retain(|path, _| path.is_empty());
        if let Some(root) = self.global.get("") {
            for child in root.children() {
                root.remove_child(&child);
            }
        }
        self.aliases.clear();
        self.conflicts.clear();
        std::mem::take(&mut self.sources)
    }

    /// Whether `descriptor` is the current occupant of its path.
    pub fn is_occupant(&self, descriptor: &Arc<AssetDescriptor>) -> bool {
        self.global
            .get(descriptor.path())
            .is_some_and(|current| Arc::ptr_eq(current, descriptor))
    }

    /// Map `path` to `next`, or unmap it when `next` is `None`.
    ///
    /// Keeps the shadow directory tree in step: missing ancestors are
    /// synthesized on insert, directories left empty by a removal are
    /// erased up to the root. Returns whether the mapping was accepted.
    pub fn try_insert(
        &mut self,
        path: &str,
        next: Option<Arc<AssetDescriptor>>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> bool {
        if path.is_empty() {
            // The root is owned by the overlay.
            return false;
        }
        let prev = self.global.get(path).cloned();

        let Some(next) = next else {
            return match prev {
                Some(prev) if !prev.is_directory() => {
                    self.unmap(path, &prev);
                    true
                }
                // Directories only go away through the cascade.
                _ => false,
            };
        };

        let shadowed = || Diagnostic::ShadowedDirectory {
            path: path.to_string(),
            source: next.source().cloned(),
        };
        if prev.as_ref().is_some_and(|p| p.is_directory() && !next.is_directory()) {
            diagnostics.push(shadowed());
            return false;
        }
        let Some(dir) = self.ensure_directory(parent(path).unwrap_or("")) else {
            diagnostics.push(shadowed());
            return false;
        };

        if let Some(prev) = &prev
            && prev.source_id() != next.source_id()
            && !prev.kind().is_non_conflicting()
        {
            let conflict = Conflict {
                path: path.to_string(),
                existing: prev.source().cloned(),
                incoming: next.source().cloned(),
            };
            self.conflicts.push(conflict.clone());
            diagnostics.push(Diagnostic::Conflict(conflict));
        }

        // Aliases of shadowed descriptors stay reachable.
        if let Some(source) = next.source() {
            self.aliases.insert(alias_key(&source.name, path), Arc::clone(&next));
        }
        self.global.insert(path.to_string(), Arc::clone(&next));

        match &prev {
            Some(prev) => dir.replace_child(prev, next),
            None => dir.push_child(next),
        }
        true
    }

    /// Directory node at `path`, creating it and its ancestors as needed.
    /// `None` if some ancestor is occupied by a non-directory.
    fn ensure_directory(&mut self, path: &str) -> Option<Arc<AssetDescriptor>> {
        if let Some(existing) = self.global.get(path) {
            return existing.is_directory().then(|| Arc::clone(existing));
        }

        let parent_dir = self.ensure_directory(parent(path).unwrap_or(""))?;
        let dir = Arc::new(AssetDescriptor::directory(path));
        self.global.insert(path.to_string(), Arc::clone(&dir));
        parent_dir.push_child(Arc::clone(&dir));
        Some(dir)
    }

    /// Drop the `"sourceName:/path"` alias if it still points at `descriptor`.
    pub fn drop_alias(&mut self, descriptor: &Arc<AssetDescriptor>) {
        let Some(source) = descriptor.source() else {
            return;
        };
        let key = alias_key(&source.name, descriptor.path());
        if self.aliases.get(&key).is_some_and(|a| Arc::ptr_eq(a, descriptor)) {
            self.aliases.remove(&key);
        }
    }

    fn unmap(&mut self, path: &str, prev: &Arc<AssetDescriptor>) {
        self.global.remove(path);
        self.drop_alias(prev);

        let Some(parent_path) = parent(path) else {
            return;
        };
        if let Some(dir) = self.global.get(parent_path) {
            dir.remove_child(prev);
        }
        self.prune_empty(parent_path);
    }

    /// Erase empty directories from `path` upward. The root stays.
    fn prune_empty(&mut self, path: &str) {
        let mut current = path.to_string();
        while !current.is_empty() {
            let Some(dir) = self.global.get(&current).cloned() else {
                break;
            };
            if !dir.is_directory() || dir.has_children() {
                break;
            }

            self.global.remove(&current);
            let parent_path = parent(&current).unwrap_or("").to_string();
            if let Some(parent_dir) = self.global.get(&parent_path) {
                parent_dir.remove_child(&dir);
            }
            current = parent_path;
        }
    }
}
