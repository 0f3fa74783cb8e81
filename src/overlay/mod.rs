//! The merged asset namespace.
//!
//! [`OverlayRegistry`] owns one path -> descriptor map built from every
//! registered [`ContentSource`]. Later sources override earlier ones path by
//! path; overrides of types that do not merge are reported as conflicts.
//!
//! # Invariants
//!
//! - Every mapped path has a directory node for each proper prefix, down to
//!   the root `""`. Directory nodes are synthesized here, never by sources.
//! - Removing the last child of a directory removes the directory too, up
//!   to (not including) the root.
//! - A path maps to the most recent descriptor of the last source still
//!   claiming it. When the occupant goes away, an earlier claimant takes
//!   the path back.
//!
//! # Locking
//!
//! One `RwLock` guards the state. A write lock is held for one insert or
//! removal at a time, never across a crawl. Observers, diagnostics and live
//! object callbacks always run after the lock is released.

mod conflict;
mod ledger;
mod state;

pub use conflict::{Conflict, Diagnostic, group_by_path, log_diagnostic, print_conflicts};

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use rayon::prelude::*;

use crate::asset::{AssetDescriptor, AssetDraft, AssetType, SourceId, SourceRef};
use crate::classify::{TypeClassifier, is_denied};
use crate::error::{OverlayError, Result};
use crate::hooks::{HookId, ObserverList};
use crate::reload::{LiveAsset, ReloadBroker};
use crate::source::{ContentSource, IgnoreRules};
use crate::utils::path::{normalize_separators, resolve_dots};
use crate::{debug, log};

use state::{OverlayState, SourceEntry};

/// Observer of registry mutations: `(prev, next)`.
pub type UpdateHook = dyn Fn(Option<&Arc<AssetDescriptor>>, Option<&Arc<AssetDescriptor>>) + Send + Sync;
/// Observer of conflicts and classification warnings.
pub type DiagnosticHook = dyn Fn(&Diagnostic) + Send + Sync;
/// Observer of check-outs: the requested path and what is mapped there, if
/// anything. Runs for every load, including paths nothing provides yet.
pub type LoadHook = dyn Fn(&str, Option<&Arc<AssetDescriptor>>) + Send + Sync;

pub(crate) struct Inner {
    state: RwLock<OverlayState>,
    classifier: TypeClassifier,
    broker: ReloadBroker,
    on_update: ObserverList<UpdateHook>,
    on_diagnostic: ObserverList<DiagnosticHook>,
    on_load: ObserverList<LoadHook>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        for entry in self.state.get_mut().sources.drain(..) {
            entry.source.dispose();
        }
    }
}

/// Shared handle to an overlay. Cloning is cheap and yields the same overlay.
#[derive(Clone)]
pub struct OverlayRegistry {
    inner: Arc<Inner>,
}

impl Default for OverlayRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayRegistry {
    /// Create an empty overlay that logs diagnostics.
    pub fn new() -> Self {
        let registry = Self::silent();
        registry.on_diagnostic(Arc::new(log_diagnostic));
        registry
    }

    /// Create an empty overlay with no diagnostic observers.
    pub fn silent() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(OverlayState::new()),
                classifier: TypeClassifier::new(),
                broker: ReloadBroker::new(),
                on_update: ObserverList::new(),
                on_diagnostic: ObserverList::new(),
                on_load: ObserverList::new(),
            }),
        }
    }

    pub fn classifier(&self) -> &TypeClassifier {
        &self.inner.classifier
    }

    pub fn broker(&self) -> &ReloadBroker {
        &self.inner.broker
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Run `hook` after every registry mutation, in registration order.
    pub fn on_update(&self, hook: Arc<UpdateHook>) -> HookId {
        self.inner.on_update.add(hook)
    }

    pub fn off_update(&self, id: HookId) -> bool {
        self.inner.on_update.remove(id)
    }

    pub fn on_diagnostic(&self, hook: Arc<DiagnosticHook>) -> HookId {
        self.inner.on_diagnostic.add(hook)
    }

    pub fn off_diagnostic(&self, id: HookId) -> bool {
        self.inner.on_diagnostic.remove(id)
    }

    pub fn on_load(&self, hook: Arc<LoadHook>) -> HookId {
        self.inner.on_load.add(hook)
    }

    pub fn off_load(&self, id: HookId) -> bool {
        self.inner.on_load.remove(id)
    }

    fn emit(&self, diagnostics: Vec<Diagnostic>) {
        if diagnostics.is_empty() {
            return;
        }
        let hooks = self.inner.on_diagnostic.snapshot();
        for diagnostic in &diagnostics {
            for hook in &hooks {
                hook(diagnostic);
            }
        }
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Descriptor at `path`, or at a `"sourceName:/path"` alias.
    pub fn get(&self, path: &str) -> Option<Arc<AssetDescriptor>> {
        let state = self.inner.state.read();
        if let Some((source, rest)) = path.split_once(":/") {
            let key = format!("{source}:/{}", normalize_separators(rest));
            return state.aliases.get(&key).cloned();
        }
        state.global.get(&normalize_separators(path)).cloned()
    }

    /// Descriptor at `path` (with `.` and `..` resolved) if it has type `kind`.
    pub fn get_typed(&self, path: &str, kind: &AssetType) -> Option<Arc<AssetDescriptor>> {
        let path = resolve_dots(path);
        self.inner
            .state
            .read()
            .global
            .get(&path)
            .filter(|descriptor| descriptor.kind() == kind)
            .cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Children of the directory at `path`, empty for anything else.
    pub fn children(&self, path: &str) -> Vec<Arc<AssetDescriptor>> {
        self.get(path).map(|d| d.children()).unwrap_or_default()
    }

    /// Number of mapped paths, synthesized directories included, root excluded.
    pub fn len(&self) -> usize {
        self.inner.state.read().global.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every mapped descriptor except the root, sorted by path.
    pub fn snapshot(&self) -> Vec<Arc<AssetDescriptor>> {
        let mut all: Vec<_> = self
            .inner
            .state
            .read()
            .global
            .iter()
            .filter(|(path, _)| !path.is_empty())
            .map(|(_, d)| Arc::clone(d))
            .collect();
        all.sort_by(|a, b| a.path().cmp(b.path()));
        all
    }

    /// Every conflict reported so far, in order.
    pub fn conflicts(&self) -> Vec<Conflict> {
        self.inner.state.read().conflicts.clone()
    }

    /// Registered sources, in registration order.
    pub fn sources(&self) -> Vec<SourceRef> {
        self.inner
            .state
            .read()
            .sources
            .iter()
            .map(|entry| SourceRef {
                id: entry.id,
                name: entry.source.name().into(),
            })
            .collect()
    }

    /// Descriptors a source currently contributes, in insertion order.
    pub fn source_assets(&self, id: SourceId) -> Result<Vec<Arc<AssetDescriptor>>> {
        let state = self.inner.state.read();
        let entry = state.source(id).ok_or(OverlayError::UnknownSource(id.0))?;
        Ok(entry.ledger.owned().to_vec())
    }

    /// Raw bytes of an asset, read through its source.
    pub fn read(&self, descriptor: &AssetDescriptor) -> Result<Vec<u8>> {
        let Some(id) = descriptor.source_id() else {
            return Err(OverlayError::NotReadable(descriptor.path().to_string()));
        };
        let source = self
            .inner
            .state
            .read()
            .source(id)
            .map(|entry| Arc::clone(&entry.source))
            .ok_or(OverlayError::UnknownSource(id.0))?;
        source.read(descriptor.locator())
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Map `path` to `next`, or unmap it when `next` is `None`.
    ///
    /// Low-level: no live objects are notified and no observers run.
    /// Returns whether the mapping was accepted.
    pub fn try_insert(&self, path: &str, next: Option<Arc<AssetDescriptor>>) -> bool {
        let path = normalize_separators(path);
        if next.as_ref().is_some_and(|d| d.is_directory() || d.path() != path) {
            return false;
        }

        let mut diagnostics = Vec::new();
        let accepted = self.inner.state.write().try_insert(&path, next, &mut diagnostics);
        self.emit(diagnostics);
        accepted
    }

    /// Replace `prev` by `next`.
    ///
    /// Covers replace (same path), insert (`prev` is `None`), remove (`next`
    /// is `None`) and rename (different paths). `prev` is only unmapped if
    /// it is still the occupant of its path. Afterwards live objects at or
    /// above `next` re-ingest it and update observers run in order.
    pub fn update(&self, prev: Option<Arc<AssetDescriptor>>, next: Option<Arc<AssetDescriptor>>) -> bool {
        let mut diagnostics = Vec::new();
        let mut removed = false;
        let mut fallback = None;

        if let Some(prev) = &prev
            && next.as_ref().is_none_or(|n| n.path() != prev.path())
        {
            let mut state = self.inner.state.write();
            if state.is_occupant(prev) && state.try_insert(prev.path(), None, &mut diagnostics) {
                removed = true;
                // An earlier claimant takes the path back.
                if let Some(found) = state.fallback_for(prev)
                    && state.try_insert(found.path(), Some(Arc::clone(&found)), &mut diagnostics)
                {
                    fallback = Some(found);
                }
            }
            state.drop_alias(prev);
        }

        let inserted = match &next {
            Some(next) => {
                self.inner
                    .state
                    .write()
                    .try_insert(next.path(), Some(Arc::clone(next)), &mut diagnostics)
            }
            None => false,
        };
        self.emit(diagnostics);

        if !removed && !inserted {
            return false;
        }

        let next = next.filter(|_| inserted);
        if let Some(next) = &next {
            self.inner.broker.notify(next);
        }
        let hooks = self.inner.on_update.snapshot();
        for hook in &hooks {
            hook(prev.as_ref(), next.as_ref());
        }
        if let Some(found) = &fallback {
            self.inner.broker.notify(found);
            for hook in &hooks {
                hook(None, Some(found));
            }
        }
        true
    }

    /// Turn a source draft into a descriptor, or `None` if it is filtered
    /// out (denylisted, ignored, a directory or the root itself).
    fn materialize(
        &self,
        source: &SourceRef,
        ignore: Option<&IgnoreRules>,
        path: &str,
        draft: AssetDraft,
    ) -> Option<Arc<AssetDescriptor>> {
        if path.is_empty() || is_denied(path) {
            return None;
        }
        if ignore.is_some_and(|rules| rules.is_ignored(path, false)) {
            debug!("content"; "ignored {}:/{}", source.name, path);
            return None;
        }

        let (path, kind, format) = match draft.kind {
            Some((kind, format)) => (path.to_string(), kind, format),
            None => {
                let mut diagnostics = Vec::new();
                let found = self
                    .inner
                    .classifier
                    .classify(path, &mut |d| diagnostics.push(d));
                self.emit(diagnostics);
                let found = found?;
                (found.path, found.kind, found.format)
            }
        };

        if path.is_empty() || kind.is_directory() {
            return None;
        }
        Some(Arc::new(AssetDescriptor::new(
            path,
            kind,
            format,
            Some(source.clone()),
            draft.locator,
        )))
    }

    // ------------------------------------------------------------------
    // Sources
    // ------------------------------------------------------------------

    /// Crawl `source` and merge its assets.
    ///
    /// Before [`finish_initial_load`](Self::finish_initial_load) assets are
    /// inserted quietly. Afterwards each one goes through
    /// [`update`](Self::update), so live objects and observers see them.
    pub fn register_source(&self, source: Arc<dyn ContentSource>) -> Result<SourceId> {
        let crawled = source.crawl();
        self.merge(source, crawled)
    }

    /// Crawl several sources in parallel, then merge them in the given order.
    ///
    /// One result per source: a failing source does not stop the others.
    pub fn register_sources(&self, sources: Vec<Arc<dyn ContentSource>>) -> Vec<Result<SourceId>> {
        let crawled: Vec<_> = sources.par_iter().map(|source| source.crawl()).collect();
        sources
            .into_iter()
            .zip(crawled)
            .map(|(source, crawled)| self.merge(source, crawled))
            .collect()
    }

    fn merge(
        &self,
        source: Arc<dyn ContentSource>,
        crawled: Result<Vec<(String, AssetDraft)>>,
    ) -> Result<SourceId> {
        let drafts = crawled.inspect_err(|err| {
            log!("error"; "failed to crawl {}: {}", source.name(), err);
        })?;

        let (id, loaded) = {
            let mut state = self.inner.state.write();
            if state.disposed {
                return Err(OverlayError::Disposed("overlay".to_string()));
            }
            let id = SourceId(state.next_id);
            state.next_id += 1;
            state.sources.push(SourceEntry {
                id,
                source: Arc::clone(&source),
                ledger: Default::default(),
            });
            (id, state.loaded)
        };
        let source_ref = SourceRef {
            id,
            name: source.name().into(),
        };
        let ignore = source.ignore_rules();

        let total = drafts.len();
        let mut accepted = 0;
        for (raw, draft) in drafts {
            let raw = resolve_dots(&raw);
            let Some(descriptor) = self.materialize(&source_ref, ignore.as_deref(), &raw, draft) else {
                continue;
            };
            let prev = {
                let mut state = self.inner.state.write();
                let Some(entry) = state.source_mut(id) else {
                    // Unregistered while merging
                    return Err(OverlayError::UnknownSource(id.0));
                };
                let owned = entry.ledger.insert(raw, Arc::clone(&descriptor));
                // A late source replaces whatever another source mapped there.
                owned.or_else(|| {
                    loaded
                        .then(|| state.global.get(descriptor.path()))
                        .flatten()
                        .filter(|occupant| !occupant.is_directory())
                        .cloned()
                })
            };

            if loaded {
                self.update(prev, Some(descriptor));
            } else {
                let mut diagnostics = Vec::new();
                self.inner
                    .state
                    .write()
                    .try_insert(descriptor.path(), Some(Arc::clone(&descriptor)), &mut diagnostics);
                self.emit(diagnostics);
            }
            accepted += 1;
        }
        debug!("content"; "mounted {} ({}/{} entries)", source_ref.name, accepted, total);

        let context = SourceContext {
            id,
            registry: Arc::downgrade(&self.inner),
        };
        if let Err(err) = source.attach(context) {
            let _ = self.unregister_source(id);
            return Err(err);
        }
        Ok(id)
    }

    /// Mark the initial load as complete. Sources registered from now on
    /// notify live objects for every asset they add.
    pub fn finish_initial_load(&self) {
        self.inner.state.write().loaded = true;
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.state.read().loaded
    }

    /// Dispose a source and retract everything it contributed.
    pub fn unregister_source(&self, id: SourceId) -> Result<()> {
        let entry = {
            let mut state = self.inner.state.write();
            let idx = state
                .sources
                .iter()
                .position(|entry| entry.id == id)
                .ok_or(OverlayError::UnknownSource(id.0))?;
            state.sources.remove(idx)
        };

        entry.source.dispose();
        let mut ledger = entry.ledger;
        for prev in ledger.drain() {
            self.update(Some(prev), None);
        }
        debug!("content"; "unmounted {}", entry.source.name());
        Ok(())
    }

    /// Apply a change reported by a source.
    ///
    /// `old` and `new` are source-relative paths. Same path on both sides is
    /// a content change; differing paths are a rename; `None` on one side is
    /// an addition or removal. Removing a path the source has no asset at
    /// removes everything the source has below it.
    pub fn apply_source_update(
        &self,
        id: SourceId,
        old: Option<&str>,
        new: Option<(&str, AssetDraft)>,
    ) -> Result<()> {
        let old = old.map(resolve_dots);
        let new = new.map(|(path, draft)| (resolve_dots(path), draft));

        if let Some(old) = &old
            && new.as_ref().is_none_or(|(path, _)| path != old)
        {
            self.retract(id, old)?;
        }
        if let Some((path, draft)) = new {
            self.refresh(id, path, draft)?;
        }
        Ok(())
    }

    fn refresh(&self, id: SourceId, path: String, draft: AssetDraft) -> Result<()> {
        let (source_ref, source, prev) = {
            let state = self.inner.state.read();
            let entry = state.source(id).ok_or(OverlayError::UnknownSource(id.0))?;
            let source_ref = SourceRef {
                id,
                name: entry.source.name().into(),
            };
            (source_ref, Arc::clone(&entry.source), entry.ledger.get(&path).cloned())
        };

        let next = match &prev {
            // Content change: identity fields stay, locator is refreshed.
            Some(prev) => Arc::new(prev.reissue(draft.locator)),
            None => {
                let ignore = source.ignore_rules();
                match self.materialize(&source_ref, ignore.as_deref(), &path, draft) {
                    Some(descriptor) => descriptor,
                    None => return Ok(()),
                }
            }
        };

        {
            let mut state = self.inner.state.write();
            let entry = state.source_mut(id).ok_or(OverlayError::UnknownSource(id.0))?;
            entry.ledger.insert(path, Arc::clone(&next));
        }
        self.update(prev, Some(next));
        Ok(())
    }

    fn retract(&self, id: SourceId, path: &str) -> Result<()> {
        let removed = {
            let mut state = self.inner.state.write();
            let entry = state.source_mut(id).ok_or(OverlayError::UnknownSource(id.0))?;
            match entry.ledger.remove(path) {
                Some(descriptor) => vec![descriptor],
                None => entry.ledger.remove_under(path),
            }
        };
        for prev in removed {
            self.update(Some(prev), None);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Live objects
    // ------------------------------------------------------------------

    /// Register a live object without loading anything.
    pub fn register_live(&self, path: &str, object: Weak<dyn LiveAsset>) {
        self.inner.broker.register(path, object);
    }

    /// Load-time hook: register `object` under `path`, run load observers
    /// and hand it the current descriptor right away.
    pub fn check_out(&self, path: &str, object: Weak<dyn LiveAsset>) -> Option<Arc<AssetDescriptor>> {
        let path = resolve_dots(path);
        self.inner.broker.register(&path, object.clone());

        let descriptor = self.get(&path);
        for hook in self.inner.on_load.snapshot() {
            hook(&path, descriptor.as_ref());
        }
        let descriptor = descriptor?;
        if let Some(object) = object.upgrade() {
            object.reingest(&descriptor);
        }
        Some(descriptor)
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Dispose every source and empty the overlay. Safe to call twice.
    pub fn dispose(&self) {
        let entries = {
            let mut state = self.inner.state.write();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.clear()
        };

        for entry in entries {
            entry.source.dispose();
        }
        self.inner.broker.clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state.read().disposed
    }
}

/// Handle given to a source on [`ContentSource::attach`] to push changes.
///
/// Holds the overlay weakly: once the overlay is gone every call fails with
/// [`OverlayError::Disposed`].
#[derive(Clone)]
pub struct SourceContext {
    id: SourceId,
    registry: Weak<Inner>,
}

impl SourceContext {
    pub fn id(&self) -> SourceId {
        self.id
    }

    fn registry(&self) -> Result<OverlayRegistry> {
        self.registry
            .upgrade()
            .map(|inner| OverlayRegistry { inner })
            .ok_or_else(|| OverlayError::Disposed("overlay".to_string()))
    }

    /// Report a change. See [`OverlayRegistry::apply_source_update`].
    pub fn update(&self, old: Option<&str>, new: Option<(&str, AssetDraft)>) -> Result<()> {
        self.registry()?.apply_source_update(self.id, old, new)
    }

    /// Add a batch of new assets, e.g. the content of a folder that just
    /// appeared.
    pub fn add_all(&self, drafts: Vec<(String, AssetDraft)>) -> Result<()> {
        let registry = self.registry()?;
        for (path, draft) in drafts {
            registry.apply_source_update(self.id, None, Some((&path, draft)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
