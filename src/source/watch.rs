//! File system events to overlay updates.
//!
//! Raw `notify` events are translated into per-path changes, coalesced while
//! a path is still pending, and handed to the overlay once the path has been
//! quiet for the debounce period.
//!
//! ```text
//! notify thread ──► WatchLoop thread ──► DelayQueue (key per path) ──► SourceContext::update
//! ```

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use crossbeam::channel::Receiver;
use notify::EventKind;
use notify::event::{ModifyKind, RenameMode};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::asset::{AssetDraft, Locator};
use crate::error::Result;
use crate::sched::DelayQueue;
use crate::utils::path::relative_virtual;
use crate::utils::retry::wait_until_readable;
use crate::{debug, log};

use super::SourceContext;
use super::directory::{DirShared, WatchOptions};
use super::ignore_rules::IGNORE_FILE;

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub(super) fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// A pending change to one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Change {
    Path(ChangeKind),
    /// The path was moved here from `from`.
    Renamed { from: String },
}

/// Fold `incoming` into the change already pending for the same path.
/// `None` means the two cancel out.
///
/// - Removed then Created/Modified: restored, use the new event
/// - Modified then Removed: deleted
/// - Created then Removed: appeared and vanished, nothing to do
/// - a rename replaces whatever was pending
/// - otherwise the first event wins
pub(super) fn coalesce(existing: &Change, incoming: Change) -> Option<Change> {
    use ChangeKind::*;

    match (existing, incoming) {
        (_, renamed @ Change::Renamed { .. }) => Some(renamed),
        (Change::Path(Removed), restored @ Change::Path(Created | Modified)) => Some(restored),
        (Change::Path(Modified), Change::Path(Removed)) => Some(Change::Path(Removed)),
        (Change::Path(Created), Change::Path(Removed)) => None,
        (existing, _) => Some(existing.clone()),
    }
}

/// Editor artifacts that never become assets.
fn is_temp_file(name: &str) -> bool {
    let ext = name.rsplit_once('.').map_or("", |(_, ext)| ext);
    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp") || name.ends_with('~')
}

/// Per-source event loop, fed by the `notify` callback.
pub(super) struct WatchLoop {
    pub name: String,
    pub shared: Arc<DirShared>,
    pub ctx: SourceContext,
    pub options: WatchOptions,
    pub queue: Arc<DelayQueue>,
    pub key_prefix: String,
    pub pending: Mutex<FxHashMap<String, Change>>,
}

impl WatchLoop {
    /// Run on a new thread until the watcher (the sending side) is dropped.
    pub fn spawn(self, rx: Receiver<notify::Result<notify::Event>>) -> io::Result<()> {
        let watch = Arc::new(self);
        thread::Builder::new()
            .name(format!("overlay-watch-{}", watch.name))
            .spawn(move || {
                while let Ok(result) = rx.recv() {
                    match result {
                        Ok(event) => watch.on_event(&event),
                        Err(e) => log!("watch"; "notify error: {}", e),
                    }
                }
                debug!("watch"; "stopped watching {}", watch.name);
            })?;
        Ok(())
    }

    fn on_event(self: &Arc<Self>, event: &notify::Event) {
        if self.shared.is_disposed() {
            return;
        }
        debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);
        for (rel, change) in self.translate(event) {
            self.record(rel, change);
        }
    }

    /// Source-relative path of `path`, or `None` if it is outside the root,
    /// hidden, or an editor artifact.
    pub(super) fn relative(&self, path: &Path) -> Option<String> {
        let rel = relative_virtual(&self.shared.root, path).filter(|rel| !rel.is_empty())?;
        if rel == IGNORE_FILE {
            return Some(rel);
        }
        let hidden = rel.split('/').any(|segment| segment.starts_with('.'));
        let name = rel.rsplit('/').next().unwrap_or(&rel);
        (!hidden && !is_temp_file(name)).then_some(rel)
    }

    pub(super) fn translate(&self, event: &notify::Event) -> Vec<(String, Change)> {
        let each = |kind: ChangeKind| -> Vec<(String, Change)> {
            event
                .paths
                .iter()
                .filter_map(|path| self.relative(path))
                .map(|rel| (rel, Change::Path(kind)))
                .collect()
        };

        match event.kind {
            EventKind::Create(_) => each(ChangeKind::Created),
            EventKind::Remove(_) => each(ChangeKind::Removed),
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
                [from, to] => match (self.relative(from), self.relative(to)) {
                    (Some(from), Some(to)) => vec![(to, Change::Renamed { from })],
                    // Moved out of the root, or out of a hidden name
                    (Some(from), None) => vec![(from, Change::Path(ChangeKind::Removed))],
                    (None, Some(to)) => vec![(to, Change::Path(ChangeKind::Created))],
                    (None, None) => Vec::new(),
                },
                _ => Vec::new(),
            },
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => each(ChangeKind::Removed),
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => each(ChangeKind::Created),
            EventKind::Modify(ModifyKind::Name(_)) => event
                .paths
                .iter()
                .filter_map(|path| {
                    let kind = if path.exists() { ChangeKind::Created } else { ChangeKind::Removed };
                    self.relative(path).map(|rel| (rel, Change::Path(kind)))
                })
                .collect(),
            // mtime/atime/chmod noise
            EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
            EventKind::Modify(_) => event
                .paths
                .iter()
                .filter(|path| !path.is_dir())
                .filter_map(|path| self.relative(path))
                .map(|rel| (rel, Change::Path(ChangeKind::Modified)))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn key(&self, rel: &str) -> String {
        format!("{}{rel}", self.key_prefix)
    }

    /// Coalesce `change` into the pending state of `rel` and (re)start its
    /// debounce timer.
    fn record(self: &Arc<Self>, rel: String, change: Change) {
        let merged = {
            let mut pending = self.pending.lock();
            let merged = match pending.remove(&rel) {
                Some(existing) => coalesce(&existing, change),
                None => Some(change),
            };
            if let Some(Change::Renamed { from }) = &merged
                && pending.remove(from).is_some()
            {
                self.queue.cancel(self.key(from));
            }
            if let Some(change) = &merged {
                pending.insert(rel.clone(), change.clone());
            }
            merged
        };

        let key = self.key(&rel);
        if merged.is_none() {
            debug!("watch"; "discard created+removed: {}", rel);
            self.queue.cancel(key);
            return;
        }
        let watch = Arc::clone(self);
        self.queue.schedule(key, self.options.debounce, move || watch.fire(&rel));
    }

    fn fire(&self, rel: &str) {
        let Some(change) = self.pending.lock().remove(rel) else {
            return;
        };
        if self.shared.is_disposed() {
            return;
        }
        match self.apply(rel, change) {
            Ok(()) => {}
            Err(err) if err.is_disposed() => debug!("watch"; "dropped change to {}: {}", rel, err),
            Err(err) => log!("watch"; "failed to reload {}:/{}: {}", self.name, rel, err),
        }
    }

    fn apply(&self, rel: &str, change: Change) -> Result<()> {
        if rel == IGNORE_FILE {
            self.shared.load_ignore()?;
            log!("watch"; "reloaded {} of {}", IGNORE_FILE, self.name);
            return Ok(());
        }

        let path = self.shared.root.join(rel);
        match change {
            Change::Path(ChangeKind::Removed) => {
                debug!("watch"; "removed {}", rel);
                self.ctx.update(Some(rel), None)
            }
            Change::Path(kind) => self.reload(None, rel, &path, kind),
            Change::Renamed { from } => {
                debug!("watch"; "renamed {} -> {}", from, rel);
                self.reload(Some(&from), rel, &path, ChangeKind::Created)
            }
        }
    }

    /// Push the current state of `path` to the overlay. For a rename, `from`
    /// is retracted in the same step.
    fn reload(&self, from: Option<&str>, rel: &str, path: &Path, kind: ChangeKind) -> Result<()> {
        if path.is_dir() {
            if let Some(from) = from {
                self.ctx.update(Some(from), None)?;
            }
            if kind == ChangeKind::Created {
                debug!("watch"; "crawling new folder {}", rel);
                return self.ctx.add_all(self.shared.crawl_under(path));
            }
            return Ok(());
        }

        wait_until_readable(path, self.options.read_retry)?;
        if !path.exists() {
            // Gone again before it settled
            if let Some(from) = from {
                self.ctx.update(Some(from), None)?;
            }
            return self.ctx.update(Some(rel), None);
        }

        debug!("watch"; "{} {}", kind.label(), rel);
        let draft = AssetDraft::new(Locator::File(path.to_path_buf()));
        self.ctx.update(Some(from.unwrap_or(rel)), Some((rel, draft)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(kind: ChangeKind) -> Change {
        Change::Path(kind)
    }

    #[test]
    fn test_coalesce_transitions() {
        use ChangeKind::*;

        assert_eq!(coalesce(&path(Removed), path(Created)), Some(path(Created)));
        assert_eq!(coalesce(&path(Modified), path(Removed)), Some(path(Removed)));
        assert_eq!(coalesce(&path(Created), path(Removed)), None);
        assert_eq!(coalesce(&path(Created), path(Modified)), Some(path(Created)));
        assert_eq!(coalesce(&path(Modified), path(Modified)), Some(path(Modified)));
    }

    #[test]
    fn test_coalesce_rename_wins() {
        let renamed = Change::Renamed { from: "a.png".into() };
        assert_eq!(coalesce(&path(ChangeKind::Modified), renamed.clone()), Some(renamed.clone()));
        // The moved file vanishing later is picked up when the rename is applied.
        assert_eq!(coalesce(&renamed, path(ChangeKind::Removed)), Some(renamed));
    }

    #[test]
    fn test_temp_files() {
        assert!(is_temp_file("a.png~"));
        assert!(is_temp_file("a.png.swp"));
        assert!(is_temp_file("a.tmp"));
        assert!(!is_temp_file("a.png"));
        assert!(!is_temp_file("Makefile"));
    }
}
