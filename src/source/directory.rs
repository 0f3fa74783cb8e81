//! Plain folder on disk, watched for changes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use crossbeam::channel;
use ignore::WalkBuilder;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;

use crate::asset::{AssetDraft, Locator};
use crate::debug;
use crate::error::{OverlayError, Result};
use crate::sched::DelayQueue;
use crate::utils::path::{normalize_fs_path, relative_virtual};
use crate::utils::retry::wait_until_readable;

use super::ignore_rules::{IGNORE_FILE, IgnoreRules};
use super::watch::WatchLoop;
use super::{ContentSource, SourceContext, SourceKind};

/// Distinguishes the delay-queue keys of different sources.
static NEXT_KEY: AtomicU64 = AtomicU64::new(0);

/// Change detection settings of a [`DirectorySource`].
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Watch the folder after it is mounted.
    pub enabled: bool,
    /// Quiet period before a changed path is reloaded. Reset on every event.
    pub debounce: Duration,
    /// How long to keep retrying a file that a writer still holds.
    pub read_retry: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce: Duration::from_millis(100),
            read_retry: Duration::from_secs(2),
        }
    }
}

/// State shared with the watch loop.
pub(super) struct DirShared {
    pub root: PathBuf,
    ignore: ArcSwapOption<IgnoreRules>,
    disposed: AtomicBool,
}

impl DirShared {
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// (Re)load `.overlayignore` from the root. A missing file clears the rules.
    pub fn load_ignore(&self) -> Result<()> {
        let file = self.root.join(IGNORE_FILE);
        let rules = match fs::read_to_string(&file) {
            Ok(text) => Some(Arc::new(IgnoreRules::parse(&text)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => return Err(OverlayError::Io(file, err)),
        };
        self.ignore.store(rules);
        Ok(())
    }

    /// Every file below `dir`, as paths relative to the root.
    ///
    /// Entries whose name starts with `.` are skipped, except `dir` itself.
    pub fn crawl_under(&self, dir: &Path) -> Vec<(String, AssetDraft)> {
        let walker = WalkBuilder::new(dir)
            .standard_filters(false)
            .follow_links(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(|entry| entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.'))
            .build();

        let mut drafts = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!("content"; "skipping unreadable entry: {}", err);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let Some(rel) = relative_virtual(&self.root, entry.path()) else {
                continue;
            };
            drafts.push((rel, AssetDraft::new(Locator::File(entry.into_path()))));
        }
        drafts
    }
}

/// A folder mounted as a source.
///
/// Every regular file below the root is an asset, addressed by its path
/// relative to the root. Once attached, file system events are debounced
/// per path and pushed to the overlay.
pub struct DirectorySource {
    name: String,
    options: WatchOptions,
    queue: Arc<DelayQueue>,
    key_prefix: String,
    shared: Arc<DirShared>,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl DirectorySource {
    /// Mount `root`, named after its last path component.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = normalize_fs_path(root.as_ref());
        let name = root
            .file_name()
            .map_or_else(|| root.display().to_string(), |n| n.to_string_lossy().into_owned());

        Self {
            name,
            options: WatchOptions::default(),
            queue: DelayQueue::shared(),
            key_prefix: format!("dir#{}:", NEXT_KEY.fetch_add(1, Ordering::Relaxed)),
            shared: Arc::new(DirShared {
                root,
                ignore: ArcSwapOption::empty(),
                disposed: AtomicBool::new(false),
            }),
            watcher: Mutex::new(None),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_options(mut self, options: WatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Debounce on `queue` instead of the process-wide one.
    pub fn with_queue(mut self, queue: Arc<DelayQueue>) -> Self {
        self.queue = queue;
        self
    }

    pub fn root(&self) -> &Path {
        &self.shared.root
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.lock().is_some()
    }

    /// Event loop pushing this folder's changes through `ctx`.
    pub(super) fn watch_loop(&self, ctx: SourceContext) -> WatchLoop {
        WatchLoop {
            name: self.name.clone(),
            shared: Arc::clone(&self.shared),
            ctx,
            options: self.options.clone(),
            queue: Arc::clone(&self.queue),
            key_prefix: self.key_prefix.clone(),
            pending: Default::default(),
        }
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.shared.is_disposed() {
            return Err(OverlayError::Disposed(self.name.clone()));
        }
        Ok(())
    }
}

impl ContentSource for DirectorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Directory
    }

    fn crawl(&self) -> Result<Vec<(String, AssetDraft)>> {
        self.ensure_alive()?;
        let root = &self.shared.root;
        if !root.is_dir() {
            let err = io::Error::new(io::ErrorKind::NotFound, "not a directory");
            return Err(OverlayError::Io(root.clone(), err));
        }

        self.shared.load_ignore()?;
        Ok(self.shared.crawl_under(root))
    }

    fn read(&self, locator: &Locator) -> Result<Vec<u8>> {
        self.ensure_alive()?;
        let Locator::File(path) = locator else {
            return Err(OverlayError::NotReadable(locator.to_string()));
        };
        wait_until_readable(path, self.options.read_retry)?;
        fs::read(path).map_err(|err| OverlayError::Io(path.clone(), err))
    }

    fn ignore_rules(&self) -> Option<Arc<IgnoreRules>> {
        self.shared.ignore.load_full()
    }

    fn attach(&self, ctx: SourceContext) -> Result<()> {
        self.ensure_alive()?;
        if !self.options.enabled {
            return Ok(());
        }

        let root = &self.shared.root;
        let (tx, rx) = channel::unbounded();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = tx.send(res);
        })
        .map_err(|err| OverlayError::Watch(root.clone(), err))?;
        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|err| OverlayError::Watch(root.clone(), err))?;

        self.watch_loop(ctx)
            .spawn(rx)
            .map_err(|err| OverlayError::Io(root.clone(), err))?;

        *self.watcher.lock() = Some(watcher);
        debug!("watch"; "watching {}", root.display());
        Ok(())
    }

    fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        // Dropping the watcher closes the channel, which ends the watch
        // loop. It is not joined: dispose may run on that very thread.
        self.watcher.lock().take();
        self.queue.cancel_prefix(self.key_prefix.as_str());
        debug!("content"; "disposed {}", self.name);
    }
}

impl Drop for DirectorySource {
    fn drop(&mut self) {
        self.dispose();
    }
}
