//! Zip archives as sources.
//!
//! The archive file is opened lazily and shared between readers. Each user
//! holds an [`ArchiveGuard`]; when the last guard goes away the handle is
//! closed after an idle period, unless a new user shows up first.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::asset::{AssetDraft, Locator};
use crate::debug;
use crate::error::{OverlayError, Result};
use crate::sched::DelayQueue;
use crate::utils::path::{normalize_fs_path, normalize_separators};

use super::ignore_rules::{IGNORE_FILE, IgnoreRules};
use super::{ContentSource, SourceKind};

/// Default time an unused archive stays open.
pub const DEFAULT_IDLE_CLOSE: Duration = Duration::from_secs(10);

/// Largest read buffer allocated up front from an entry's declared size.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Open zip handle. Its mutex is the read lock: entry streams borrow the
/// archive mutably, so reads are serialized on it.
type SharedZip = Arc<Mutex<ZipArchive<File>>>;

#[derive(Default)]
struct Handle {
    archive: Option<SharedZip>,
    users: usize,
}

struct ArchiveShared {
    name: String,
    path: PathBuf,
    idle_close: Duration,
    queue: Arc<DelayQueue>,
    /// Delay-queue key of the pending idle close.
    close_key: String,
    /// Guards open/close transitions and the user count.
    handle: Mutex<Handle>,
    opens: AtomicUsize,
    ignore: ArcSwapOption<IgnoreRules>,
    disposed: AtomicBool,
}

impl ArchiveShared {
    fn disposed_error(&self) -> OverlayError {
        OverlayError::Disposed(self.name.clone())
    }

    fn acquire(self: &Arc<Self>) -> Result<ArchiveGuard> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(self.disposed_error());
        }

        let mut handle = self.handle.lock();
        // Dispose takes the handle lock too, so this check cannot go stale.
        if self.disposed.load(Ordering::Acquire) {
            return Err(self.disposed_error());
        }
        self.queue.cancel(self.close_key.as_str());

        let archive = match &handle.archive {
            Some(archive) => Arc::clone(archive),
            None => {
                let file = File::open(&self.path).map_err(|err| OverlayError::Io(self.path.clone(), err))?;
                let zip = ZipArchive::new(file).map_err(|err| OverlayError::Zip(self.path.clone(), err))?;
                self.opens.fetch_add(1, Ordering::Relaxed);
                debug!("archive"; "opened {}", self.path.display());

                let archive = Arc::new(Mutex::new(zip));
                handle.archive = Some(Arc::clone(&archive));
                archive
            }
        };
        handle.users += 1;

        Ok(ArchiveGuard {
            shared: Arc::clone(self),
            archive,
        })
    }

    fn release(self: &Arc<Self>) {
        let mut handle = self.handle.lock();
        handle.users = handle.users.saturating_sub(1);
        if handle.users > 0 || handle.archive.is_none() || self.disposed.load(Ordering::Acquire) {
            return;
        }

        let weak = Arc::downgrade(self);
        self.queue.schedule(self.close_key.as_str(), self.idle_close, move || {
            if let Some(shared) = weak.upgrade() {
                shared.close_if_idle();
            }
        });
    }

    fn close_if_idle(&self) {
        let mut handle = self.handle.lock();
        if handle.users == 0 && handle.archive.take().is_some() {
            debug!("archive"; "closed idle {}", self.path.display());
        }
    }

    fn entry_not_found(&self, entry: &str) -> OverlayError {
        OverlayError::EntryNotFound {
            entry: entry.to_string(),
            archive: self.path.clone(),
        }
    }
}

/// A user of an open archive. The handle stays open while any guard lives.
pub struct ArchiveGuard {
    shared: Arc<ArchiveShared>,
    archive: SharedZip,
}

impl std::fmt::Debug for ArchiveGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveGuard")
            .field("path", &self.shared.path)
            .finish_non_exhaustive()
    }
}

impl ArchiveGuard {
    /// Names of every non-directory entry, as stored in the archive.
    pub fn entry_names(&self) -> Vec<String> {
        self.archive
            .lock()
            .file_names()
            .filter(|name| !name.ends_with('/') && !name.ends_with('\\'))
            .map(String::from)
            .collect()
    }

    /// Full content of `entry`.
    pub fn read_entry(&self, entry: &str) -> Result<Vec<u8>> {
        let path = &self.shared.path;
        let mut archive = self.archive.lock();
        let mut file = match archive.by_name(entry) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Err(self.shared.entry_not_found(entry)),
            Err(err) => return Err(OverlayError::Zip(path.clone(), err)),
        };

        let mut bytes = Vec::with_capacity(initial_capacity(file.size()));
        file.read_to_end(&mut bytes)
            .map_err(|err| OverlayError::Io(path.clone(), err))?;
        Ok(bytes)
    }
}

/// Read buffer size for an entry declaring `declared` bytes. The header is
/// not trusted beyond [`MAX_PREALLOC`]; `read_to_end` grows past it.
pub(super) fn initial_capacity(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_PREALLOC)).unwrap_or(0)
}

impl Drop for ArchiveGuard {
    fn drop(&mut self) {
        self.shared.release();
    }
}

/// A zip file mounted as a source. Entries are assets; folders are implied
/// by entry names.
pub struct ArchiveSource {
    shared: Arc<ArchiveShared>,
}

impl ArchiveSource {
    /// Mount the zip at `path`, named after its file stem.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_idle_close(path, DEFAULT_IDLE_CLOSE, DelayQueue::shared())
    }

    /// Like [`new`](Self::new), closing the handle after `idle_close`
    /// without users, scheduled on `queue`.
    pub fn with_idle_close(path: impl AsRef<Path>, idle_close: Duration, queue: Arc<DelayQueue>) -> Self {
        let path = normalize_fs_path(path.as_ref());
        let name = path
            .file_stem()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        Self {
            shared: Arc::new(ArchiveShared {
                name,
                close_key: format!("archive:{}", path.display()),
                path,
                idle_close,
                queue,
                handle: Mutex::new(Handle::default()),
                opens: AtomicUsize::new(0),
                ignore: ArcSwapOption::empty(),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Borrow the shared handle, opening the file if it is closed.
    pub fn open(&self) -> Result<ArchiveGuard> {
        self.shared.acquire()
    }

    pub fn is_open(&self) -> bool {
        self.shared.handle.lock().archive.is_some()
    }

    /// How many times the file has actually been opened.
    pub fn open_count(&self) -> usize {
        self.shared.opens.load(Ordering::Relaxed)
    }

    /// Current number of live guards.
    pub fn users(&self) -> usize {
        self.shared.handle.lock().users
    }
}

impl ContentSource for ArchiveSource {
    fn name(&self) -> &str {
        &self.shared.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Archive
    }

    fn crawl(&self) -> Result<Vec<(String, AssetDraft)>> {
        let guard = self.open()?;
        let names = guard.entry_names();

        let rules = match names.iter().find(|name| normalize_separators(name) == IGNORE_FILE) {
            Some(entry) => {
                let bytes = guard.read_entry(entry)?;
                Some(Arc::new(IgnoreRules::parse(&String::from_utf8_lossy(&bytes))?))
            }
            None => None,
        };
        self.shared.ignore.store(rules);

        Ok(names
            .into_iter()
            .filter_map(|entry| {
                let path = normalize_separators(&entry);
                (path != IGNORE_FILE).then(|| (path, AssetDraft::new(Locator::ArchiveEntry(entry))))
            })
            .collect())
    }

    fn read(&self, locator: &Locator) -> Result<Vec<u8>> {
        let Locator::ArchiveEntry(entry) = locator else {
            return Err(OverlayError::NotReadable(locator.to_string()));
        };
        self.open()?.read_entry(entry)
    }

    fn ignore_rules(&self) -> Option<Arc<IgnoreRules>> {
        self.shared.ignore.load_full()
    }

    fn dispose(&self) {
        let shared = &self.shared;
        let mut handle = shared.handle.lock();
        if shared.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        shared.queue.cancel(shared.close_key.as_str());
        handle.archive = None;
        debug!("content"; "disposed {}", shared.name);
    }
}

impl Drop for ArchiveSource {
    fn drop(&mut self) {
        self.dispose();
    }
}
