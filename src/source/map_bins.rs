//! Loose map binaries dropped straight into a mods folder.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::asset::{AssetDraft, Locator};
use crate::debug;
use crate::error::{OverlayError, Result};
use crate::utils::path::normalize_fs_path;

use super::{ContentSource, SourceKind};

/// Every `*.bin` file directly inside a folder, mounted under `Maps/`.
///
/// Only the top level is read. Subfolders belong to [`DirectorySource`]
/// mounts of their own. Nothing is watched.
///
/// [`DirectorySource`]: super::DirectorySource
pub struct MapBinSource {
    name: String,
    root: PathBuf,
    disposed: AtomicBool,
}

impl MapBinSource {
    pub const PREFIX: &'static str = "Maps";
    const EXTENSION: &'static str = "bin";

    /// Mount the loose maps of `root`, named after its last path component.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = normalize_fs_path(root.as_ref());
        let name = root
            .file_name()
            .map_or_else(|| root.display().to_string(), |n| n.to_string_lossy().into_owned());
        Self {
            name,
            root,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_map_bin(path: &Path) -> bool {
        let hidden = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with('.'));
        !hidden && path.extension().is_some_and(|ext| ext == Self::EXTENSION)
    }
}

impl ContentSource for MapBinSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Directory
    }

    fn crawl(&self) -> Result<Vec<(String, AssetDraft)>> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(OverlayError::Disposed(self.name.clone()));
        }
        let entries = fs::read_dir(&self.root).map_err(|err| OverlayError::Io(self.root.clone(), err))?;

        let mut drafts = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| OverlayError::Io(self.root.clone(), err))?;
            let path = entry.path();
            if !entry.file_type().is_ok_and(|t| t.is_file()) || !Self::is_map_bin(&path) {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            drafts.push((format!("{}/{file_name}", Self::PREFIX), AssetDraft::new(Locator::File(path))));
        }
        drafts.sort_by(|a, b| a.0.cmp(&b.0));
        debug!("content"; "{}: {} loose maps", self.name, drafts.len());
        Ok(drafts)
    }

    fn read(&self, locator: &Locator) -> Result<Vec<u8>> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(OverlayError::Disposed(self.name.clone()));
        }
        match locator {
            Locator::File(path) if path.parent() == Some(self.root.as_path()) => {
                fs::read(path).map_err(|err| OverlayError::Io(path.clone(), err))
            }
            Locator::File(path) => Err(OverlayError::Io(
                path.clone(),
                io::Error::new(io::ErrorKind::NotFound, "outside the maps folder"),
            )),
            other => Err(OverlayError::NotReadable(other.to_string())),
        }
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }
}
