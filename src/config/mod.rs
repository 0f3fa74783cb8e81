//! Overlay configuration loaded from `overlay.toml`.
//!
//! # Sections
//!
//! | Section      | Purpose                                          |
//! |--------------|--------------------------------------------------|
//! | `[watch]`    | Folder change detection (debounce, read retry)   |
//! | `[archive]`  | Idle close delay of zip handles                  |
//! | `[bundle]`   | Root prefix of embedded resources                |
//! | `[mount]`    | Sources mounted at startup, lowest priority first |
//!
//! Every section is optional; a missing file yields the defaults.

mod error;
pub mod section;

pub use error::ConfigError;
pub use section::{ArchiveConfig, BundleConfig, MountConfig, WatchConfig};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::sched::DelayQueue;
use crate::source::{ArchiveSource, BundleSource, ContentSource, DirectorySource, MapBinSource};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "overlay.toml";

/// Root configuration structure representing overlay.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverlayConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    pub watch: WatchConfig,
    pub archive: ArchiveConfig,
    pub bundle: BundleConfig,
    pub mount: MountConfig,
}

impl OverlayConfig {
    /// Load `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            Self::from_path(path)?
        } else {
            Self::default()
        };
        config.config_path = crate::utils::path::normalize_fs_path(path);
        config.validate()?;
        Ok(config)
    }

    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::parse(&content)
    }

    /// Parse config from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = &self.bundle.root_prefix;
        if prefix.is_empty() || !prefix.ends_with('/') {
            return Err(ConfigError::Validation(format!(
                "[bundle] root_prefix must end with '/', got `{prefix}`"
            )));
        }
        if self.watch.debounce_ms == 0 {
            return Err(ConfigError::Validation("[watch] debounce_ms must be positive".into()));
        }
        Ok(())
    }

    /// Folder holding the config file; mount paths are relative to it.
    pub fn root(&self) -> &Path {
        self.config_path.parent().unwrap_or(Path::new("."))
    }

    /// Build the source backing `path`: `.zip` files become archives,
    /// anything else a folder.
    pub fn source_for(&self, path: &Path) -> Arc<dyn ContentSource> {
        let is_zip = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));

        if is_zip && !path.is_dir() {
            Arc::new(ArchiveSource::with_idle_close(
                path,
                self.archive.idle_close(),
                DelayQueue::shared(),
            ))
        } else {
            Arc::new(DirectorySource::new(path).with_options(self.watch.options()))
        }
    }

    /// Sources for `[mount] paths` then `[mount] map_bins`, in priority order.
    pub fn sources(&self) -> Vec<Arc<dyn ContentSource>> {
        let root = self.root();
        let mut sources: Vec<_> = self.mount.resolve(root).iter().map(|path| self.source_for(path)).collect();
        for folder in self.mount.resolve_map_bins(root) {
            sources.push(Arc::new(MapBinSource::new(folder)));
        }
        sources
    }

    /// Apply `[bundle]` settings to an embedded bundle.
    pub fn bundle(&self, bundle: BundleSource) -> BundleSource {
        bundle.with_root_prefix(self.bundle.root_prefix.clone())
    }
}
