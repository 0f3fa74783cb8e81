//! `[mount]` section configuration.
//!
//! Sources mounted at startup, lowest priority first. Relative paths are
//! resolved against the folder holding the config file. Folders listed in
//! `map_bins` contribute only their top-level `.bin` files, as `Maps/<file>`,
//! and are mounted after `paths`.
//!
//! # Example
//!
//! ```toml
//! [mount]
//! paths = ["Content", "Mods/ModA", "Mods/ModB.zip"]
//! map_bins = ["Mods"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Startup mounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MountConfig {
    pub paths: Vec<PathBuf>,
    pub map_bins: Vec<PathBuf>,
}

impl MountConfig {
    /// Mount paths made absolute against `base`.
    pub fn resolve(&self, base: &Path) -> Vec<PathBuf> {
        absolute(&self.paths, base)
    }

    /// Loose map folders made absolute against `base`.
    pub fn resolve_map_bins(&self, base: &Path) -> Vec<PathBuf> {
        absolute(&self.map_bins, base)
    }
}

fn absolute(paths: &[PathBuf], base: &Path) -> Vec<PathBuf> {
    paths
        .iter()
        .map(|path| if path.is_absolute() { path.clone() } else { base.join(path) })
        .collect()
}
