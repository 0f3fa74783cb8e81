//! Resources compiled into the binary.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::asset::{AssetDraft, Locator};
use crate::error::{OverlayError, Result};
use crate::utils::path::normalize_separators;

use super::{ContentSource, SourceKind};

/// Read-only source over embedded `(name, bytes)` pairs, usually built with
/// `include_bytes!`.
///
/// Only resources whose name contains the root prefix are assets; their
/// virtual path is whatever follows it:
///
/// ```ignore
/// let bundle = BundleSource::new("Builtin", [
///     ("Content/Graphics/logo.png", include_bytes!("../Content/Graphics/logo.png").as_slice()),
/// ]);
/// ```
pub struct BundleSource {
    name: String,
    root_prefix: String,
    resources: BTreeMap<&'static str, &'static [u8]>,
    disposed: AtomicBool,
}

impl BundleSource {
    pub const DEFAULT_ROOT_PREFIX: &'static str = "Content/";

    pub fn new(
        name: impl Into<String>,
        resources: impl IntoIterator<Item = (&'static str, &'static [u8])>,
    ) -> Self {
        Self {
            name: name.into(),
            root_prefix: Self::DEFAULT_ROOT_PREFIX.to_string(),
            resources: resources.into_iter().collect(),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn with_root_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.root_prefix = prefix.into();
        self
    }

    /// Virtual path of a resource, `None` if it lies outside the root prefix.
    fn virtual_path(&self, resource: &str) -> Option<String> {
        let resource = normalize_separators(resource);
        let idx = resource.find(&self.root_prefix)?;
        let path = &resource[idx + self.root_prefix.len()..];
        (!path.is_empty()).then(|| path.to_string())
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(OverlayError::Disposed(self.name.clone()));
        }
        Ok(())
    }
}

impl ContentSource for BundleSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Bundle
    }

    fn crawl(&self) -> Result<Vec<(String, AssetDraft)>> {
        self.ensure_alive()?;
        Ok(self
            .resources
            .keys()
            .filter_map(|resource| {
                let path = self.virtual_path(resource)?;
                Some((path, AssetDraft::new(Locator::Embedded(resource.to_string()))))
            })
            .collect())
    }

    fn read(&self, locator: &Locator) -> Result<Vec<u8>> {
        self.ensure_alive()?;
        let Locator::Embedded(resource) = locator else {
            return Err(OverlayError::NotReadable(locator.to_string()));
        };
        self.resources
            .get(resource.as_str())
            .map(|bytes| bytes.to_vec())
            .ok_or_else(|| OverlayError::EntryNotFound {
                entry: resource.clone(),
                archive: PathBuf::from(&self.name),
            })
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }
}
