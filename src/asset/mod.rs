//! Asset identity records.
//!
//! An [`AssetDescriptor`] names one addressable unit of content in the
//! overlay. Descriptors are shared as `Arc` and compared by identity: an
//! update always produces a new descriptor, never edits an existing one.
//! The only mutable part is the child list of a directory node, which the
//! overlay maintains under its own lock.

mod kind;

pub use kind::AssetType;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

/// Identifier of a registered content source, unique per registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub u32);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The source a descriptor came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub id: SourceId,
    pub name: Arc<str>,
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Where a source finds the bytes of an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Absolute path on disk.
    File(PathBuf),
    /// Entry name inside an archive.
    ArchiveEntry(String),
    /// Name of an embedded resource.
    Embedded(String),
    /// No backing content (overlay-synthesized directories).
    Synthetic,
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::ArchiveEntry(entry) => write!(f, "zip:{entry}"),
            Self::Embedded(name) => write!(f, "embedded:{name}"),
            Self::Synthetic => f.write_str("<synthetic>"),
        }
    }
}

/// An asset as produced by a source, before the overlay classifies it.
#[derive(Debug, Clone)]
pub struct AssetDraft {
    pub locator: Locator,
    /// Pre-assigned `(type, format)`. `None` lets the classifier decide.
    pub kind: Option<(AssetType, String)>,
}

impl AssetDraft {
    pub fn new(locator: Locator) -> Self {
        Self { locator, kind: None }
    }

    pub fn typed(mut self, kind: AssetType, format: impl Into<String>) -> Self {
        self.kind = Some((kind, format.into()));
        self
    }
}

/// Identity record for one asset in the overlay.
#[derive(Debug)]
pub struct AssetDescriptor {
    path: String,
    kind: AssetType,
    format: String,
    source: Option<SourceRef>,
    locator: Locator,
    children: RwLock<Vec<Arc<AssetDescriptor>>>,
}

impl AssetDescriptor {
    pub fn new(
        path: impl Into<String>,
        kind: AssetType,
        format: impl Into<String>,
        source: Option<SourceRef>,
        locator: Locator,
    ) -> Self {
        Self {
            path: path.into(),
            kind,
            format: format.into(),
            source,
            locator,
            children: RwLock::new(Vec::new()),
        }
    }

    /// A synthesized directory node.
    pub fn directory(path: impl Into<String>) -> Self {
        Self::new(path, AssetType::Directory, "", None, Locator::Synthetic)
    }

    /// A fresh descriptor for the same asset with new backing content.
    ///
    /// Path, type and format carry over; only the locator changes.
    pub fn reissue(&self, locator: Locator) -> Self {
        Self::new(
            self.path.clone(),
            self.kind.clone(),
            self.format.clone(),
            self.source.clone(),
            locator,
        )
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn kind(&self) -> &AssetType {
        &self.kind
    }

    #[inline]
    pub fn format(&self) -> &str {
        &self.format
    }

    #[inline]
    pub fn source(&self) -> Option<&SourceRef> {
        self.source.as_ref()
    }

    #[inline]
    pub fn source_id(&self) -> Option<SourceId> {
        self.source.as_ref().map(|s| s.id)
    }

    #[inline]
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    #[inline]
    pub fn is_directory(&self) -> bool {
        self.kind.is_directory()
    }

    /// Snapshot of the children, in insertion order.
    pub fn children(&self) -> Vec<Arc<AssetDescriptor>> {
        self.children.read().clone()
    }

    pub fn has_children(&self) -> bool {
        !self.children.read().is_empty()
    }

    pub(crate) fn push_child(&self, child: Arc<AssetDescriptor>) {
        self.children.write().push(child);
    }

    /// Replace `prev` by `next` in place, keeping its position.
    /// Appends `next` when `prev` is not a child.
    pub(crate) fn replace_child(&self, prev: &Arc<AssetDescriptor>, next: Arc<AssetDescriptor>) {
        let mut children = self.children.write();
        match children.iter().position(|c| Arc::ptr_eq(c, prev)) {
            Some(idx) => children[idx] = next,
            None => children.push(next),
        }
    }

    pub(crate) fn remove_child(&self, child: &Arc<AssetDescriptor>) -> bool {
        let mut children = self.children.write();
        let before = children.len();
        children.retain(|c| !Arc::ptr_eq(c, child));
        children.len() != before
    }
}

impl fmt::Display for AssetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{} [{}] from {}", self.path, self.kind, source),
            None => write!(f, "{} [{}]", self.path, self.kind),
        }
    }
}
