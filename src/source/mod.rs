//! Content sources.
//!
//! A [`ContentSource`] enumerates assets from one place and reads their bytes
//! back on demand. The overlay owns every descriptor: a source only reports
//! paths and [`AssetDraft`]s, first through [`ContentSource::crawl`] and later
//! through the [`SourceContext`] handed to [`ContentSource::attach`].
//!
//! | Source              | Backing                     | Change detection       |
//! |---------------------|-----------------------------|------------------------|
//! | [`DirectorySource`] | folder on disk              | `notify` watcher       |
//! | [`ArchiveSource`]   | zip file                    | none                   |
//! | [`BundleSource`]    | `include_bytes!` resources  | none                   |
//! | [`MapBinSource`]    | loose `.bin` files          | none                   |

mod archive;
mod bundle;
mod directory;
mod ignore_rules;
mod map_bins;
mod watch;


pub use archive::{ArchiveGuard, ArchiveSource};
pub use bundle::BundleSource;
pub use directory::{DirectorySource, WatchOptions};
pub use ignore_rules::{IGNORE_FILE, IgnoreRules};
pub use map_bins::MapBinSource;

pub use crate::overlay::SourceContext;

use std::fmt;
use std::sync::Arc;

use crate::asset::{AssetDraft, Locator};
use crate::error::Result;

/// What backs a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Directory,
    Archive,
    Bundle,
}

impl SourceKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::Archive => "archive",
            Self::Bundle => "bundle",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A provider of assets.
pub trait ContentSource: Send + Sync {
    /// Display name, also the prefix of `"name:/path"` aliases.
    fn name(&self) -> &str;

    fn kind(&self) -> SourceKind;

    /// Enumerate every asset as `(source-relative path, draft)`.
    fn crawl(&self) -> Result<Vec<(String, AssetDraft)>>;

    /// Raw bytes behind a locator this source produced.
    fn read(&self, locator: &Locator) -> Result<Vec<u8>>;

    /// Patterns for paths the overlay should skip. Read after each crawl.
    fn ignore_rules(&self) -> Option<Arc<IgnoreRules>> {
        None
    }

    /// Start reporting changes through `ctx`.
    fn attach(&self, _ctx: SourceContext) -> Result<()> {
        Ok(())
    }

    /// Stop change detection and release handles. Idempotent.
    fn dispose(&self);
}
