//! Virtual asset overlay.
//!
//! Merges folders, zip archives and embedded resource bundles into a single
//! path -> descriptor namespace. Later sources override earlier ones path by
//! path, conflicting overrides are reported, and changes on disk reach live
//! objects through the [`ReloadBroker`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use asset_overlay::OverlayRegistry;
//! use asset_overlay::source::{ArchiveSource, ContentSource, DirectorySource};
//!
//! let registry = OverlayRegistry::new();
//! let sources: Vec<Arc<dyn ContentSource>> = vec![
//!     Arc::new(DirectorySource::new("Content")),
//!     Arc::new(ArchiveSource::new("Mods/ModA.zip")),
//! ];
//! for result in registry.register_sources(sources) {
//!     if let Err(err) = result {
//!         eprintln!("{err}");
//!     }
//! }
//! registry.finish_initial_load();
//!
//! let icon = registry.get("Graphics/Atlases/Gui/icon");
//! ```

pub mod logger;

pub mod asset;
pub mod classify;
pub mod config;
pub mod error;
pub mod hooks;
pub mod overlay;
pub mod reload;
pub mod sched;
pub mod source;
pub mod utils;

pub use asset::{AssetDescriptor, AssetDraft, AssetType, Locator, SourceId, SourceRef};
pub use error::{OverlayError, Result};
pub use overlay::{Conflict, Diagnostic, OverlayRegistry, SourceContext};
pub use reload::{LiveAsset, ReloadBroker};
pub use source::ContentSource;
