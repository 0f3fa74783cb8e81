//! Live asset capability.

use std::sync::Arc;

use crate::asset::AssetDescriptor;

/// A loaded, in-memory object built from overlay content.
///
/// Implementors are registered weakly with the
/// [`ReloadBroker`](super::ReloadBroker) and asked to re-ingest whenever the
/// asset they were loaded from, or anything below it, changes. What
/// re-ingesting means (re-reading a texture, merging a dialog table) is up
/// to the implementor.
pub trait LiveAsset: Send + Sync {
    fn reingest(&self, asset: &Arc<AssetDescriptor>);
}
