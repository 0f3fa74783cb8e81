//! Hot-reload notification for live objects.
//!
//! Live objects register under the virtual path they were loaded from. On
//! every update the broker walks the changed path up to the root and asks
//! each registered object to re-ingest the new descriptor.
//!
//! # Guarantees
//!
//! - At most one notification per live object per update, even when the
//!   object is registered under several paths on the walk.
//! - Registrations are weak: a dropped object is skipped, and its entry is
//!   removed when a later walk finds it dead.
//! - Callbacks run with no broker lock held, so a callback may register
//!   further objects.

mod live;

pub use live::LiveAsset;

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use smallvec::SmallVec;

use crate::asset::AssetDescriptor;
use crate::debug;
use crate::utils::path::{resolve_dots, self_and_ancestors};

/// Weak registry of live objects keyed by virtual path.
#[derive(Default)]
pub struct ReloadBroker {
    live: DashMap<String, Weak<dyn LiveAsset>>,
}

impl ReloadBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `object` under `path`, replacing any previous registration
    /// for that path.
    pub fn register(&self, path: &str, object: Weak<dyn LiveAsset>) {
        self.live.insert(resolve_dots(path), object);
    }

    /// Deliver `next` to every live object registered at its path or one of
    /// its ancestors. Returns how many objects were notified.
    pub fn notify(&self, next: &Arc<AssetDescriptor>) -> usize {
        let mut seen: SmallVec<[Weak<dyn LiveAsset>; 4]> = SmallVec::new();
        let mut targets: SmallVec<[Arc<dyn LiveAsset>; 4]> = SmallVec::new();

        for path in self_and_ancestors(next.path()) {
            // Clone out of the map so no shard lock is held below.
            let Some(weak) = self.live.get(path).map(|entry| entry.value().clone()) else {
                continue;
            };
            if seen.iter().any(|w| Weak::ptr_eq(w, &weak)) {
                continue;
            }

            match weak.upgrade() {
                Some(object) => {
                    seen.push(weak);
                    targets.push(object);
                }
                None => {
                    self.live.remove_if(path, |_, w| w.strong_count() == 0);
                }
            }
        }

        if !targets.is_empty() {
            debug!("reload"; "{} -> {} live object{}", next.path(), targets.len(),
                crate::utils::plural_s(targets.len()));
        }
        for object in &targets {
            object.reingest(next);
        }
        targets.len()
    }

    /// Number of registrations, dead ones included.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Drop every dead registration now.
    pub fn prune(&self) {
        self.live.retain(|_, w| w.strong_count() > 0);
    }

    pub fn clear(&self) {
        self.live.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetType, Locator};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl LiveAsset for Recorder {
        fn reingest(&self, asset: &Arc<AssetDescriptor>) {
            self.seen.lock().push(asset.path().to_string());
        }
    }

    fn texture(path: &str) -> Arc<AssetDescriptor> {
        Arc::new(AssetDescriptor::new(path, AssetType::Texture, "png", None, Locator::Synthetic))
    }

    fn weak(object: &Arc<Recorder>) -> Weak<dyn LiveAsset> {
        let object: Arc<dyn LiveAsset> = object.clone();
        Arc::downgrade(&object)
    }

    #[test]
    fn test_ancestor_registration_notified_once() {
        let broker = ReloadBroker::new();
        let atlas = Arc::new(Recorder::default());
        broker.register("Graphics/Atlases/Gui", weak(&atlas));

        let notified = broker.notify(&texture("Graphics/Atlases/Gui/icon"));
        assert_eq!(notified, 1);
        assert_eq!(*atlas.seen.lock(), vec!["Graphics/Atlases/Gui/icon"]);
    }

    #[test]
    fn test_same_object_on_two_ancestors() {
        let broker = ReloadBroker::new();
        let atlas = Arc::new(Recorder::default());
        broker.register("Graphics/Atlases/Gui", weak(&atlas));
        broker.register("Graphics/Atlases", weak(&atlas));

        assert_eq!(broker.notify(&texture("Graphics/Atlases/Gui/icon")), 1);
        assert_eq!(atlas.seen.lock().len(), 1);
    }

    #[test]
    fn test_distinct_objects_each_notified() {
        let broker = ReloadBroker::new();
        let gui = Arc::new(Recorder::default());
        let all = Arc::new(Recorder::default());
        broker.register("Graphics/Atlases/Gui", weak(&gui));
        broker.register("Graphics", weak(&all));

        assert_eq!(broker.notify(&texture("Graphics/Atlases/Gui/icon")), 2);
        assert_eq!(gui.seen.lock().len(), 1);
        assert_eq!(all.seen.lock().len(), 1);
    }

    #[test]
    fn test_unrelated_path_not_notified() {
        let broker = ReloadBroker::new();
        let gui = Arc::new(Recorder::default());
        broker.register("Graphics/Atlases/Gui", weak(&gui));

        assert_eq!(broker.notify(&texture("Graphics/Atlases/Guild/icon")), 0);
        assert!(gui.seen.lock().is_empty());
    }

    #[test]
    fn test_dead_registration_removed_lazily() {
        let broker = ReloadBroker::new();
        let gui = Arc::new(Recorder::default());
        broker.register("Graphics/Atlases/Gui", weak(&gui));
        drop(gui);

        // Still there until a walk finds it
        assert_eq!(broker.len(), 1);
        assert_eq!(broker.notify(&texture("Graphics/Atlases/Gui/icon")), 0);
        assert!(broker.is_empty());
    }

    #[test]
    fn test_reregister_replaces() {
        let broker = ReloadBroker::new();
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        broker.register("Dialog/english", weak(&first));
        broker.register("Dialog\\english", weak(&second));

        assert_eq!(broker.len(), 1);
        broker.notify(&texture("Dialog/english"));
        assert!(first.seen.lock().is_empty());
        assert_eq!(second.seen.lock().len(), 1);
    }
}
