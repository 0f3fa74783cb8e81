//! Ordered observer lists.
//!
//! Observers are invoked in registration order and removed explicitly by the
//! [`HookId`] returned at registration. The list is copy-on-write, so
//! invoking observers never holds a lock and an observer may register or
//! remove hooks while being called.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;

/// Handle returned by [`ObserverList::add`], used to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

/// Copy-on-write list of observers of type `F` (usually a `dyn Fn`).
pub struct ObserverList<F: ?Sized> {
    next_id: AtomicU64,
    entries: ArcSwap<Vec<(HookId, Arc<F>)>>,
}

impl<F: ?Sized> ObserverList<F> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            entries: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Append an observer. It runs after every observer added before it.
    pub fn add(&self, observer: Arc<F>) -> HookId {
        let id = HookId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.rcu(|current| {
            let mut next = (**current).clone();
            next.push((id, Arc::clone(&observer)));
            next
        });
        id
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn remove(&self, id: HookId) -> bool {
        let mut removed = false;
        self.entries.rcu(|current| {
            let next: Vec<_> = current.iter().filter(|(hid, _)| *hid != id).cloned().collect();
            removed = next.len() != current.len();
            next
        });
        removed
    }

    /// Observers in registration order, detached from later changes.
    pub fn snapshot(&self) -> Vec<Arc<F>> {
        self.entries.load().iter().map(|(_, f)| Arc::clone(f)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }
}

impl<F: ?Sized> Default for ObserverList<F> {
    fn default() -> Self {
        Self::new()
    }
}
