//! Object tracker: the children of one kind a parent owns.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};

use crate::object::{Identity, ObjectKind};
use crate::state::{ObjectRef, StateTracker};

/// Owning collection of references. Ordered by identity so that enumeration is stable.
pub struct ObjectTracker {
    kind: ObjectKind,
    entries: Mutex<BTreeMap<Identity, ObjectRef>>,
}

impl ObjectTracker {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn insert(&self, r: ObjectRef) {
        let replaced = self.entries.lock().insert(r.id(), r);
        // a replaced owner is released outside the lock
        drop(replaced);
    }

    pub fn erase(&self, id: &Identity) -> Option<ObjectRef> {
        self.entries.lock().remove(id)
    }

    pub fn clear(&self) {
        drop(self.drain());
    }

    /// Remove and hand back every entry.
    pub fn drain(&self) -> Vec<ObjectRef> {
        let taken = std::mem::take(&mut *self.entries.lock());
        taken.into_values().collect()
    }

    pub fn contains(&self, id: &Identity) -> bool {
        self.entries.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn identities(&self) -> Vec<Identity> {
        self.entries.lock().keys().copied().collect()
    }

    /// Visit every owned reference. Runs on a snapshot, so `f` may mutate this tracker.
    pub fn enumerate<F: FnMut(&ObjectRef)>(&self, mut f: F) {
        let snapshot: Vec<ObjectRef> = self.entries.lock().values().cloned().collect();
        for r in &snapshot {
            f(r);
        }
    }

    /// Ask every owned reference to enumerate its own dependencies, sharing `visited`.
    pub fn enumerate_dependencies(
        &self,
        tracker: &StateTracker,
        visited: &mut HashSet<Identity>,
        f: &mut dyn FnMut(&ObjectRef),
    ) {
        self.enumerate(|r| tracker.walk_dependencies(r, visited, f));
    }
}

impl std::fmt::Debug for ObjectTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectTracker")
            .field("kind", &self.kind)
            .field("len", &self.len())
            .finish()
    }
}
