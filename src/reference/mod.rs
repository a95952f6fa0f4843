//! Reference registry: shared ownership of a payload plus weak lookup by id.
//!
//! Ownership model:
//! - `Registry::new_ref*` allocates a control block and hands out the first strong `Reference`.
//! - Clones of a `Reference` share ownership; the last one to drop destroys the payload.
//! - The registry keeps only a `Weak` keyed by id. `get` promotes it to a strong reference,
//!   so a lookup never extends lifetime past the last owner's drop.
//! - The registry entry is erased synchronously from the control block's `Drop`.
//!
//! Locking: one `parking_lot::Mutex` per registry serializes insert / erase / lookup /
//! snapshot. Strong references promoted under the lock are always released after it,
//! otherwise a last-owner drop would re-enter the lock from `Drop`.

use parking_lot::Mutex;
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use crate::error::{Error, Result};
use crate::metrics::{record_reference_created, record_reference_released};

/// Bound for registry keys.
pub trait RegistryId: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {}
impl<I: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static> RegistryId for I {}

/// Monotonic id source. Starts at 1; 0 is never handed out.
#[derive(Debug)]
pub struct IdCounter {
    next: AtomicU64,
}

impl IdCounter {
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Id the next call to `next_id` will return.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }

    /// Process-wide counter shared by every registry built with `Registry::new()`.
    pub fn process() -> Arc<IdCounter> {
        static PROCESS_IDS: OnceLock<Arc<IdCounter>> = OnceLock::new();
        PROCESS_IDS.get_or_init(|| Arc::new(IdCounter::new())).clone()
    }
}

impl Default for IdCounter {
    fn default() -> Self {
        Self::new()
    }
}

struct Shared<T, I: RegistryId> {
    entries: Mutex<HashMap<I, Weak<Block<T, I>>>>,
    ids: Arc<IdCounter>,
}

struct Block<T, I: RegistryId> {
    id: I,
    payload: T,
    // bookkeeping only, never an ownership edge
    registry: Weak<Shared<T, I>>,
}

impl<T, I: RegistryId> Drop for Block<T, I> {
    fn drop(&mut self) {
        record_reference_released();
        if let Some(shared) = self.registry.upgrade() {
            let mut entries = shared.entries.lock();
            // The id may already be re-bound to a newer block; only erase our own entry.
            let ours = entries
                .get(&self.id)
                .map(|w| std::ptr::eq(w.as_ptr(), self as *const Self))
                .unwrap_or(false);
            if ours {
                entries.remove(&self.id);
            }
        }
    }
}

/// Strong, shared handle to a registry control block.
pub struct Reference<T, I: RegistryId = u64>(Arc<Block<T, I>>);

impl<T, I: RegistryId> Reference<T, I> {
    pub fn id(&self) -> I {
        self.0.id
    }

    /// Number of strong owners alive right now (this one included).
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    pub fn payload(&self) -> &T {
        &self.0.payload
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl<T, I: RegistryId> Clone for Reference<T, I> {
    fn clone(&self) -> Self {
        Reference(Arc::clone(&self.0))
    }
}

impl<T, I: RegistryId> Deref for Reference<T, I> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0.payload
    }
}

impl<T, I: RegistryId> PartialEq for Reference<T, I> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T, I: RegistryId> Eq for Reference<T, I> {}

impl<T, I: RegistryId> Hash for Reference<T, I> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl<T, I: RegistryId> PartialOrd for Reference<T, I> {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl<T, I: RegistryId> Ord for Reference<T, I> {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.addr().cmp(&other.addr())
    }
}

impl<T, I: RegistryId> fmt::Debug for Reference<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("id", &self.0.id)
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

/// Weakly-enumerable registry of payloads keyed by `I`.
pub struct Registry<T, I: RegistryId = u64> {
    shared: Arc<Shared<T, I>>,
}

impl<T, I: RegistryId> Clone for Registry<T, I> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, I: RegistryId> Default for Registry<T, I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, I: RegistryId> Registry<T, I> {
    /// Registry drawing ids from the process-wide counter.
    pub fn new() -> Self {
        Self::with_counter(IdCounter::process())
    }

    pub fn with_counter(ids: Arc<IdCounter>) -> Self {
        Self {
            shared: Arc::new(Shared {
                entries: Mutex::new(HashMap::new()),
                ids,
            }),
        }
    }

    /// Insert `payload` under a caller-chosen id.
    ///
    /// Fails with `DuplicateId` while another owner keeps an entry with that id alive; the
    /// previous owner must release it before the id can be reused.
    pub fn new_ref_with_id(&self, id: I, payload: T) -> Result<Reference<T, I>> {
        let mut entries = self.shared.entries.lock();
        if let Some(existing) = entries.get(&id) {
            if existing.strong_count() > 0 {
                return Err(Error::DuplicateId(format!("{:?}", id)));
            }
        }
        let block = Arc::new(Block {
            id,
            payload,
            registry: Arc::downgrade(&self.shared),
        });
        entries.insert(id, Arc::downgrade(&block));
        drop(entries);
        record_reference_created();
        Ok(Reference(block))
    }

    /// Promote the weak entry for `id`. `None` when absent or already dying.
    pub fn get(&self, id: &I) -> Option<Reference<T, I>> {
        let promoted = {
            let entries = self.shared.entries.lock();
            entries.get(id).and_then(Weak::upgrade)
        };
        promoted.map(Reference)
    }

    /// Like `get`, but an absent id is reported as `NotFound`.
    pub fn require(&self, id: &I) -> Result<Reference<T, I>> {
        self.get(id)
            .ok_or_else(|| Error::NotFound(format!("registry entry {:?}", id)))
    }

    pub fn contains(&self, id: &I) -> bool {
        let entries = self.shared.entries.lock();
        entries
            .get(id)
            .map(|w| w.strong_count() > 0)
            .unwrap_or(false)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let entries = self.shared.entries.lock();
        entries.values().filter(|w| w.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visit a consistent snapshot of every live entry.
    ///
    /// The snapshot is taken under the registry lock; entries that died before promotion are
    /// skipped. The callback runs after the lock is released, so it may create or drop
    /// references freely.
    pub fn enumerate<F: FnMut(&Reference<T, I>)>(&self, mut f: F) {
        let snapshot: Vec<Reference<T, I>> = {
            let entries = self.shared.entries.lock();
            entries
                .values()
                .filter_map(Weak::upgrade)
                .map(Reference)
                .collect()
        };
        for r in &snapshot {
            f(r);
        }
    }

    pub fn id_counter(&self) -> &Arc<IdCounter> {
        &self.shared.ids
    }
}

impl<T> Registry<T, u64> {
    /// Insert `payload` under a freshly allocated id.
    pub fn new_ref(&self, payload: T) -> Reference<T, u64> {
        let mut entries = self.shared.entries.lock();
        let mut id = self.shared.ids.next_id();
        // ids bound by hand through new_ref_with_id may sit on the counter's path
        while entries.get(&id).map(|w| w.strong_count() > 0).unwrap_or(false) {
            id = self.shared.ids.next_id();
        }
        let block = Arc::new(Block {
            id,
            payload,
            registry: Arc::downgrade(&self.shared),
        });
        entries.insert(id, Arc::downgrade(&block));
        drop(entries);
        record_reference_created();
        Reference(block)
    }
}
