//! Native seam used by the applier, and a GPU-less implementation of it.

use ash::vk;
use log::debug;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::command::Command;
use crate::error::Result;
use crate::object::{Binding, CreateInfo, Identity, InstanceInfo, ObjectKind, ObjectState};
use crate::state::StateTracker;

/// The native calls a restore needs. Every call reports failure as the native result code.
pub trait NativeApi {
    /// Construct an object from already-translated parameters against `parent`.
    fn create_object(
        &self,
        parent: Option<&Identity>,
        info: &CreateInfo,
    ) -> std::result::Result<Identity, vk::Result>;

    fn bind(&self, object: &Identity, binding: &Binding) -> std::result::Result<(), vk::Result>;

    fn set_name(&self, object: &Identity, name: &str) -> std::result::Result<(), vk::Result>;

    fn restore_state(
        &self,
        object: &Identity,
        state: &ObjectState,
    ) -> std::result::Result<(), vk::Result>;

    fn replay_command(
        &self,
        command_buffer: &Identity,
        cmd: &Command,
    ) -> std::result::Result<(), vk::Result>;
}

/// Allocates fresh handles and mirrors every call into its own `StateTracker`.
pub struct ShadowDevice {
    tracker: StateTracker,
    next_handle: AtomicU64,
    failing: Mutex<HashSet<ObjectKind>>,
}

impl Default for ShadowDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl ShadowDevice {
    pub fn new() -> Self {
        Self::with_first_handle(0x1000_0000)
    }

    pub fn with_first_handle(first: u64) -> Self {
        Self {
            tracker: StateTracker::new(),
            next_handle: AtomicU64::new(first),
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    /// Create the instance a restore is applied against.
    pub fn create_root(&self, info: InstanceInfo) -> Result<Identity> {
        let id = Identity::root(ObjectKind::Instance, self.allocate());
        self.tracker.on_create(None, id, CreateInfo::Instance(info))?;
        Ok(id)
    }

    /// Make every later construction of `kind` fail.
    pub fn fail_creation_of(&self, kind: ObjectKind) {
        self.failing.lock().insert(kind);
    }

    fn allocate(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }
}

impl NativeApi for ShadowDevice {
    fn create_object(
        &self,
        parent: Option<&Identity>,
        info: &CreateInfo,
    ) -> std::result::Result<Identity, vk::Result> {
        let kind = info.kind();
        if self.failing.lock().contains(&kind) {
            return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        }
        let handle = self.allocate();
        let id = match parent {
            Some(p) => Identity::child_of(kind, handle, p),
            None => Identity::root(kind, handle),
        };
        self.tracker
            .on_create(parent.copied(), id, info.clone())
            .map_err(|e| {
                debug!("shadow create of {} failed: {}", id, e);
                vk::Result::ERROR_INITIALIZATION_FAILED
            })?;
        Ok(id)
    }

    fn bind(&self, object: &Identity, binding: &Binding) -> std::result::Result<(), vk::Result> {
        self.tracker
            .on_bind(object, binding.clone())
            .map_err(|_| vk::Result::ERROR_UNKNOWN)
    }

    fn set_name(&self, object: &Identity, name: &str) -> std::result::Result<(), vk::Result> {
        self.tracker
            .on_rename(object, name)
            .map_err(|_| vk::Result::ERROR_UNKNOWN)
    }

    fn restore_state(
        &self,
        object: &Identity,
        state: &ObjectState,
    ) -> std::result::Result<(), vk::Result> {
        self.tracker
            .on_set_state(object, state.clone())
            .map_err(|_| vk::Result::ERROR_UNKNOWN)
    }

    fn replay_command(
        &self,
        command_buffer: &Identity,
        cmd: &Command,
    ) -> std::result::Result<(), vk::Result> {
        self.tracker
            .on_record(command_buffer, cmd.clone())
            .map_err(|e| {
                debug!("shadow replay on {} failed: {}", command_buffer, e);
                vk::Result::ERROR_UNKNOWN
            })
    }
}
