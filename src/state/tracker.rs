//! State tracker: consumes create / destroy / record / bind / rename / update notifications
//! and answers graph queries over the live object set.

use log::{debug, error, warn};
use std::collections::HashSet;

use crate::command::Command;
use crate::error::{Error, Result};
use crate::metrics::{record_object_created, record_object_destroyed, record_operation_recorded};
use crate::object::{
    Binding, CreateInfo, Identity, ImageLayouts, ObjectKind, ObjectState, StateUpdate,
};
use crate::reference::Registry;
use crate::state::{layout, ControlBlock, ObjectRef, ObjectTracker};

pub struct StateTracker {
    registry: Registry<ControlBlock, Identity>,
    instances: ObjectTracker,
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StateTracker {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            instances: ObjectTracker::new(ObjectKind::Instance),
        }
    }

    pub fn registry(&self) -> &Registry<ControlBlock, Identity> {
        &self.registry
    }

    /// Root tracker holding every instance.
    pub fn instances(&self) -> &ObjectTracker {
        &self.instances
    }

    pub fn get(&self, id: &Identity) -> Option<ObjectRef> {
        self.registry.get(id)
    }

    pub fn require(&self, id: &Identity) -> Result<ObjectRef> {
        self.registry.require(id)
    }

    // -------------------- Notifications --------------------

    /// Track a newly created object and link it under its owners.
    pub fn on_create(
        &self,
        parent: Option<Identity>,
        id: Identity,
        info: CreateInfo,
    ) -> Result<ObjectRef> {
        if info.kind() != id.kind {
            return Err(Error::corrupt(format!(
                "construction parameters for {} describe a {}",
                id,
                info.kind()
            )));
        }
        if let CreateInfo::Image(img) = &info {
            if ImageLayouts::cell_count(img.mip_levels, img.array_layers).is_none() {
                return Err(Error::corrupt(format!(
                    "{} declares {} mip levels x {} array layers",
                    id, img.mip_levels, img.array_layers
                )));
            }
        }
        let block = ControlBlock::new(id, parent, info);
        let owners = block.owners();

        // resolve owners before publishing the new block
        let mut trackers = Vec::with_capacity(owners.len());
        for owner in &owners {
            let r = self.registry.get(owner).ok_or(Error::MissingDependency {
                dependency: *owner,
                required_by: Some(id),
            })?;
            trackers.push(r);
        }

        let r = match self.registry.new_ref_with_id(id, block) {
            Ok(r) => r,
            Err(e) => {
                error!("on_create: {} is already tracked: {}", id, e);
                return Err(e);
            }
        };

        if owners.is_empty() {
            self.instances.insert(r.clone());
        }
        for owner in &trackers {
            match owner.child_tracker(id.kind) {
                Some(t) => t.insert(r.clone()),
                None => warn!("{} does not track children of kind {}", owner.identity(), id.kind),
            }
        }

        record_object_created();
        debug!("created {}", id);
        Ok(r)
    }

    /// Mark `id` destroyed, release its children and unlink it from its owners.
    pub fn on_destroy(&self, id: &Identity) -> Result<()> {
        let r = self.registry.require(id)?;
        r.destroy_subtree();

        let owners = r.owners();
        if owners.is_empty() {
            drop(self.instances.erase(id));
        }
        for owner in owners {
            // owner may already be gone when parents are torn down first
            if let Some(o) = self.registry.get(&owner) {
                if let Some(t) = o.child_tracker(id.kind) {
                    drop(t.erase(id));
                }
            }
        }
        record_object_destroyed();
        debug!("destroyed {}", id);
        Ok(())
    }

    /// Append `cmd` to the command buffer's stream and apply its layout side effects.
    ///
    /// The operation is recorded even when its layout effect is rejected; the rejection is
    /// returned to the caller.
    pub fn on_record(&self, command_buffer: &Identity, cmd: Command) -> Result<()> {
        let r = self.registry.require(command_buffer)?;
        let stream = r.command_stream().ok_or_else(|| {
            Error::NotFound(format!("operation stream of {}", command_buffer))
        })?;
        let mut stream = stream.lock();
        if matches!(cmd, Command::BeginCommandBuffer(_)) {
            stream.clear();
        }
        let effect = layout::apply(self, &cmd, &stream);
        stream.push(cmd);
        drop(stream);
        record_operation_recorded();
        if let Err(e) = &effect {
            warn!("{}: {}", command_buffer, e);
        }
        effect
    }

    pub fn on_bind(&self, id: &Identity, binding: Binding) -> Result<()> {
        let r = self.registry.require(id)?;
        r.bind(binding);
        Ok(())
    }

    pub fn on_rename(&self, id: &Identity, name: impl Into<String>) -> Result<()> {
        let r = self.registry.require(id)?;
        r.set_name(name.into());
        Ok(())
    }

    pub fn on_update(&self, id: &Identity, update: StateUpdate) -> Result<()> {
        let r = self.registry.require(id)?;
        r.with_state(|s| match update {
            StateUpdate::Signaled(v) => s.signaled = Some(v),
            StateUpdate::Mapped(range) => s.mapped = range,
        });
        Ok(())
    }

    /// Overwrite the observable state wholesale (used when restoring).
    /// A layout grid must match the image's declared mip levels and array layers.
    pub fn on_set_state(&self, id: &Identity, state: ObjectState) -> Result<()> {
        let r = self.registry.require(id)?;
        if let Some(grid) = &state.image_layouts {
            let invalid = |reason: String| Error::InvalidLayoutTransition { image: *id, reason };
            grid.validate().map_err(invalid)?;
            let CreateInfo::Image(img) = r.create_info() else {
                return Err(invalid(format!("{} carries no layout state", id.kind)));
            };
            if (grid.mip_levels, grid.array_layers) != (img.mip_levels, img.array_layers) {
                return Err(invalid(format!(
                    "grid of {}x{} does not match an image of {}x{}",
                    grid.mip_levels, grid.array_layers, img.mip_levels, img.array_layers
                )));
            }
        }
        r.with_state(|s| *s = state);
        Ok(())
    }

    // -------------------- Queries --------------------

    pub fn enumerate_object<F: FnOnce(&ObjectRef)>(&self, id: &Identity, f: F) -> Result<()> {
        let r = self.registry.require(id)?;
        f(&r);
        Ok(())
    }

    /// Visit `id`, then everything it transitively depends on, each node once.
    /// Dependencies that are no longer tracked are skipped with a warning.
    pub fn enumerate_dependencies<F: FnMut(&ObjectRef)>(&self, id: &Identity, mut f: F) -> Result<()> {
        let r = self.registry.require(id)?;
        let mut visited = HashSet::new();
        self.walk_dependencies(&r, &mut visited, &mut f);
        Ok(())
    }

    pub(crate) fn walk_dependencies(
        &self,
        node: &ObjectRef,
        visited: &mut HashSet<Identity>,
        f: &mut dyn FnMut(&ObjectRef),
    ) {
        if !visited.insert(node.id()) {
            return;
        }
        f(node);
        for dep in node.direct_dependencies() {
            match self.registry.get(&dep) {
                Some(d) => self.walk_dependencies(&d, visited, f),
                None => warn!("{} depends on untracked {}", node.id(), dep),
            }
        }
    }

    /// Visit `id` and every object its child trackers own, recursively, each node once.
    pub fn enumerate_subtree<F: FnMut(&ObjectRef)>(&self, id: &Identity, mut f: F) -> Result<()> {
        let r = self.registry.require(id)?;
        let mut visited = HashSet::new();
        walk_subtree(&r, &mut visited, &mut f);
        Ok(())
    }

    /// Direct dependencies of `id` (see `ControlBlock::direct_dependencies`).
    pub fn dependencies_of(&self, id: &Identity) -> Result<Vec<Identity>> {
        Ok(self.registry.require(id)?.direct_dependencies())
    }
}

fn walk_subtree(node: &ObjectRef, visited: &mut HashSet<Identity>, f: &mut dyn FnMut(&ObjectRef)) {
    if !visited.insert(node.id()) {
        return;
    }
    f(node);
    for tracker in node.children() {
        tracker.enumerate(|child| walk_subtree(child, visited, f));
    }
}

impl std::fmt::Debug for StateTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateTracker")
            .field("objects", &self.registry.len())
            .field("instances", &self.instances.len())
            .finish()
    }
}
