//! Control block: everything the tracker knows about one live object.

use parking_lot::Mutex;
use std::collections::HashSet;

use crate::codec::collect_handles;
use crate::command::CommandStream;
use crate::object::{
    Binding, CreateInfo, FenceInfo, Identity, ImageLayouts, ObjectKind, ObjectState, Status,
};
use crate::reference::Reference;
use crate::state::ObjectTracker;

use ash::vk;

pub type ObjectRef = Reference<ControlBlock, Identity>;

pub struct ControlBlock {
    identity: Identity,
    /// Context the object was created against (`None` for instances).
    parent: Option<Identity>,
    create_info: CreateInfo,
    status: Mutex<Status>,
    name: Mutex<Option<String>>,
    bindings: Mutex<Vec<Binding>>,
    state: Mutex<ObjectState>,
    children: Vec<ObjectTracker>,
    commands: Option<Mutex<CommandStream>>,
}

impl ControlBlock {
    pub fn new(identity: Identity, parent: Option<Identity>, create_info: CreateInfo) -> Self {
        let children = identity
            .kind
            .child_kinds()
            .iter()
            .map(|k| ObjectTracker::new(*k))
            .collect();
        let commands = (identity.kind == ObjectKind::CommandBuffer)
            .then(|| Mutex::new(CommandStream::new()));
        let state = initial_state(&create_info);
        Self {
            identity,
            parent,
            create_info,
            status: Mutex::new(Status::Active),
            name: Mutex::new(None),
            bindings: Mutex::new(Vec::new()),
            state: Mutex::new(state),
            children,
            commands,
        }
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn kind(&self) -> ObjectKind {
        self.identity.kind
    }

    pub fn parent(&self) -> Option<Identity> {
        self.parent
    }

    pub fn create_info(&self) -> &CreateInfo {
        &self.create_info
    }

    pub fn status(&self) -> Status {
        *self.status.lock()
    }

    pub fn is_active(&self) -> bool {
        self.status() == Status::Active
    }

    pub(crate) fn set_status(&self, status: Status) {
        *self.status.lock() = status;
    }

    pub fn name(&self) -> Option<String> {
        self.name.lock().clone()
    }

    pub(crate) fn set_name(&self, name: String) {
        *self.name.lock() = Some(name);
    }

    pub fn bindings(&self) -> Vec<Binding> {
        self.bindings.lock().clone()
    }

    pub(crate) fn bind(&self, binding: Binding) {
        crate::object::binding::upsert(&mut self.bindings.lock(), binding);
    }

    pub fn state(&self) -> ObjectState {
        self.state.lock().clone()
    }

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut ObjectState) -> R) -> R {
        f(&mut self.state.lock())
    }

    pub fn children(&self) -> &[ObjectTracker] {
        &self.children
    }

    pub fn child_tracker(&self, kind: ObjectKind) -> Option<&ObjectTracker> {
        self.children.iter().find(|t| t.kind() == kind)
    }

    /// Copy of the recorded operations; `None` for anything but command buffers.
    pub fn commands(&self) -> Option<CommandStream> {
        self.commands.as_ref().map(|c| c.lock().clone())
    }

    pub(crate) fn command_stream(&self) -> Option<&Mutex<CommandStream>> {
        self.commands.as_ref()
    }

    /// Objects whose child trackers hold this one.
    ///
    /// - instances: none (held by the tracker's root)
    /// - command buffers: their pool; descriptor sets: their pool
    /// - presentable images: the device and the swapchain
    /// - everything else: the context it was created against
    pub fn owners(&self) -> Vec<Identity> {
        let mut out = Vec::with_capacity(2);
        match &self.create_info {
            CreateInfo::Instance(_) => {}
            CreateInfo::CommandBuffer(info) => out.push(info.command_pool),
            CreateInfo::DescriptorSet(info) => out.push(info.descriptor_pool),
            other => {
                out.extend(self.parent);
                out.extend(other.swapchain());
            }
        }
        out
    }

    /// Identities that must exist before this object can be constructed: parent context,
    /// owners, then handles embedded in its construction parameters (extension chains
    /// included). Deduplicated, first occurrence wins.
    pub fn construction_dependencies(&self) -> Vec<Identity> {
        self.dependencies(false)
    }

    /// Construction dependencies followed by binding targets. Children are not dependencies.
    ///
    /// Binding targets may point back at this object (memory dedicated to the image it is
    /// bound to), so only `construction_dependencies` is guaranteed acyclic.
    pub fn direct_dependencies(&self) -> Vec<Identity> {
        self.dependencies(true)
    }

    fn dependencies(&self, with_bindings: bool) -> Vec<Identity> {
        let mut seen = HashSet::new();
        seen.insert(self.identity);
        let mut out = Vec::new();
        let mut push = |id: Identity| {
            if seen.insert(id) {
                out.push(id);
            }
        };
        if let Some(parent) = self.parent {
            push(parent);
        }
        for id in self.owners() {
            push(id);
        }
        for id in collect_handles(&self.create_info) {
            push(id);
        }
        if with_bindings {
            for id in collect_handles(&*self.bindings.lock()) {
                push(id);
            }
        }
        out
    }

    /// Binding targets only.
    pub fn binding_targets(&self) -> Vec<Identity> {
        collect_handles(&*self.bindings.lock())
    }

    /// Flip this node and everything below it to Destroyed and drop the child links.
    pub(crate) fn destroy_subtree(&self) {
        self.set_status(Status::Destroyed);
        for tracker in &self.children {
            for child in tracker.drain() {
                child.destroy_subtree();
            }
        }
    }
}

fn initial_state(info: &CreateInfo) -> ObjectState {
    let mut state = ObjectState::default();
    match info {
        CreateInfo::Fence(FenceInfo { flags }) => {
            state.signaled = Some(flags.contains(vk::FenceCreateFlags::SIGNALED));
        }
        CreateInfo::Semaphore(_) | CreateInfo::Event(_) => state.signaled = Some(false),
        CreateInfo::Image(img) => {
            state.image_layouts =
                ImageLayouts::new(img.mip_levels, img.array_layers, img.initial_layout);
        }
        _ => {}
    }
    state
}

impl std::fmt::Debug for ControlBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlBlock")
            .field("identity", &self.identity)
            .field("status", &self.status())
            .field("name", &self.name())
            .field("children", &self.children.iter().map(|t| t.len()).sum::<usize>())
            .finish()
    }
}
