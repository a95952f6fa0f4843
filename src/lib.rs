//! vkrestore: live object-graph tracking for a Vulkan-style API, with restore-point capture
//! and replay.
//!
//! Layers, leaves first:
//! - `reference`: shared-ownership registry with weak lookup by id.
//! - `state`: control blocks, object trackers and the `StateTracker` (dependency graph,
//!   sub-resource layouts, recorded operations).
//! - `restore_point`: the creator (graph -> files) and the applier (files -> new objects).
//!
//! Support modules: `object` (identities, kinds, construction parameters), `command`
//! (recorded operations), `codec` (binary/JSON encoding), `config`, `metrics`, `error`.

pub mod codec;
pub mod command;
pub mod config;
pub mod error;
pub mod metrics;
pub mod object;
pub mod reference;
pub mod restore_point;
pub mod state;

pub use command::{Command, CommandStream};
pub use config::{RestorePointBuilder, RestorePointConfig};
pub use error::{Error, Result};
pub use object::{Binding, CreateInfo, Identity, ObjectKind, ObjectState, StateUpdate, Status};
pub use reference::{IdCounter, Reference, Registry};
pub use restore_point::{
    apply, apply_ex, create, ApplyMode, ApplySummary, CreateSummary, NativeApi,
    RestorePointApplier, RestorePointCreator, ShadowDevice,
};
pub use state::{ControlBlock, ObjectRef, ObjectTracker, StateTracker};
