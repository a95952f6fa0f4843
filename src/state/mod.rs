//! Live object graph.
//!
//! - `ControlBlock`: one per live object (status, construction snapshot, bindings, observable
//!   state, child trackers, recorded operations for command buffers).
//! - `ObjectTracker`: the children of one kind a parent owns.
//! - `StateTracker`: the registry of control blocks keyed by identity plus the root tracker of
//!   instances; the notification entry points and graph queries live here.
//!
//! Edges are never stored. A node's dependencies are recomputed from its fields on every
//! traversal: owners, handles embedded in the construction parameters, binding targets.

mod control_block;
mod layout;
mod object_tracker;
mod tracker;

pub use control_block::{ControlBlock, ObjectRef};
pub use object_tracker::ObjectTracker;
pub use tracker::StateTracker;
