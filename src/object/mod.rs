//! Object model: identities, kinds, construction parameters, bindings and observable state.
//!
//! Identity = `{kind, handle, dispatchable}`:
//! - dispatchable kinds (instance, physical device, device, queue, command buffer) carry
//!   their own handle in `dispatchable`;
//! - every other kind carries the handle of the context it was created against, because
//!   its native handle is only unique within that context.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::codec::{ByteReader, ByteWriter, Decode, Describe, Encode, Handles};
use crate::error::{Error, Result};

pub mod binding;
pub mod create_info;
pub mod extension;
pub mod kind;
pub mod state;
pub mod types;

pub use binding::{Binding, DescriptorBuffer, DescriptorImage, DescriptorWrite, MemoryBinding};
pub use create_info::*;
pub use extension::{Extension, ExtensionBody, Next};
pub use kind::{CreateInfo, ObjectKind};
pub use state::{ImageLayouts, MappedRange, ObjectState, StateUpdate};
pub use types::{
    ComponentMapping, Extent2D, Extent3D, Offset2D, Offset3D, Rect2D, SubresourceLayers,
    SubresourceRange,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    pub kind: ObjectKind,
    pub handle: u64,
    pub dispatchable: u64,
}

impl Identity {
    pub fn new(kind: ObjectKind, handle: u64, dispatchable: u64) -> Self {
        Self {
            kind,
            handle,
            dispatchable,
        }
    }

    /// Identity of an object created against `context`.
    pub fn child_of(kind: ObjectKind, handle: u64, context: &Identity) -> Self {
        let dispatchable = if kind.is_dispatchable() {
            handle
        } else {
            context.dispatchable
        };
        Self::new(kind, handle, dispatchable)
    }

    /// Identity of a root object (an instance).
    pub fn root(kind: ObjectKind, handle: u64) -> Self {
        Self::new(kind, handle, handle)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_dispatchable() {
            write!(f, "{} {:#x}", self.kind, self.handle)
        } else {
            write!(f, "{} {:#x} (of {:#x})", self.kind, self.handle, self.dispatchable)
        }
    }
}

// [kind tag u32][handle u64][dispatchable u64]
impl Encode for Identity {
    fn encode(&self, w: &mut ByteWriter) {
        w.put_u32(self.kind.tag());
        w.put_u64(self.handle);
        w.put_u64(self.dispatchable);
    }
}

impl Decode for Identity {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        let at = r.position();
        let tag = r.u32()?;
        let kind = ObjectKind::from_tag(tag)
            .ok_or_else(|| Error::corrupt(format!("unknown identity kind {} at offset {}", tag, at)))?;
        Ok(Identity {
            kind,
            handle: r.u64()?,
            dispatchable: r.u64()?,
        })
    }
}

impl Describe for Identity {
    fn describe(&self) -> Value {
        serde_json::json!({
            "kind": self.kind.name(),
            "handle": format!("{:#x}", self.handle),
            "dispatchable": format!("{:#x}", self.dispatchable),
        })
    }
}

impl Handles for Identity {
    fn visit_handles(&self, f: &mut dyn FnMut(&Identity)) {
        f(self)
    }

    fn remap_handles(&mut self, f: &mut dyn FnMut(&mut Identity) -> Result<()>) -> Result<()> {
        f(self)
    }
}

/// Lifecycle status of a control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Active,
    Destroyed,
}

impl Encode for Status {
    fn encode(&self, w: &mut ByteWriter) {
        w.put_u8(match self {
            Status::Active => 0,
            Status::Destroyed => 1,
        });
    }
}

impl Decode for Status {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        match r.u8()? {
            0 => Ok(Status::Active),
            1 => Ok(Status::Destroyed),
            v => Err(Error::corrupt(format!("bad status byte {}", v))),
        }
    }
}

impl Describe for Status {
    fn describe(&self) -> Value {
        Value::String(format!("{:?}", self))
    }
}

impl Handles for Status {
    fn visit_handles(&self, _f: &mut dyn FnMut(&Identity)) {}

    fn remap_handles(&mut self, _f: &mut dyn FnMut(&mut Identity) -> Result<()>) -> Result<()> {
        Ok(())
    }
}
