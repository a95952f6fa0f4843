//! Error kinds shared by the registry, the state tracker and the restore-point walkers.
//!
//! - DuplicateId / NotFound: registry bookkeeping.
//! - Io / CorruptStream / MissingDependency: restore-point files.
//! - NativeCallFailure / UnsupportedObjectKind: the native seam used by the applier.
//! - InvalidLayoutTransition: sub-resource tracking while recording.

use ash::vk;
use std::path::PathBuf;

use crate::object::{Identity, ObjectKind};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A live registry entry already owns this id.
    #[error("duplicate registry id {0}")]
    DuplicateId(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt stream: {0}")]
    CorruptStream(String),

    #[error("missing dependency {dependency} (required by {required_by:?})")]
    MissingDependency {
        dependency: Identity,
        required_by: Option<Identity>,
    },

    #[error("native call failed for {identity}: {result:?}")]
    NativeCallFailure { identity: Identity, result: vk::Result },

    #[error("restoring {kind} objects is not supported ({identity})")]
    UnsupportedObjectKind { kind: ObjectKind, identity: Identity },

    #[error("invalid layout transition on {image}: {reason}")]
    InvalidLayoutTransition { image: Identity, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Error::CorruptStream(msg.into())
    }

    /// Identity at which the failure happened, when the error names one.
    pub fn identity(&self) -> Option<Identity> {
        match self {
            Error::MissingDependency { dependency, .. } => Some(*dependency),
            Error::NativeCallFailure { identity, .. } => Some(*identity),
            Error::UnsupportedObjectKind { identity, .. } => Some(*identity),
            Error::InvalidLayoutTransition { image, .. } => Some(*image),
            _ => None,
        }
    }
}
