//! Restore points: persist the live object graph and rebuild it against a fresh context.
//!
//! Directory layout (one capture = one tree):
//!   <root>/manifest.json                          root identity + write order
//!   <root>/<ObjectKindName>/<hex(handle)>.info    framed binary ObjectRecord
//!   <root>/<ObjectKindName>/<hex(handle)>.json    same record, enums by name (optional)
//!   <root>/VkCommandBuffer/<hex(handle)>.cmds     [tag][payload]... operation stream
//!   <root>/VkCommandBuffer/<hex(handle)>.cmds.json
//!
//! Files are written to a `.tmp` sibling and renamed into place.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::object::Identity;

pub mod applier;
pub mod creator;
pub mod manifest;
pub mod native;
pub mod record;

pub use applier::{apply, apply_ex, ApplyMode, ApplySummary, RestorePointApplier};
pub use creator::{create, CreateSummary, RestorePointCreator};
pub use manifest::{Manifest, MANIFEST_FILE, MANIFEST_VERSION};
pub use native::{NativeApi, ShadowDevice};
pub use record::{ObjectRecord, INFO_MAGIC};

// ----- Paths -----

pub fn kind_dir(root: &Path, id: &Identity) -> PathBuf {
    root.join(id.kind.name())
}

fn file_stem(id: &Identity) -> String {
    format!("{:x}", id.handle)
}

pub fn info_path(root: &Path, id: &Identity) -> PathBuf {
    kind_dir(root, id).join(format!("{}.info", file_stem(id)))
}

pub fn json_path(root: &Path, id: &Identity) -> PathBuf {
    kind_dir(root, id).join(format!("{}.json", file_stem(id)))
}

pub fn cmds_path(root: &Path, id: &Identity) -> PathBuf {
    kind_dir(root, id).join(format!("{}.cmds", file_stem(id)))
}

pub fn cmds_json_path(root: &Path, id: &Identity) -> PathBuf {
    kind_dir(root, id).join(format!("{}.cmds.json", file_stem(id)))
}

// ----- IO -----

pub(crate) fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        }
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);
    {
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)
            .map_err(|e| Error::io(&tmp, e))?;
        f.write_all(bytes).map_err(|e| Error::io(&tmp, e))?;
        f.flush().map_err(|e| Error::io(&tmp, e))?;
    }
    fs::rename(&tmp, path).map_err(|e| Error::io(path, e))?;
    Ok(())
}

/// Read a whole file; `Ok(None)` when it does not exist.
pub(crate) fn read_file(path: &Path) -> Result<Option<Vec<u8>>> {
    let mut f = match OpenOptions::new().read(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io(path, e)),
    };
    let mut buf = Vec::new();
    f.read_to_end(&mut buf).map_err(|e| Error::io(path, e))?;
    Ok(Some(buf))
}

pub(crate) fn to_pretty_json(v: &serde_json::Value) -> Vec<u8> {
    // serializing a Value cannot fail
    serde_json::to_vec_pretty(v).unwrap_or_default()
}
