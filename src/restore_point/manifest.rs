//! Restore-point manifest (`<root>/manifest.json`).
//!
//! - version: format version (1)
//! - root: captured root identity (an instance)
//! - created_unix_ms: creation time
//! - objects: identities in the order their records were written (dependency-first)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};
use crate::object::Identity;

use super::{read_file, write_file};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub root: Identity,
    pub created_unix_ms: u64,
    pub objects: Vec<Identity>,
}

impl Manifest {
    pub fn new(root: Identity, objects: Vec<Identity>) -> Self {
        Self {
            version: MANIFEST_VERSION,
            root,
            created_unix_ms: now_unix_ms(),
            objects,
        }
    }
}

pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(MANIFEST_FILE)
}

pub fn write_manifest(root: &Path, m: &Manifest) -> Result<PathBuf> {
    let path = manifest_path(root);
    let json = serde_json::to_vec_pretty(m)
        .map_err(|e| Error::corrupt(format!("serialize manifest: {}", e)))?;
    write_file(&path, &json)?;
    Ok(path)
}

/// `Ok(None)` when the restore point carries no manifest.
pub fn read_manifest(root: &Path) -> Result<Option<Manifest>> {
    let path = manifest_path(root);
    let Some(bytes) = read_file(&path)? else {
        return Ok(None);
    };
    let m: Manifest = serde_json::from_slice(&bytes)
        .map_err(|e| Error::corrupt(format!("parse {}: {}", path.display(), e)))?;
    if m.version != MANIFEST_VERSION {
        return Err(Error::corrupt(format!(
            "unsupported manifest version {} (expected {})",
            m.version, MANIFEST_VERSION
        )));
    }
    Ok(Some(m))
}

fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
