//! Restore-point creator: dependency-first walk of the live graph, one record per object.
//!
//! `process(id)`:
//!   1) already processed -> return (each object is written at most once);
//!   2) process every construction dependency;
//!   3) write this object's record (+ sidecars, + operation stream for command buffers);
//!   4) process binding targets, then every child its trackers own.
//! Step 2 before 3 guarantees a dependency's `.info` exists before any dependent's.
//! The first failure aborts the walk; files already written stay on disk.

use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;

use crate::codec::Describe;
use crate::config::RestorePointConfig;
use crate::error::{Error, Result};
use crate::metrics::{record_command_stream_written, record_record_written};
use crate::object::Identity;
use crate::state::{ObjectRef, StateTracker};

use super::manifest::{write_manifest, Manifest};
use super::record::ObjectRecord;
use super::{cmds_json_path, cmds_path, info_path, json_path, to_pretty_json, write_file};

#[derive(Debug, Clone)]
pub struct CreateSummary {
    pub root: Identity,
    /// Identities in write order.
    pub written: Vec<Identity>,
    pub bytes: u64,
    pub manifest: PathBuf,
}

pub struct RestorePointCreator<'a> {
    tracker: &'a StateTracker,
    config: &'a RestorePointConfig,
    processed: HashSet<Identity>,
    written: Vec<Identity>,
    // .info path -> identity that claimed it, to catch handle collisions across contexts
    paths: HashMap<PathBuf, Identity>,
    bytes: u64,
}

impl<'a> RestorePointCreator<'a> {
    pub fn new(tracker: &'a StateTracker, config: &'a RestorePointConfig) -> Self {
        Self {
            tracker,
            config,
            processed: HashSet::new(),
            written: Vec::new(),
            paths: HashMap::new(),
            bytes: 0,
        }
    }

    /// Write the whole graph reachable from `root`, then the manifest.
    pub fn create(mut self, root: &Identity) -> Result<CreateSummary> {
        let config = self.config;
        let dir = &config.path;
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

        self.process(root)?;

        let manifest = Manifest::new(*root, self.written.clone());
        let manifest_path = write_manifest(dir, &manifest)?;
        info!(
            "restore point {}: {} objects, {} bytes",
            dir.display(),
            self.written.len(),
            self.bytes
        );
        Ok(CreateSummary {
            root: *root,
            written: self.written,
            bytes: self.bytes,
            manifest: manifest_path,
        })
    }

    pub fn process(&mut self, id: &Identity) -> Result<()> {
        self.process_from(id, None)
    }

    pub fn is_processed(&self, id: &Identity) -> bool {
        self.processed.contains(id)
    }

    pub fn written(&self) -> &[Identity] {
        &self.written
    }

    fn process_from(&mut self, id: &Identity, required_by: Option<Identity>) -> Result<()> {
        if !self.processed.insert(*id) {
            return Ok(());
        }
        let r = self
            .tracker
            .get(id)
            .ok_or(Error::MissingDependency {
                dependency: *id,
                required_by,
            })?;

        for dep in r.construction_dependencies() {
            self.process_from(&dep, Some(*id))?;
        }

        self.write(&r)?;

        for target in r.binding_targets() {
            self.process_from(&target, Some(*id))?;
        }
        for tracker in r.children() {
            for child in tracker.identities() {
                self.process_from(&child, Some(*id))?;
            }
        }
        Ok(())
    }

    fn write(&mut self, r: &ObjectRef) -> Result<()> {
        let id = r.id();
        let root = &self.config.path;
        let rec = ObjectRecord::from_control_block(r);

        let path = info_path(root, &id);
        if let Some(other) = self.paths.insert(path.clone(), id) {
            return Err(Error::DuplicateId(format!(
                "{} and {} both map to {}",
                other,
                id,
                path.display()
            )));
        }

        if self.config.write_info {
            let bytes = rec.to_info_bytes();
            write_file(&path, &bytes)?;
            self.bytes += bytes.len() as u64;
            record_record_written(bytes.len());
        }
        if self.config.write_json {
            let json = to_pretty_json(&rec.describe());
            write_file(&json_path(root, &id), &json)?;
            self.bytes += json.len() as u64;
        }

        if let Some(stream) = r.commands() {
            if self.config.write_commands {
                let bytes = stream.encode();
                write_file(&cmds_path(root, &id), &bytes)?;
                self.bytes += bytes.len() as u64;
                record_command_stream_written(bytes.len());
                if self.config.write_json {
                    let json = to_pretty_json(&stream.describe());
                    write_file(&cmds_json_path(root, &id), &json)?;
                    self.bytes += json.len() as u64;
                }
                debug!("operation stream of {}: {} operations", id, stream.len());
            }
        }

        self.written.push(id);
        debug!("wrote {}", id);
        Ok(())
    }
}

/// Capture everything reachable from `root` into `config.path`.
pub fn create(
    tracker: &StateTracker,
    root: &Identity,
    config: &RestorePointConfig,
) -> Result<CreateSummary> {
    RestorePointCreator::new(tracker, config).create(root)
}
