//! Restore-point applier: rebuild a captured graph through a `NativeApi`.
//!
//! `restore(id)`:
//!   1) already processed -> return;
//!   2) read `<Kind>/<hex>.info` (absent -> MissingDependency); a record captured after
//!      destruction is only restored when a dependent requires it;
//!   3) restore every listed dependency;
//!   4) translate the parent and every embedded identity through the translation map;
//!   5) construct natively and record captured -> restored in the map;
//!   6) bindings and (command buffers) the operation stream, either right away or, in
//!      two-pass mode, after every shell exists.
//!
//! Observable state goes last in both modes, once every stream has replayed: streams replay
//! in manifest order, and their barriers would otherwise overwrite captured layouts.
//!
//! No rollback: on error the destination is left partially constructed.

use ash::vk;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::codec::{collect_handles, Handles};
use crate::command::CommandStream;
use crate::config::RestorePointConfig;
use crate::error::{Error, Result};
use crate::metrics::{record_object_restored, record_operation_replayed};
use crate::object::{CreateInfo, Identity, ObjectKind, ObjectState, Status};

use super::manifest::read_manifest;
use super::native::NativeApi;
use super::record::ObjectRecord;
use super::{cmds_path, info_path, read_file};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Each object is bound and replayed right after construction.
    Single,
    /// Construct every shell first, then bind and replay in a second pass.
    TwoPass,
}

#[derive(Debug, Clone)]
pub struct ApplySummary {
    pub captured_root: Identity,
    pub new_root: Identity,
    /// (captured, restored) in construction order.
    pub restored: Vec<(Identity, Identity)>,
    /// Records captured after destruction that nothing restored depended on.
    pub skipped: Vec<Identity>,
    pub operations_replayed: usize,
    pub translation: HashMap<Identity, Identity>,
}

pub struct RestorePointApplier<'a, N: NativeApi + ?Sized> {
    native: &'a N,
    config: &'a RestorePointConfig,
    mode: ApplyMode,
    processed: HashSet<Identity>,
    translation: HashMap<Identity, Identity>,
    restored: Vec<(Identity, Identity)>,
    skipped: Vec<Identity>,
    deferred: Vec<ObjectRecord>,
    // (captured, restored, state), applied after every replay
    pending_state: Vec<(Identity, Identity, ObjectState)>,
    replayed: usize,
}

impl<'a, N: NativeApi + ?Sized> RestorePointApplier<'a, N> {
    pub fn new(native: &'a N, config: &'a RestorePointConfig, mode: ApplyMode) -> Self {
        Self {
            native,
            config,
            mode,
            processed: HashSet::new(),
            translation: HashMap::new(),
            restored: Vec::new(),
            skipped: Vec::new(),
            deferred: Vec::new(),
            pending_state: Vec::new(),
            replayed: 0,
        }
    }

    /// Map `captured` onto an object that already exists in the destination.
    pub fn seed(&mut self, captured: Identity, restored: Identity) {
        self.processed.insert(captured);
        self.translation.insert(captured, restored);
    }

    pub fn translation_map(&self) -> &HashMap<Identity, Identity> {
        &self.translation
    }

    pub fn translate(&self, captured: &Identity) -> Option<Identity> {
        self.translation.get(captured).copied()
    }

    /// Restore the whole restore point against `new_root`.
    pub fn apply(mut self, new_root: Identity) -> Result<ApplySummary> {
        let root_dir = self.config.path.clone();
        let (captured_root, order) = load_index(&root_dir)?;
        if captured_root.kind != new_root.kind {
            return Err(Error::corrupt(format!(
                "captured root {} cannot be mapped onto {}",
                captured_root, new_root
            )));
        }
        self.seed(captured_root, new_root);
        self.restore_root(&captured_root, &new_root)?;

        for id in &order {
            self.restore(id)?;
        }
        self.finish_deferred()?;
        self.skipped = order
            .iter()
            .filter(|id| !self.translation.contains_key(*id))
            .copied()
            .collect();

        info!(
            "applied {}: {} objects restored, {} skipped, {} operations replayed",
            root_dir.display(),
            self.restored.len(),
            self.skipped.len(),
            self.replayed
        );
        Ok(ApplySummary {
            captured_root,
            new_root,
            restored: self.restored,
            skipped: self.skipped,
            operations_replayed: self.replayed,
            translation: self.translation,
        })
    }

    /// Restore `id` and, first, everything it depends on.
    ///
    /// Observable state is queued until `finish_deferred`.
    pub fn restore(&mut self, id: &Identity) -> Result<()> {
        self.restore_from(id, None)
    }

    /// Bind and replay every shell still waiting (two-pass mode), then restore the observable
    /// state of everything restored so far.
    pub fn finish_deferred(&mut self) -> Result<()> {
        // finishing may construct more shells (objects only an operation stream names)
        while !self.deferred.is_empty() {
            let batch = std::mem::take(&mut self.deferred);
            for rec in &batch {
                self.finish(rec)?;
            }
        }
        for (id, new_id, state) in std::mem::take(&mut self.pending_state) {
            self.native
                .restore_state(&new_id, &state)
                .map_err(native_err(&id))?;
        }
        Ok(())
    }

    // the root already exists in the destination; carry over its name and state
    fn restore_root(&mut self, captured: &Identity, new_root: &Identity) -> Result<()> {
        let rec = read_record(&self.config.path, captured, None)?;
        if let Some(name) = &rec.name {
            self.native
                .set_name(new_root, name)
                .map_err(native_err(captured))?;
        }
        if !rec.state.is_empty() {
            self.pending_state.push((*captured, *new_root, rec.state));
        }
        Ok(())
    }

    fn restore_from(&mut self, id: &Identity, required_by: Option<Identity>) -> Result<()> {
        if !self.processed.insert(*id) {
            return Ok(());
        }
        let rec = read_record(&self.config.path, id, required_by)?;

        if rec.status == Status::Destroyed {
            match required_by {
                Some(dependent) => {
                    warn!("{} was captured after destruction; restoring it for {}", id, dependent)
                }
                None => {
                    // restored later if a dependent asks for it
                    self.processed.remove(id);
                    return Ok(());
                }
            }
        }
        check_supported(&rec)?;

        for dep in &rec.dependencies {
            self.restore_from(dep, Some(*id))?;
        }

        let parent = match rec.parent {
            Some(p) => Some(self.lookup(&p, id)?),
            None => None,
        };
        let mut info = rec.create_info.clone();
        info.remap_handles(&mut |h| {
            *h = self.lookup(h, id)?;
            Ok(())
        })?;

        let new_id = self
            .native
            .create_object(parent.as_ref(), &info)
            .map_err(|result| Error::NativeCallFailure {
                identity: *id,
                result,
            })?;
        self.translation.insert(*id, new_id);
        self.restored.push((*id, new_id));
        record_object_restored();
        debug!("restored {} as {}", id, new_id);

        if let Some(name) = &rec.name {
            self.native
                .set_name(&new_id, name)
                .map_err(|result| Error::NativeCallFailure {
                    identity: *id,
                    result,
                })?;
        }

        match self.mode {
            ApplyMode::Single => self.finish(&rec),
            ApplyMode::TwoPass => {
                self.deferred.push(rec);
                Ok(())
            }
        }
    }

    fn lookup(&self, captured: &Identity, required_by: &Identity) -> Result<Identity> {
        self.translate(captured).ok_or(Error::MissingDependency {
            dependency: *captured,
            required_by: Some(*required_by),
        })
    }

    // bindings, operation stream; state is queued
    fn finish(&mut self, rec: &ObjectRecord) -> Result<()> {
        let id = rec.identity;
        let new_id = self.lookup(&id, &id)?;

        for binding in &rec.bindings {
            for h in collect_handles(binding) {
                self.restore_from(&h, Some(id))?;
            }
            let mut binding = binding.clone();
            binding.remap_handles(&mut |h| {
                *h = self.lookup(h, &id)?;
                Ok(())
            })?;
            self.native
                .bind(&new_id, &binding)
                .map_err(native_err(&id))?;
        }

        if !rec.state.is_empty() {
            self.pending_state.push((id, new_id, rec.state.clone()));
        }

        if id.kind == ObjectKind::CommandBuffer {
            self.replay(&id, &new_id)?;
        }

        self.config.notify_processed(&id, &new_id);
        Ok(())
    }

    fn replay(&mut self, id: &Identity, new_id: &Identity) -> Result<()> {
        let path = cmds_path(&self.config.path, id);
        let Some(bytes) = read_file(&path)? else {
            debug!("{} has no operation stream", id);
            return Ok(());
        };
        let stream = CommandStream::decode(&bytes)?;

        // objects the stream touches may sit outside the dependency list
        for cmd in stream.iter() {
            for h in collect_handles(cmd) {
                self.restore_from(&h, Some(*id))?;
            }
        }

        for cmd in stream.iter() {
            let mut cmd = cmd.clone();
            cmd.remap_handles(&mut |h| {
                *h = self.lookup(h, id)?;
                Ok(())
            })?;
            self.native
                .replay_command(new_id, &cmd)
                .map_err(native_err(id))?;
            self.replayed += 1;
            record_operation_replayed();
        }
        debug!("replayed {} operations onto {}", stream.len(), new_id);
        Ok(())
    }
}

fn native_err(id: &Identity) -> impl Fn(vk::Result) -> Error + '_ {
    move |result| Error::NativeCallFailure {
        identity: *id,
        result,
    }
}

/// Presentation objects are tied to a window system that a restore cannot recreate.
fn check_supported(rec: &ObjectRecord) -> Result<()> {
    let unsupported = match &rec.create_info {
        CreateInfo::SurfaceKHR(_) | CreateInfo::SwapchainKHR(_) => true,
        CreateInfo::Image(info) => info.swapchain.is_some(),
        _ => false,
    };
    if unsupported {
        return Err(Error::UnsupportedObjectKind {
            kind: rec.identity.kind,
            identity: rec.identity,
        });
    }
    Ok(())
}

fn read_record(root: &Path, id: &Identity, required_by: Option<Identity>) -> Result<ObjectRecord> {
    let path = info_path(root, id);
    let Some(bytes) = read_file(&path)? else {
        return Err(Error::MissingDependency {
            dependency: *id,
            required_by,
        });
    };
    let rec = ObjectRecord::from_info_bytes(&bytes)?;
    if rec.identity != *id || rec.create_info.kind() != id.kind {
        return Err(Error::corrupt(format!(
            "{} holds a record for {} ({}), expected {}",
            path.display(),
            rec.identity,
            rec.create_info.kind(),
            id
        )));
    }
    Ok(rec)
}

/// Captured root and restoration order: from the manifest when present, otherwise from
/// the `.info` files on disk with the single instance record as root.
fn load_index(root: &Path) -> Result<(Identity, Vec<Identity>)> {
    if let Some(m) = read_manifest(root)? {
        return Ok((m.root, m.objects));
    }

    let mut found = Vec::new();
    for kind in ObjectKind::ALL {
        let dir = root.join(kind.name());
        if !dir.is_dir() {
            continue;
        }
        let entries = fs::read_dir(&dir).map_err(|e| Error::io(&dir, e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&dir, e))?;
            let p = entry.path();
            if p.extension().and_then(|s| s.to_str()) == Some("info") {
                paths.push(p);
            }
        }
        paths.sort();
        for p in paths {
            let bytes = read_file(&p)?.ok_or_else(|| Error::NotFound(p.display().to_string()))?;
            let rec = ObjectRecord::from_info_bytes(&bytes)?;
            if rec.identity.kind != *kind {
                return Err(Error::corrupt(format!(
                    "{} holds a {} record",
                    p.display(),
                    rec.identity.kind
                )));
            }
            found.push(rec.identity);
        }
    }

    let mut instances = found.iter().filter(|id| id.kind == ObjectKind::Instance);
    match (instances.next(), instances.next()) {
        (Some(root_id), None) => Ok((*root_id, found.clone())),
        (None, _) => Err(Error::NotFound(format!(
            "instance record under {}",
            root.display()
        ))),
        (Some(_), Some(_)) => Err(Error::corrupt(format!(
            "{} holds several instance records and no manifest",
            root.display()
        ))),
    }
}

/// Restore everything under `config.path` against `new_root`, one object at a time.
pub fn apply<N: NativeApi + ?Sized>(
    native: &N,
    new_root: Identity,
    config: &RestorePointConfig,
) -> Result<ApplySummary> {
    RestorePointApplier::new(native, config, ApplyMode::Single).apply(new_root)
}

/// Like `apply`, but construct every shell before binding, restoring state or replaying.
pub fn apply_ex<N: NativeApi + ?Sized>(
    native: &N,
    new_root: Identity,
    config: &RestorePointConfig,
) -> Result<ApplySummary> {
    RestorePointApplier::new(native, config, ApplyMode::TwoPass).apply(new_root)
}
