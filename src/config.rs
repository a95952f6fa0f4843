//! Restore-point configuration and builder.
//!
//! Recognized options:
//! - path: restore-point root (destination for the creator, source for the applier).
//! - write_info / write_json / write_commands: which files the creator emits.
//! - processed: optional hook invoked once per restored object with
//!   (captured identity, restored identity).
//!
//! `RestorePointConfig::from_env()` reads:
//! - VKR_RESTORE_POINT_PATH (default "restore_point")
//! - VKR_RESTORE_POINT_INFO (default on)
//! - VKR_RESTORE_POINT_JSON (default off)
//! - VKR_RESTORE_POINT_COMMANDS (default on)
//! Boolean values: "1|true|yes|on" => true, anything else => false.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::object::Identity;

/// Hook fired by the applier after each object is restored.
pub type ProcessedHook = Arc<dyn Fn(&Identity, &Identity) + Send + Sync>;

#[derive(Clone)]
pub struct RestorePointConfig {
    /// Env: VKR_RESTORE_POINT_PATH
    pub path: PathBuf,

    /// Write binary `.info` records. Env: VKR_RESTORE_POINT_INFO
    pub write_info: bool,

    /// Write `.json` / `.cmds.json` sidecars. Env: VKR_RESTORE_POINT_JSON
    pub write_json: bool,

    /// Write `.cmds` operation streams. Env: VKR_RESTORE_POINT_COMMANDS
    pub write_commands: bool,

    pub processed: Option<ProcessedHook>,
}

impl Default for RestorePointConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("restore_point"),
            write_info: true,
            write_json: false,
            write_commands: true,
            processed: None,
        }
    }
}

fn truthy(v: &str) -> bool {
    let s = v.trim().to_ascii_lowercase();
    s == "1" || s == "true" || s == "yes" || s == "on"
}

impl RestorePointConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("VKR_RESTORE_POINT_PATH") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.path = PathBuf::from(s);
            }
        }
        if let Ok(v) = std::env::var("VKR_RESTORE_POINT_INFO") {
            cfg.write_info = truthy(&v);
        }
        if let Ok(v) = std::env::var("VKR_RESTORE_POINT_JSON") {
            cfg.write_json = truthy(&v);
        }
        if let Ok(v) = std::env::var("VKR_RESTORE_POINT_COMMANDS") {
            cfg.write_commands = truthy(&v);
        }

        cfg
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_info(mut self, on: bool) -> Self {
        self.write_info = on;
        self
    }

    pub fn with_json(mut self, on: bool) -> Self {
        self.write_json = on;
        self
    }

    pub fn with_commands(mut self, on: bool) -> Self {
        self.write_commands = on;
        self
    }

    pub fn with_processed<F>(mut self, f: F) -> Self
    where
        F: Fn(&Identity, &Identity) + Send + Sync + 'static,
    {
        self.processed = Some(Arc::new(f));
        self
    }

    pub fn builder() -> RestorePointBuilder {
        RestorePointBuilder::new()
    }

    pub(crate) fn notify_processed(&self, captured: &Identity, restored: &Identity) {
        if let Some(hook) = &self.processed {
            hook(captured, restored);
        }
    }
}

impl fmt::Debug for RestorePointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestorePointConfig")
            .field("path", &self.path)
            .field("write_info", &self.write_info)
            .field("write_json", &self.write_json)
            .field("write_commands", &self.write_commands)
            .field("processed", &self.processed.as_ref().map(|_| "<hook>"))
            .finish()
    }
}

impl fmt::Display for RestorePointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RestorePointConfig {{ \
             path: {}, \
             write_info: {}, \
             write_json: {}, \
             write_commands: {}, \
             processed: {} \
             }}",
            self.path.display(),
            self.write_info,
            self.write_json,
            self.write_commands,
            if self.processed.is_some() { "set" } else { "none" },
        )
    }
}

/// Builder that starts from the environment and allows overrides.
#[derive(Clone, Debug)]
pub struct RestorePointBuilder {
    cfg: RestorePointConfig,
}

impl Default for RestorePointBuilder {
    fn default() -> Self {
        Self {
            cfg: RestorePointConfig::from_env(),
        }
    }
}

impl RestorePointBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a clean default (without reading env).
    pub fn from_default() -> Self {
        Self {
            cfg: RestorePointConfig::default(),
        }
    }

    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cfg.path = path.into();
        self
    }

    pub fn info(mut self, on: bool) -> Self {
        self.cfg.write_info = on;
        self
    }

    pub fn json(mut self, on: bool) -> Self {
        self.cfg.write_json = on;
        self
    }

    pub fn commands(mut self, on: bool) -> Self {
        self.cfg.write_commands = on;
        self
    }

    pub fn processed<F>(mut self, f: F) -> Self
    where
        F: Fn(&Identity, &Identity) + Send + Sync + 'static,
    {
        self.cfg.processed = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> RestorePointConfig {
        self.cfg
    }
}
