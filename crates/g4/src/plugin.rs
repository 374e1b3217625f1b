//! Plugin record
//!
//! A `Plugin` is the runtime unit the registry owns: identity, manifest,
//! console history and, while running, its sandbox. Run state is derived
//! from whether a sandbox is attached, so a stopped plugin cannot hold
//! handlers or any other engine state.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use g4_js_runtime::{DebugLog, DebugMessage, HandlerRegistration, Sandbox};

use crate::manifest::PluginManifest;
use crate::snapshot::PluginSnapshot;

/// Plugin lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum RunState {
    Stopped,
    Running,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => f.write_str("stopped"),
            Self::Running => f.write_str("running"),
        }
    }
}

pub struct Plugin {
    /// Bundle directory name; the only key used to address the plugin
    id: String,
    bundle_dir: PathBuf,
    manifest: PluginManifest,
    console: DebugLog,
    sandbox: Option<Sandbox>,
}

impl Plugin {
    /// Create a stopped plugin.
    pub fn new(id: impl Into<String>, bundle_dir: impl Into<PathBuf>, manifest: PluginManifest) -> Self {
        let id = id.into();
        Self {
            console: DebugLog::new(id.clone()),
            id,
            bundle_dir: bundle_dir.into(),
            manifest,
            sandbox: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn bundle_dir(&self) -> &Path {
        &self.bundle_dir
    }

    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    pub fn script_path(&self) -> PathBuf {
        self.bundle_dir.join(&self.manifest.script_entry)
    }

    pub fn icon_path(&self) -> PathBuf {
        self.bundle_dir.join(&self.manifest.icon)
    }

    pub fn run_state(&self) -> RunState {
        if self.sandbox.is_some() {
            RunState::Running
        } else {
            RunState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.sandbox.is_some()
    }

    pub fn console(&self) -> &DebugLog {
        &self.console
    }

    pub fn debug_messages(&self) -> Vec<DebugMessage> {
        self.console.messages()
    }

    /// Listeners registered by the running script; empty when stopped.
    pub fn event_handlers(&self) -> Vec<HandlerRegistration> {
        self.sandbox
            .as_ref()
            .map(Sandbox::registrations)
            .unwrap_or_default()
    }

    pub fn handler_count(&self) -> usize {
        self.sandbox.as_ref().map_or(0, Sandbox::handler_count)
    }

    pub fn snapshot(&self) -> PluginSnapshot {
        PluginSnapshot {
            id: self.id.clone(),
            name: self.manifest.name.clone(),
            author: self.manifest.author.clone(),
            description: self.manifest.description.clone(),
            icon: self.icon_path().display().to_string(),
            version: self.manifest.version.clone(),
            run_state: self.run_state(),
            handler_count: self.handler_count(),
            debug_messages: self.debug_messages(),
        }
    }

    pub(crate) fn sandbox(&self) -> Option<&Sandbox> {
        self.sandbox.as_ref()
    }

    pub(crate) fn attach(&mut self, sandbox: Sandbox) {
        self.sandbox = Some(sandbox);
    }

    pub(crate) fn detach(&mut self) -> Option<Sandbox> {
        self.sandbox.take()
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("id", &self.id)
            .field("bundle_dir", &self.bundle_dir)
            .field("manifest", &self.manifest)
            .field("run_state", &self.run_state())
            .field("messages", &self.console.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> PluginManifest {
        PluginManifest {
            name: "Clock".into(),
            author: String::new(),
            description: String::new(),
            icon: "icon.png".into(),
            version: "1.0".into(),
            script_entry: "src/main.js".into(),
        }
    }

    #[test]
    fn test_new_plugin_is_stopped_and_empty() {
        let plugin = Plugin::new("clock", "/plugins/clock", manifest());
        assert_eq!(plugin.run_state(), RunState::Stopped);
        assert!(plugin.event_handlers().is_empty());
        assert!(plugin.debug_messages().is_empty());
        assert_eq!(plugin.console().plugin_id(), "clock");
    }

    #[test]
    fn test_paths_resolve_inside_bundle() {
        let plugin = Plugin::new("clock", "/plugins/clock", manifest());
        assert_eq!(plugin.script_path(), PathBuf::from("/plugins/clock/src/main.js"));
        assert_eq!(plugin.icon_path(), PathBuf::from("/plugins/clock/icon.png"));
    }

    #[test]
    fn test_snapshot_mirrors_plugin() {
        let plugin = Plugin::new("clock", "/plugins/clock", manifest());
        let snapshot = plugin.snapshot();
        assert_eq!(snapshot.id, "clock");
        assert_eq!(snapshot.name, "Clock");
        assert_eq!(snapshot.run_state, RunState::Stopped);
        assert_eq!(snapshot.handler_count, 0);
    }
}
