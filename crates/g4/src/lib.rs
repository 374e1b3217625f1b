//! G4 - Sandboxed plugin runtime
//!
//! This crate hosts untrusted JavaScript plugin bundles, including:
//! - Manifest loading and bundle discovery
//! - Start/stop of plugin scripts in isolated QuickJS sandboxes
//! - Event delivery to the handlers plugins register
//! - A registry that persists which plugins are enabled

// Re-export the sandbox crate
pub use g4_js_runtime;

// Bundle manifests
pub mod manifest;

// Loaded plugins and their render snapshots
pub mod plugin;
pub mod snapshot;

// Script lifecycle
pub mod executor;

// Event delivery
pub mod dispatch;

// Plugin set and enabled state
pub mod registry;
pub mod store;

// Host configuration
pub mod config;

pub mod error;

pub use config::{ConfigError, HostConfig, CONFIG_FILE};
pub use dispatch::{dispatch, DispatchReport};
pub use error::{PluginError, Result};
pub use executor::SandboxedExecutor;
pub use manifest::{load_manifest, PluginManifest, MANIFEST_FILE};
pub use plugin::{Plugin, RunState};
pub use registry::PluginRegistry;
pub use snapshot::PluginSnapshot;
pub use store::{EnabledStore, JsonFileStore, MemoryStore, StoreError};
