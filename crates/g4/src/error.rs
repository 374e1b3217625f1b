//! Error types for plugin loading and lifecycle operations.

use std::path::PathBuf;

use g4_js_runtime::JsError;

use crate::store::StoreError;

/// Errors surfaced to callers of the registry and executor.
///
/// Failures raised by plugin code itself never appear here; they are
/// captured in the plugin's console.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("No plugin manifest at {0}")]
    ManifestMissing(PathBuf),

    #[error("Invalid plugin manifest at {path}: {reason}")]
    ManifestMalformed { path: PathBuf, reason: String },

    #[error("Cannot read plugin script {path}: {source}")]
    ScriptUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    #[error("Cannot read plugin directory {path}: {source}")]
    BundleRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot remove plugin bundle {path}: {source}")]
    BundleRemoval {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Sandbox error: {0}")]
    Sandbox(#[from] JsError),

    #[error("Enabled-state store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, PluginError>;
