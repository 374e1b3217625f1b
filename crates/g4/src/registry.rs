// Plugin Registry - Owns loaded plugins and their lifecycle
//
// The registry is the only writer of the plugin set. It is mutated by
// load/reload and by the start/stop/delete operations the plugin list calls;
// dispatch borrows it immutably, so a stop can never overlap a delivery.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use g4_js_runtime::HostFeature;

use crate::dispatch::{dispatch, DispatchReport};
use crate::error::{PluginError, Result};
use crate::executor::SandboxedExecutor;
use crate::manifest::{load_manifest, MANIFEST_FILE};
use crate::plugin::Plugin;
use crate::snapshot::PluginSnapshot;
use crate::store::EnabledStore;

/// Registry of plugin bundles under one root directory.
///
/// # Example
///
/// ```rust,ignore
/// let store = JsonFileStore::new("plugins/enabled.json");
/// let mut registry = PluginRegistry::load("plugins", Box::new(store))?;
///
/// registry.set_running("clock")?;
/// registry.dispatch("tick", &serde_json::json!({ "count": 1 }));
/// registry.set_stopped("clock")?;
/// ```
pub struct PluginRegistry {
    bundle_root: PathBuf,
    manifest_file: String,
    store: Box<dyn EnabledStore>,
    executor: SandboxedExecutor,
    plugins: BTreeMap<String, Plugin>,
}

impl PluginRegistry {
    /// Create an empty registry. Nothing is read until [`load_all`](Self::load_all).
    pub fn new(bundle_root: impl Into<PathBuf>, store: Box<dyn EnabledStore>) -> Self {
        Self {
            bundle_root: bundle_root.into(),
            manifest_file: MANIFEST_FILE.to_string(),
            store,
            executor: SandboxedExecutor::default(),
            plugins: BTreeMap::new(),
        }
    }

    /// Create a registry and load every bundle under `bundle_root`.
    pub fn load(bundle_root: impl Into<PathBuf>, store: Box<dyn EnabledStore>) -> Result<Self> {
        let mut registry = Self::new(bundle_root, store);
        registry.load_all()?;
        Ok(registry)
    }

    /// Install `feature` as `hostFeature` in plugins started from now on.
    pub fn with_host_feature(mut self, feature: Rc<dyn HostFeature>) -> Self {
        self.executor = SandboxedExecutor::new(feature);
        self
    }

    pub fn with_manifest_file(mut self, file_name: impl Into<String>) -> Self {
        self.manifest_file = file_name.into();
        self
    }

    pub fn bundle_root(&self) -> &Path {
        &self.bundle_root
    }

    pub fn store(&self) -> &dyn EnabledStore {
        self.store.as_ref()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Loading
    // ─────────────────────────────────────────────────────────────────────────

    /// Discard all in-memory state and load every bundle from scratch.
    ///
    /// Directories without a manifest are not plugins and are skipped
    /// silently; invalid manifests are skipped with a warning. Plugins the
    /// store lists as enabled are started right away.
    pub fn load_all(&mut self) -> Result<Vec<PluginSnapshot>> {
        self.shutdown();
        self.plugins.clear();

        let bundle_dirs = self.bundle_dirs()?;
        let enabled: HashSet<String> = self.store.enabled()?.into_iter().collect();

        for (id, dir) in bundle_dirs {
            let manifest = match load_manifest(&dir, &self.manifest_file) {
                Ok(manifest) => manifest,
                Err(PluginError::ManifestMissing(_)) => {
                    tracing::debug!("Skipping {}: no manifest", dir.display());
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Failed to load plugin at {}: {}", dir.display(), e);
                    continue;
                }
            };

            tracing::debug!(plugin = %id, "Discovered plugin: {} at {}", manifest.name, dir.display());
            let mut plugin = Plugin::new(id.clone(), dir, manifest);

            if enabled.contains(&id) {
                if let Err(e) = self.executor.run(&mut plugin) {
                    tracing::warn!(plugin = %id, "Failed to start enabled plugin: {}", e);
                }
            }

            self.plugins.insert(id, plugin);
        }

        tracing::info!(
            "Loaded {} plugins ({} running) from {}",
            self.plugins.len(),
            self.plugins.values().filter(|p| p.is_running()).count(),
            self.bundle_root.display()
        );

        Ok(self.snapshot())
    }

    /// Same as [`load_all`](Self::load_all) on the current bundle root.
    pub fn reload(&mut self) -> Result<Vec<PluginSnapshot>> {
        tracing::info!("Reloading plugins");
        self.load_all()
    }

    /// Immediate subdirectories of the bundle root, sorted by name.
    fn bundle_dirs(&self) -> Result<Vec<(String, PathBuf)>> {
        let root_error = |source| PluginError::BundleRoot {
            path: self.bundle_root.clone(),
            source,
        };

        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(&self.bundle_root).map_err(root_error)? {
            let path = entry.map_err(root_error)?.path();
            if !path.is_dir() {
                continue;
            }

            match path.file_name().and_then(|name| name.to_str()) {
                Some(id) => dirs.push((id.to_string(), path.clone())),
                None => tracing::warn!("Skipping {}: directory name is not UTF-8", path.display()),
            }
        }

        dirs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(dirs)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Start a plugin and remember it as enabled.
    ///
    /// The store is only updated once the plugin is running, so a plugin
    /// whose script cannot be read stays disabled.
    pub fn set_running(&mut self, id: &str) -> Result<()> {
        let plugin = self
            .plugins
            .get_mut(id)
            .ok_or_else(|| PluginError::PluginNotFound(id.to_string()))?;

        self.executor.run(plugin)?;
        self.store.set_enabled(id, true)?;
        Ok(())
    }

    /// Stop a plugin and remember it as disabled.
    pub fn set_stopped(&mut self, id: &str) -> Result<()> {
        let plugin = self
            .plugins
            .get_mut(id)
            .ok_or_else(|| PluginError::PluginNotFound(id.to_string()))?;

        self.executor.stop(plugin);
        self.store.set_enabled(id, false)?;
        Ok(())
    }

    /// Stop a plugin, forget it and remove its bundle from disk.
    ///
    /// The store is updated first, so a store failure leaves the plugin
    /// untouched. Once the store is updated the plugin is forgotten even if
    /// its bundle cannot be removed.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        if !self.plugins.contains_key(id) {
            return Err(PluginError::PluginNotFound(id.to_string()));
        }

        self.store.set_enabled(id, false)?;

        let Some(mut plugin) = self.plugins.remove(id) else {
            return Err(PluginError::PluginNotFound(id.to_string()));
        };
        self.executor.stop(&mut plugin);

        let bundle_dir = plugin.bundle_dir().to_path_buf();
        std::fs::remove_dir_all(&bundle_dir).map_err(|source| PluginError::BundleRemoval {
            path: bundle_dir.clone(),
            source,
        })?;

        tracing::info!(plugin = %id, "Deleted plugin bundle {}", bundle_dir.display());
        Ok(())
    }

    /// Stop every running plugin without touching the enabled store.
    pub fn shutdown(&mut self) {
        for plugin in self.plugins.values_mut() {
            self.executor.stop(plugin);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries & events
    // ─────────────────────────────────────────────────────────────────────────

    /// Deliver an event to every running plugin.
    pub fn dispatch(&self, event_type: &str, payload: &serde_json::Value) -> DispatchReport {
        dispatch(self.plugins.values(), event_type, payload)
    }

    pub fn get(&self, id: &str) -> Option<&Plugin> {
        self.plugins.get(id)
    }

    pub fn plugins(&self) -> impl Iterator<Item = &Plugin> {
        self.plugins.values()
    }

    /// Render data for every plugin, ordered by id.
    pub fn snapshot(&self) -> Vec<PluginSnapshot> {
        self.plugins.values().map(Plugin::snapshot).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl Drop for PluginRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
