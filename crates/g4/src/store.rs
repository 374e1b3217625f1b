//! Enabled-state store
//!
//! The durable list of plugin directory ids that should run at startup. The
//! registry only talks to the [`EnabledStore`] trait; [`JsonFileStore`] keeps
//! the list as a JSON array on disk and [`MemoryStore`] keeps it in memory.

use std::path::{Path, PathBuf};

/// Errors reading or writing the enabled list.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid enabled-plugin list at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Key-set of enabled plugin ids.
pub trait EnabledStore {
    /// Enabled ids, in the order they were enabled.
    fn enabled(&self) -> Result<Vec<String>, StoreError>;

    fn is_enabled(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.enabled()?.iter().any(|enabled| enabled == id))
    }

    /// Add or remove `id`. Adding a present id or removing an absent one is a no-op.
    fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<(), StoreError>;
}

fn apply(ids: &mut Vec<String>, id: &str, enabled: bool) -> bool {
    let position = ids.iter().position(|existing| existing == id);
    match (enabled, position) {
        (true, None) => {
            ids.push(id.to_string());
            true
        }
        (false, Some(index)) => {
            ids.remove(index);
            true
        }
        _ => false,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// JSON file
// ─────────────────────────────────────────────────────────────────────────────

/// Enabled list stored as a JSON array of ids, e.g. `["clock", "weather"]`.
///
/// A missing file reads as an empty list. Every call goes to disk, so the
/// file stays the source of truth across registry reloads and processes.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, ids: &[String]) -> Result<(), StoreError> {
        let io_error = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty() && !p.exists()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }

        let content = serde_json::to_string_pretty(ids).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, content).map_err(io_error)
    }
}

impl EnabledStore for JsonFileStore {
    fn enabled(&self) -> Result<Vec<String>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<(), StoreError> {
        let mut ids = self.enabled()?;
        if apply(&mut ids, id, enabled) {
            self.write(&ids)?;
            tracing::debug!(plugin = %id, enabled, path = %self.path.display(), "Updated enabled plugins");
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In memory
// ─────────────────────────────────────────────────────────────────────────────

/// Enabled list held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    ids: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut store = Self::new();
        for id in ids {
            apply(&mut store.ids, &id.into(), true);
        }
        store
    }
}

impl EnabledStore for MemoryStore {
    fn enabled(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.ids.clone())
    }

    fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<(), StoreError> {
        apply(&mut self.ids, id, enabled);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let store = JsonFileStore::new("/nonexistent/path/enabled.json");
        assert!(store.enabled().unwrap().is_empty());
        assert!(!store.is_enabled("anything").unwrap());
    }

    #[test]
    fn test_enable_disable_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("enabled.json");

        let mut store = JsonFileStore::new(&path);
        store.set_enabled("clock", true).unwrap();
        store.set_enabled("weather", true).unwrap();
        store.set_enabled("clock", true).unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.enabled().unwrap(), vec!["clock", "weather"]);

        store.set_enabled("clock", false).unwrap();
        store.set_enabled("missing", false).unwrap();
        assert_eq!(reopened.enabled().unwrap(), vec!["weather"]);
    }

    #[test]
    fn test_file_format_is_json_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("enabled.json");

        let mut store = JsonFileStore::new(&path);
        store.set_enabled("clock", true).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!(["clock"]));
    }

    #[test]
    fn test_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/state/enabled.json");

        let mut store = JsonFileStore::new(&path);
        store.set_enabled("clock", true).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("enabled.json");
        std::fs::write(&path, "{ not a list").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.enabled(), Err(StoreError::Parse { .. })));
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::with_enabled(["a", "b", "a"]);
        assert_eq!(store.enabled().unwrap(), vec!["a", "b"]);

        store.set_enabled("a", false).unwrap();
        assert!(!store.is_enabled("a").unwrap());
        assert!(store.is_enabled("b").unwrap());
    }
}
