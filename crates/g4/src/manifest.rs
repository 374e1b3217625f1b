// Manifest Loader - Reads and validates a plugin bundle's manifest.json

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{PluginError, Result};

/// Default manifest file name inside a bundle directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Plugin manifest (plugins/*/manifest.json)
///
/// ```json
/// {
///     "name": "Clock",
///     "author": "someone",
///     "description": "Logs every tick",
///     "icon": "icon.png",
///     "version": "1.0",
///     "script": "main.js"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PluginManifest {
    /// Display name, free to change between versions
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    /// Icon path relative to the bundle directory
    #[serde(default)]
    pub icon: String,
    /// Opaque version string
    #[serde(default)]
    pub version: String,
    /// Script path relative to the bundle directory
    #[serde(rename = "script")]
    pub script_entry: String,
}

/// Load the manifest of the bundle at `bundle_dir`.
///
/// Returns [`PluginError::ManifestMissing`] when the directory has no
/// manifest file, which means it is not a plugin bundle at all.
pub fn load_manifest(bundle_dir: &Path, file_name: &str) -> Result<PluginManifest> {
    let path = bundle_dir.join(file_name);
    if !path.is_file() {
        return Err(PluginError::ManifestMissing(path));
    }

    let malformed = |reason: String| PluginError::ManifestMalformed {
        path: path.clone(),
        reason,
    };

    let content = std::fs::read_to_string(&path).map_err(|e| malformed(e.to_string()))?;
    let manifest: PluginManifest =
        serde_json::from_str(&content).map_err(|e| malformed(e.to_string()))?;

    if manifest.name.trim().is_empty() {
        return Err(malformed("`name` must not be empty".to_string()));
    }
    if manifest.script_entry.trim().is_empty() {
        return Err(malformed("`script` must not be empty".to_string()));
    }
    if !is_inside_bundle(Path::new(&manifest.script_entry)) {
        return Err(malformed(format!(
            "`script` must be a relative path inside the bundle, got {:?}",
            manifest.script_entry
        )));
    }

    Ok(manifest)
}

fn is_inside_bundle(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn bundle(manifest: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(MANIFEST_FILE), manifest).unwrap();
        temp
    }

    #[test]
    fn test_missing_manifest() {
        let temp = TempDir::new().unwrap();
        let err = load_manifest(temp.path(), MANIFEST_FILE).unwrap_err();
        assert!(matches!(err, PluginError::ManifestMissing(_)));
    }

    #[test]
    fn test_full_manifest() {
        let temp = bundle(
            r#"{
                "name": "Clock",
                "author": "g4",
                "description": "Logs every tick",
                "icon": "icon.png",
                "version": "1.2",
                "script": "src/main.js",
                "homepage": "ignored"
            }"#,
        );

        let manifest = load_manifest(temp.path(), MANIFEST_FILE).unwrap();
        assert_eq!(manifest.name, "Clock");
        assert_eq!(manifest.author, "g4");
        assert_eq!(manifest.icon, "icon.png");
        assert_eq!(manifest.version, "1.2");
        assert_eq!(manifest.script_entry, "src/main.js");
    }

    #[test]
    fn test_optional_fields_default_to_empty() {
        let temp = bundle(r#"{ "name": "Bare", "script": "main.js" }"#);
        let manifest = load_manifest(temp.path(), MANIFEST_FILE).unwrap();
        assert!(manifest.author.is_empty());
        assert!(manifest.description.is_empty());
        assert!(manifest.version.is_empty());
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let temp = bundle("{ invalid json }");
        let err = load_manifest(temp.path(), MANIFEST_FILE).unwrap_err();
        assert!(matches!(err, PluginError::ManifestMalformed { .. }));
    }

    #[test]
    fn test_required_fields() {
        for manifest in [
            r#"{ "script": "main.js" }"#,
            r#"{ "name": "No script" }"#,
            r#"{ "name": "  ", "script": "main.js" }"#,
            r#"{ "name": "Empty script", "script": "" }"#,
        ] {
            let temp = bundle(manifest);
            let err = load_manifest(temp.path(), MANIFEST_FILE).unwrap_err();
            assert!(
                matches!(err, PluginError::ManifestMalformed { .. }),
                "{manifest} should be rejected"
            );
        }
    }

    #[test]
    fn test_script_must_stay_inside_bundle() {
        for script in ["../outside.js", "/etc/passwd", "lib/../../up.js"] {
            let temp = bundle(&format!(r#"{{ "name": "Escape", "script": "{script}" }}"#));
            let err = load_manifest(temp.path(), MANIFEST_FILE).unwrap_err();
            assert!(matches!(err, PluginError::ManifestMalformed { .. }));
        }
    }

    #[test]
    fn test_custom_manifest_file_name() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("plugin.json"),
            r#"{ "name": "Custom", "script": "main.js" }"#,
        )
        .unwrap();

        assert!(load_manifest(temp.path(), MANIFEST_FILE).is_err());
        assert_eq!(load_manifest(temp.path(), "plugin.json").unwrap().name, "Custom");
    }
}
