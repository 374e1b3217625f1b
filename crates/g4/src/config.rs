//! Host Configuration
//!
//! Settings for the `g4` binary, read from `g4.toml`. Every field has a
//! default, so a missing file is the same as an empty one.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::manifest::MANIFEST_FILE;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "g4.toml";

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

/// Host configuration (g4.toml)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Directory holding one subdirectory per plugin bundle
    pub plugins_dir: PathBuf,
    /// JSON file listing enabled plugin ids
    pub state_file: PathBuf,
    pub manifest_file: String,
    /// Period of the built-in `tick` event; no ticks when unset
    pub tick_interval_ms: Option<u64>,
    /// Overrides the default tracing filter
    pub log_filter: Option<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            plugins_dir: PathBuf::from("plugins"),
            state_file: PathBuf::from("plugins").join("enabled.json"),
            manifest_file: MANIFEST_FILE.to_string(),
            tick_interval_ms: None,
            log_filter: None,
        }
    }
}

impl HostConfig {
    /// Load configuration from `path`.
    ///
    /// A missing file yields the defaults. Relative paths are resolved
    /// against the directory containing the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let base = path.parent().unwrap_or_else(|| Path::new(""));

        let mut config = if path.is_file() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str::<HostConfig>(&content)?
        } else {
            HostConfig::default()
        };

        config.plugins_dir = resolve(base, &config.plugins_dir);
        config.state_file = resolve(base, &config.state_file);
        Ok(config)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = HostConfig::load(temp.path().join(CONFIG_FILE)).unwrap();

        assert_eq!(config.plugins_dir, temp.path().join("plugins"));
        assert_eq!(config.state_file, temp.path().join("plugins").join("enabled.json"));
        assert_eq!(config.manifest_file, "manifest.json");
        assert_eq!(config.tick_interval_ms, None);
    }

    #[test]
    fn test_parse_and_resolve() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"
plugins_dir = "bundles"
state_file = "/var/lib/g4/enabled.json"
tick_interval_ms = 500
log_filter = "g4=debug"
"#,
        )
        .unwrap();

        let config = HostConfig::load(&path).unwrap();

        assert_eq!(config.plugins_dir, temp.path().join("bundles"));
        assert_eq!(config.state_file, PathBuf::from("/var/lib/g4/enabled.json"));
        assert_eq!(config.manifest_file, "manifest.json");
        assert_eq!(config.tick_interval_ms, Some(500));
        assert_eq!(config.log_filter.as_deref(), Some("g4=debug"));
    }

    #[test]
    fn test_invalid_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        std::fs::write(&path, "tick_interval_ms = \"soon\"").unwrap();

        assert!(matches!(HostConfig::load(&path), Err(ConfigError::TomlParseError(_))));
    }
}
