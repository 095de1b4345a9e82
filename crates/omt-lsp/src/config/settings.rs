//! Configuration settings

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use omt_core::DEFAULT_CONFIG_GLOB;

/// Name of the settings file looked up in the workspace root
pub const CONFIG_FILE_NAME: &str = "omt-lsp.toml";

/// Top-level settings structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Document index settings
    pub index: IndexSettings,
    /// Workspace scanning settings
    pub workspace: WorkspaceSettings,
}

impl Settings {
    /// Parse settings from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Load `omt-lsp.toml` from a workspace root.
    ///
    /// A missing file means defaults. A file that cannot be read or parsed is
    /// logged and replaced by defaults.
    pub fn load(root: &Path) -> Self {
        let path = root.join(CONFIG_FILE_NAME);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No {} in {}, using defaults", CONFIG_FILE_NAME, root.display());
                return Self::default();
            }
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match Self::from_toml_str(&text) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Invalid {}, using defaults: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Document index configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Quiet period before an edited document is analysed again
    pub debounce_ms: u64,
}

impl IndexSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

/// Workspace scanning configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceSettings {
    /// Files scanned for `moduleName:` declarations
    pub module_glob: String,
    /// Path alias configuration files
    pub alias_config_glob: String,
    /// Path components excluded from scans
    pub ignore: Vec<String>,
}

impl WorkspaceSettings {
    /// Whether any component of `path` is on the ignore list
    pub fn is_ignored(&self, path: &Path) -> bool {
        path.components().any(|component| {
            let component = component.as_os_str();
            self.ignore.iter().any(|ignored| component == ignored.as_str())
        })
    }
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            module_glob: "**/*.omt".to_string(),
            alias_config_glob: DEFAULT_CONFIG_GLOB.to_string(),
            ignore: vec!["node_modules".to_string()],
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_debounce_duration() {
        assert_eq!(IndexSettings::default().debounce(), Duration::from_millis(300));
    }

    #[test]
    fn test_settings_debug() {
        let settings = Settings::default();
        let debug_str = format!("{:?}", settings);
        assert!(debug_str.contains("Settings"));
    }
}
