//! TDD Tests for server configuration

use super::*;

// ==================== SETTINGS PARSING TESTS ====================

mod parsing_tests {
    use super::*;

    /// Test 1: Load configuration from TOML
    #[test]
    fn test_load_config_from_toml() {
        let toml = r#"
[index]
debounce_ms = 50

[workspace]
module_glob = "models/**/*.omt"
alias_config_glob = "**/jsconfig.json"
ignore = ["node_modules", "dist"]
"#;

        let settings = Settings::from_toml_str(toml).unwrap();

        assert_eq!(settings.index.debounce_ms, 50);
        assert_eq!(settings.workspace.module_glob, "models/**/*.omt");
        assert_eq!(settings.workspace.alias_config_glob, "**/jsconfig.json");
        assert_eq!(settings.workspace.ignore, vec!["node_modules", "dist"]);
    }

    /// Test 2: Default fallback when no config
    #[test]
    fn test_default_settings() {
        let settings = Settings::default();

        assert_eq!(settings.index.debounce_ms, 300);
        assert_eq!(settings.workspace.module_glob, "**/*.omt");
        assert_eq!(settings.workspace.alias_config_glob, "**/tsconfig*.json");
        assert_eq!(settings.workspace.ignore, vec!["node_modules"]);
    }

    /// Test 3: Partial config uses defaults for missing fields
    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
[workspace]
ignore = []
"#;

        let settings = Settings::from_toml_str(toml).unwrap();

        assert_eq!(settings.index.debounce_ms, 300);
        assert_eq!(settings.workspace.module_glob, "**/*.omt");
        assert!(settings.workspace.ignore.is_empty());
    }

    /// Test 4: Empty config uses all defaults
    #[test]
    fn test_empty_config() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
    }

    /// Test 5: Wrong value type is rejected
    #[test]
    fn test_invalid_value_type() {
        let toml = r#"
[index]
debounce_ms = "soon"
"#;

        assert!(Settings::from_toml_str(toml).is_err());
    }
}

// ==================== FILE LOADING TESTS ====================

mod loading_tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Test 6: Settings file in the workspace root is picked up
    #[test]
    fn test_load_from_workspace_root() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[index]\ndebounce_ms = 10\n",
        )
        .unwrap();

        let settings = Settings::load(dir.path());

        assert_eq!(settings.index.debounce_ms, 10);
    }

    /// Test 7: Missing settings file gives defaults
    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        assert_eq!(Settings::load(dir.path()), Settings::default());
    }

    /// Test 8: Malformed settings file gives defaults
    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "[index\ndebounce_ms = ").unwrap();

        assert_eq!(Settings::load(dir.path()), Settings::default());
    }
}

// ==================== IGNORE LIST TESTS ====================

mod ignore_tests {
    use super::*;
    use std::path::Path;

    /// Test 9: Ignored component anywhere in the path
    #[test]
    fn test_ignored_component() {
        let settings = WorkspaceSettings::default();

        assert!(settings.is_ignored(Path::new("/w/node_modules/pkg/a.omt")));
        assert!(!settings.is_ignored(Path::new("/w/models/a.omt")));
    }

    /// Test 10: Only whole components match
    #[test]
    fn test_partial_component_not_ignored() {
        let settings = WorkspaceSettings::default();
        assert!(!settings.is_ignored(Path::new("/w/node_modules_backup/a.omt")));
    }
}
