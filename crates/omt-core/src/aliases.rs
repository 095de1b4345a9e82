//! Path alias configuration discovery
//!
//! Aliases are declared in `tsconfig*.json` files, under
//! `compilerOptions.paths`:
//!
//! ```json
//! { "compilerOptions": { "paths": { "@shared/*": ["./shared/*"] } } }
//! ```
//!
//! A document sees every configuration whose directory contains the
//! document. When two applicable configurations declare the same alias, the
//! one nearest to the document wins.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, error};

use crate::error::ConfigError;
use crate::fs::FileSystem;
use crate::paths::{normalize, parent_dir, ShorthandMap};

/// Default glob for alias configuration files
pub const DEFAULT_CONFIG_GLOB: &str = "**/tsconfig*.json";

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ConfigFile {
    compiler_options: CompilerOptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CompilerOptions {
    paths: BTreeMap<String, AliasTarget>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AliasTarget {
    One(String),
    Many(Vec<String>),
}

impl AliasTarget {
    fn first(&self) -> Option<&str> {
        match self {
            AliasTarget::One(target) => Some(target),
            AliasTarget::Many(targets) => targets.first().map(String::as_str),
        }
    }
}

/// Parse the alias table of one configuration file.
///
/// Returns `(alias, base)` pairs with the alias stripped of its trailing `/*`
/// and the base resolved against the configuration file's directory.
pub fn parse_alias_config(
    text: &str,
    config_path: &Path,
) -> Result<Vec<(String, String)>, serde_json::Error> {
    let config: ConfigFile = serde_json::from_str(text)?;
    let config_dir = parent_dir(config_path);

    let aliases = config
        .compiler_options
        .paths
        .iter()
        .filter_map(|(key, target)| {
            let alias = key.strip_suffix("/*").unwrap_or(key);
            let target = target.first()?;
            let base = normalize(&config_dir.join(target));
            Some((alias.to_string(), base.to_string_lossy().into_owned()))
        })
        .filter(|(alias, _)| !alias.is_empty())
        .collect();

    Ok(aliases)
}

/// Read and parse one configuration file
pub fn read_alias_config(
    fs: &dyn FileSystem,
    config_path: &Path,
) -> Result<Vec<(String, String)>, ConfigError> {
    let text = fs
        .read_to_string(config_path)
        .map_err(|source| ConfigError::Io {
            path: config_path.to_path_buf(),
            source,
        })?;
    parse_alias_config(&text, config_path).map_err(|source| ConfigError::Parse {
        path: config_path.to_path_buf(),
        source,
    })
}

/// The set of known alias configuration files in the workspace
#[derive(Debug, Clone, Default)]
pub struct AliasConfigs {
    files: BTreeSet<PathBuf>,
}

impl AliasConfigs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find configuration files under `root` and remember them.
    ///
    /// Returns the number of newly found files.
    pub fn discover(&mut self, fs: &dyn FileSystem, root: &Path, pattern: &str) -> usize {
        let found = fs.find_files(root, pattern);
        let added = found.into_iter().filter(|path| self.insert(path)).count();
        debug!("Discovered {} alias configs under {}", added, root.display());
        added
    }

    pub fn insert(&mut self, path: &Path) -> bool {
        self.files.insert(path.to_path_buf())
    }

    pub fn remove(&mut self, path: &Path) -> bool {
        self.files.remove(path)
    }

    /// Forget every configuration file inside `folder`
    pub fn remove_folder(&mut self, folder: &Path) {
        self.files.retain(|path| !path.starts_with(folder));
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Configuration files that apply to `document`, nearest first
    pub fn applicable(&self, document: &Path) -> Vec<&Path> {
        let document_dir = parent_dir(document);
        let mut configs: Vec<&Path> = self
            .files
            .iter()
            .map(PathBuf::as_path)
            .filter(|config| document_dir.starts_with(parent_dir(config)))
            .collect();
        configs.sort_by_key(|config| std::cmp::Reverse(parent_dir(config).components().count()));
        configs
    }

    /// Build the alias map for `document`.
    ///
    /// Unreadable or malformed configuration files are logged and skipped.
    pub fn shorthands_for(&self, fs: &dyn FileSystem, document: &Path) -> ShorthandMap {
        let mut shorthands = ShorthandMap::new();
        for config in self.applicable(document) {
            match read_alias_config(fs, config) {
                Ok(aliases) => {
                    for (alias, base) in aliases {
                        shorthands.insert(alias, base);
                    }
                }
                Err(e) => error!("Skipping alias configuration: {}", e),
            }
        }
        shorthands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    #[test]
    fn test_parse_alias_config() {
        let text = r#"{
            "compilerOptions": {
                "paths": {
                    "@one/*": ["./one/*"],
                    "@cfg": "../shared/config.omt"
                }
            }
        }"#;

        let aliases = parse_alias_config(text, Path::new("/proj/tsconfig.json")).unwrap();

        assert_eq!(
            aliases,
            vec![
                ("@cfg".to_string(), "/shared/config.omt".to_string()),
                ("@one".to_string(), "/proj/one/*".to_string()),
            ]
        );
    }

    #[test]
    fn test_config_without_paths_is_empty() {
        let aliases = parse_alias_config("{}", Path::new("/proj/tsconfig.json")).unwrap();
        assert!(aliases.is_empty());
    }

    #[test]
    fn test_malformed_config_is_a_parse_error() {
        let fs = MemoryFileSystem::new().with_file("/proj/tsconfig.json", "{ nope");
        let err = read_alias_config(&fs, Path::new("/proj/tsconfig.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_only_ancestor_configs_apply() {
        let fs = MemoryFileSystem::new()
            .with_file(
                "/w/one/tsconfig.json",
                r#"{"compilerOptions":{"paths":{"@one/*":["./*"]}}}"#,
            )
            .with_file(
                "/w/two/tsconfig.json",
                r#"{"compilerOptions":{"paths":{"@two/*":["./*"]}}}"#,
            );
        let mut configs = AliasConfigs::new();
        assert_eq!(configs.discover(&fs, Path::new("/w"), DEFAULT_CONFIG_GLOB), 2);

        let map = configs.shorthands_for(&fs, Path::new("/w/one/doc.omt"));

        assert_eq!(map.get("@one"), Some("/w/one/*"));
        assert_eq!(map.get("@two"), None);
    }

    #[test]
    fn test_nearest_config_wins_on_collision() {
        let fs = MemoryFileSystem::new()
            .with_file(
                "/w/tsconfig.json",
                r#"{"compilerOptions":{"paths":{"@x/*":["./outer/*"],"@outer/*":["./o/*"]}}}"#,
            )
            .with_file(
                "/w/inner/tsconfig.json",
                r#"{"compilerOptions":{"paths":{"@x/*":["./near/*"]}}}"#,
            );
        let mut configs = AliasConfigs::new();
        configs.discover(&fs, Path::new("/w"), DEFAULT_CONFIG_GLOB);

        let map = configs.shorthands_for(&fs, Path::new("/w/inner/deep/doc.omt"));

        assert_eq!(map.get("@x"), Some("/w/inner/near/*"));
        assert_eq!(map.get("@outer"), Some("/w/o/*"));
    }

    #[test]
    fn test_bad_config_does_not_block_others() {
        let fs = MemoryFileSystem::new()
            .with_file("/w/tsconfig.json", r#"{"compilerOptions":{"paths":{"@ok/*":["./ok/*"]}}}"#)
            .with_file("/w/a/tsconfig-invalid.json", "{ this is not json");
        let mut configs = AliasConfigs::new();
        configs.discover(&fs, Path::new("/w"), DEFAULT_CONFIG_GLOB);
        assert_eq!(configs.len(), 2);

        let map = configs.shorthands_for(&fs, Path::new("/w/a/doc.omt"));

        assert_eq!(map.len(), 1);
        assert_eq!(map.get("@ok"), Some("/w/ok/*"));
    }

    #[test]
    fn test_remove_folder_forgets_configs() {
        let mut configs = AliasConfigs::new();
        configs.insert(Path::new("/w/a/tsconfig.json"));
        configs.insert(Path::new("/v/tsconfig.json"));

        configs.remove_folder(Path::new("/w"));

        assert_eq!(configs.len(), 1);
        assert!(configs.applicable(Path::new("/w/a/doc.omt")).is_empty());
    }
}
