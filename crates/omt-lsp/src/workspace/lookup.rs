//! Workspace Lookup
//!
//! Keeps the module registry and the set of alias configuration files in
//! step with the workspace: folder scans when folders are added, and single
//! file updates when the editor reports changes on disk.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock as SyncRwLock};

use glob::Pattern;
use tokio::sync::RwLock;
use tokio::task::{spawn_blocking, JoinHandle};
use tracing::{debug, info, warn};

use omt_core::{
    parse_module_file, parse_module_text, AliasConfigs, CheckFileResult, FileSystem,
    ModuleRegistry, RegistryError,
};

use crate::config::WorkspaceSettings;

/// Result of scanning one folder
#[derive(Debug, Default)]
struct FolderScan {
    modules: Vec<CheckFileResult>,
    alias_configs: Vec<PathBuf>,
}

/// Async access to the workspace-wide module registry and alias configs
#[derive(Clone)]
pub struct WorkspaceLookup {
    fs: Arc<dyn FileSystem>,
    registry: Arc<RwLock<ModuleRegistry>>,
    aliases: Arc<RwLock<AliasConfigs>>,
    settings: Arc<SyncRwLock<WorkspaceSettings>>,
}

impl WorkspaceLookup {
    pub fn new(fs: Arc<dyn FileSystem>, settings: WorkspaceSettings) -> Self {
        Self {
            fs,
            registry: Arc::new(RwLock::new(ModuleRegistry::new())),
            aliases: Arc::new(RwLock::new(AliasConfigs::new())),
            settings: Arc::new(SyncRwLock::new(settings)),
        }
    }

    pub fn fs(&self) -> Arc<dyn FileSystem> {
        Arc::clone(&self.fs)
    }

    /// Shared handle to the module registry
    pub fn registry(&self) -> Arc<RwLock<ModuleRegistry>> {
        Arc::clone(&self.registry)
    }

    /// Shared handle to the alias configuration set
    pub fn aliases(&self) -> Arc<RwLock<AliasConfigs>> {
        Arc::clone(&self.aliases)
    }

    pub fn settings(&self) -> WorkspaceSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the scan settings used from now on
    pub fn set_settings(&self, settings: WorkspaceSettings) {
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
    }

    /// Register a folder and start scanning it in the background.
    ///
    /// The returned handle resolves to the number of modules found. Adding a
    /// folder twice is rejected.
    pub async fn add_folder(&self, folder: &Path) -> Result<JoinHandle<usize>, RegistryError> {
        self.registry.write().await.add_folder(folder)?;
        debug!("Scanning workspace folder {}", folder.display());

        let lookup = self.clone();
        let folder = folder.to_path_buf();
        Ok(tokio::spawn(async move { lookup.scan_folder(folder).await }))
    }

    /// Deregister a folder and drop everything found inside it
    pub async fn remove_folder(&self, folder: &Path) -> Result<(), RegistryError> {
        self.registry.write().await.remove_folder(folder)?;
        self.aliases.write().await.remove_folder(folder);
        info!("Removed workspace folder {}", folder.display());
        Ok(())
    }

    async fn scan_folder(&self, folder: PathBuf) -> usize {
        let fs = Arc::clone(&self.fs);
        let settings = self.settings();
        let root = folder.clone();

        let scan = match spawn_blocking(move || collect_folder(fs.as_ref(), &root, &settings)).await {
            Ok(scan) => scan,
            Err(e) => {
                warn!("Scan of {} did not complete: {}", folder.display(), e);
                return 0;
            }
        };

        {
            let mut registry = self.registry.write().await;
            if !registry.has_folder(&folder) {
                debug!("{} was removed during its scan", folder.display());
                return 0;
            }
            for result in &scan.modules {
                registry.check_for_changes(result);
            }
        }
        {
            let mut aliases = self.aliases.write().await;
            for config in &scan.alias_configs {
                aliases.insert(config);
            }
        }

        let found = scan
            .modules
            .iter()
            .filter(|result| result.module_name.is_some())
            .count();
        info!(
            "Scanned {}: {} modules, {} alias configs",
            folder.display(),
            found,
            scan.alias_configs.len()
        );
        found
    }

    /// A file was created or changed on disk.
    ///
    /// `text` is the new content when the caller already has it, otherwise
    /// the file is read again. Files a scan of the registered folders would
    /// not find are ignored.
    pub async fn file_changed(&self, path: &Path, text: Option<&str>) {
        let settings = self.settings();
        if settings.is_ignored(path) {
            return;
        }

        if self.in_scope(&settings.alias_config_glob, path).await {
            if self.aliases.write().await.insert(path) {
                debug!("Tracking alias config {}", path.display());
            }
            return;
        }
        if !self.in_scope(&settings.module_glob, path).await {
            return;
        }

        let result = match text {
            Some(text) => parse_module_text(path, text),
            None => match parse_module_file(self.fs.as_ref(), path) {
                Ok(result) => result,
                Err(e) => {
                    warn!("Could not read {}: {}", path.display(), e);
                    return;
                }
            },
        };
        self.registry.write().await.check_for_changes(&result);
    }

    /// Whether a folder scan with `glob` would find `path`
    async fn in_scope(&self, glob: &str, path: &Path) -> bool {
        self.registry
            .read()
            .await
            .folders()
            .any(|folder| glob_matches(glob, folder, path))
    }

    /// A file was deleted on disk
    pub async fn file_deleted(&self, path: &Path) {
        self.registry.write().await.remove_file(path);
        self.aliases.write().await.remove(path);
    }

    /// Location of a declared module
    pub async fn module_path(&self, name: &str) -> Option<PathBuf> {
        self.registry
            .read()
            .await
            .module_path(name)
            .map(Path::to_path_buf)
    }

    pub async fn module_count(&self) -> usize {
        self.registry.read().await.len()
    }
}

/// Glob, read and parse one folder. Runs on a blocking thread.
fn collect_folder(fs: &dyn FileSystem, folder: &Path, settings: &WorkspaceSettings) -> FolderScan {
    let modules = fs
        .find_files(folder, &settings.module_glob)
        .into_iter()
        .filter(|path| !settings.is_ignored(path))
        .filter_map(|path| match parse_module_file(fs, &path) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                None
            }
        })
        .collect();

    let alias_configs = fs
        .find_files(folder, &settings.alias_config_glob)
        .into_iter()
        .filter(|path| !settings.is_ignored(path))
        .collect();

    FolderScan {
        modules,
        alias_configs,
    }
}

/// Match the part of `path` below `folder` against a scan glob
fn glob_matches(glob: &str, folder: &Path, path: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(folder) else {
        return false;
    };
    match Pattern::new(glob) {
        Ok(pattern) => pattern.matches_path(relative),
        Err(e) => {
            warn!("Invalid glob pattern {}: {}", glob, e);
            false
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_glob_matches_below_folder() {
        let folder = Path::new("/w");
        assert!(glob_matches("**/*.omt", folder, Path::new("/w/a/b.omt")));
        assert!(glob_matches("**/*.omt", folder, Path::new("/w/top.omt")));
        assert!(glob_matches("**/tsconfig*.json", folder, Path::new("/w/tsconfig.base.json")));
        assert!(!glob_matches("**/*.omt", folder, Path::new("/w/tsconfig.json")));
        assert!(!glob_matches("**/*.omt", folder, Path::new("/elsewhere/a.omt")));
    }

    #[test]
    fn test_glob_matches_full_pattern() {
        let folder = Path::new("/w");
        assert!(glob_matches("models/**/*.omt", folder, Path::new("/w/models/x/a.omt")));
        assert!(!glob_matches("models/**/*.omt", folder, Path::new("/w/scratch/a.omt")));
    }
}
