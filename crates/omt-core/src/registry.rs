//! Workspace module registry
//!
//! Maps declared module names to the file that declares them, and tracks the
//! workspace folders those files were found in. Names are unique by
//! construction: a second file declaring a taken name replaces the first.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::RegistryError;
use crate::model::{CheckFileResult, Module};

/// Name to location map for declared modules
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    folders: BTreeSet<PathBuf>,
    modules: HashMap<String, Module>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a workspace folder
    pub fn add_folder(&mut self, folder: &Path) -> Result<(), RegistryError> {
        if !self.folders.insert(folder.to_path_buf()) {
            return Err(RegistryError::DuplicateFolder(folder.to_path_buf()));
        }
        Ok(())
    }

    /// Stop tracking a folder and drop every module found inside it
    pub fn remove_folder(&mut self, folder: &Path) -> Result<(), RegistryError> {
        if !self.folders.remove(folder) {
            return Err(RegistryError::UnknownFolder(folder.to_path_buf()));
        }
        self.modules.retain(|_, module| !module.path.starts_with(folder));
        Ok(())
    }

    pub fn has_folder(&self, folder: &Path) -> bool {
        self.folders.contains(folder)
    }

    pub fn folders(&self) -> impl Iterator<Item = &Path> {
        self.folders.iter().map(PathBuf::as_path)
    }

    /// Apply the latest module declaration state of one file.
    ///
    /// Returns the location of another file whose module was overwritten
    /// because it declared the same name.
    pub fn check_for_changes(&mut self, result: &CheckFileResult) -> Option<PathBuf> {
        let Some(name) = result.module_name.as_deref() else {
            // the file no longer declares a module
            self.remove_file(&result.path);
            return None;
        };

        // a rename leaves the old name pointing at this file
        self.modules
            .retain(|key, module| key == name || module.path != result.path);

        let previous = self.modules.insert(
            name.to_string(),
            Module {
                name: name.to_string(),
                path: result.path.clone(),
            },
        );

        let replaced = previous
            .map(|module| module.path)
            .filter(|path| *path != result.path)?;
        warn!(
            "There is another module named '{}' found at {}. Will now replace with {}",
            name,
            replaced.display(),
            result.path.display()
        );
        Some(replaced)
    }

    /// Drop any module declared by exactly this file
    pub fn remove_file(&mut self, path: &Path) {
        self.modules.retain(|_, module| module.path != path);
    }

    /// Location of the module with this name
    pub fn module_path(&self, name: &str) -> Option<&Path> {
        self.modules.get(name).map(|module| module.path.as_path())
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
