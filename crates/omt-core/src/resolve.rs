//! Cross-file reference resolution
//!
//! A name used in a document is defined either locally or in a file reached
//! through its imports, possibly several imports deep. Imported files are
//! read and analysed on demand; each resolution call tracks the files it has
//! visited so import cycles terminate.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::aliases::AliasConfigs;
use crate::error::Result;
use crate::extract::analyze;
use crate::fs::FileSystem;
use crate::model::{DeclaredSymbol, DocumentAnalysis, ImportTarget};
use crate::paths::ShorthandMap;
use crate::registry::ModuleRegistry;

/// A declaration found for a name, with the file it lives in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub path: PathBuf,
    pub symbol: DeclaredSymbol,
}

/// What is needed to analyse an arbitrary workspace file
#[derive(Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub fs: &'a dyn FileSystem,
    pub aliases: &'a AliasConfigs,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(fs: &'a dyn FileSystem, aliases: &'a AliasConfigs) -> Self {
        Self { fs, aliases }
    }

    pub fn shorthands_for(&self, document: &Path) -> ShorthandMap {
        self.aliases.shorthands_for(self.fs, document)
    }

    /// Analyse text known to belong to `document`
    pub fn analyze_text(&self, document: &Path, text: &str) -> Result<DocumentAnalysis> {
        analyze(text, document, &self.shorthands_for(document))
    }

    /// Read and analyse a file, logging and skipping anything that fails
    pub fn analyze_file(&self, path: &Path) -> Option<DocumentAnalysis> {
        let text = match self.fs.read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                return None;
            }
        };
        match self.analyze_text(path, &text) {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                warn!("Could not analyze {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Resolves usages to their definitions
pub struct ReferenceResolver<'a> {
    context: AnalysisContext<'a>,
    registry: &'a ModuleRegistry,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(context: AnalysisContext<'a>, registry: &'a ModuleRegistry) -> Self {
        Self { context, registry }
    }

    /// Every definition of `name` reachable from `document`.
    ///
    /// Local declarations come first, followed by those found through the
    /// imports in declaration order.
    pub fn resolve(&self, name: &str, analysis: &DocumentAnalysis, document: &Path) -> Vec<Definition> {
        let mut visited = HashSet::new();
        let mut found = Vec::new();
        self.search(name, analysis, document, &mut visited, &mut found);
        found
    }

    fn search(
        &self,
        name: &str,
        analysis: &DocumentAnalysis,
        document: &Path,
        visited: &mut HashSet<PathBuf>,
        found: &mut Vec<Definition>,
    ) {
        if !visited.insert(document.to_path_buf()) {
            return;
        }

        found.extend(
            analysis
                .declared_symbols
                .iter()
                .filter(|symbol| symbol.name == name)
                .map(|symbol| Definition {
                    path: document.to_path_buf(),
                    symbol: symbol.clone(),
                }),
        );

        for import in analysis.imports.iter().filter(|import| import.name == name) {
            let Some(target) = self.import_path(&import.target) else {
                continue;
            };
            if visited.contains(&target) {
                debug!("Import cycle through {}", target.display());
                continue;
            }
            if let Some(imported) = self.context.analyze_file(&target) {
                self.search(name, &imported, &target, visited, found);
            }
        }
    }

    fn import_path(&self, target: &ImportTarget) -> Option<PathBuf> {
        match target {
            ImportTarget::File(path) => Some(path.clone()),
            ImportTarget::Module(module) => {
                let path = self.registry.module_path(module);
                if path.is_none() {
                    debug!("Module '{}' is not known yet", module);
                }
                path.map(Path::to_path_buf)
            }
        }
    }
}
