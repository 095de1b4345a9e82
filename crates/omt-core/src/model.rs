//! Data model for analysed OMT documents
//!
//! Everything except [`Module`] and [`CheckFileResult`] is produced fresh on
//! every analysis pass and discarded with the previous [`DocumentAnalysis`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::span::Range;

/// Where an import points to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImportTarget {
    /// An absolute file path, after alias and relative resolution
    File(PathBuf),
    /// A declared module, looked up by name in the module registry
    Module(String),
}

/// One imported name
///
/// Several imports share a `declared_url` when one import statement lists
/// several names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// The imported symbol
    pub name: String,
    /// The import key exactly as written
    pub declared_url: String,
    /// The resolved target of the import key
    pub target: ImportTarget,
}

impl Import {
    /// Resolved file path, if the import is path-based
    pub fn resolved_path(&self) -> Option<&PathBuf> {
        match &self.target {
            ImportTarget::File(path) => Some(path),
            ImportTarget::Module(_) => None,
        }
    }
}

/// Kind of locally declared symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// `DEFINE QUERY name`
    Query,
    /// `DEFINE COMMAND name`
    Command,
    /// A key of the `model:` section, e.g. `MyActivity: !Activity`
    ModelEntry,
}

impl SymbolKind {
    /// Keyword used after `DEFINE` for ODT definitions
    pub fn define_keyword(self) -> Option<&'static str> {
        match self {
            SymbolKind::Query => Some("QUERY"),
            SymbolKind::Command => Some("COMMAND"),
            SymbolKind::ModelEntry => None,
        }
    }
}

/// A query, command or model entry defined in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredSymbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Location of the name token at the definition site
    pub range: Range,
    /// Formal parameter names, in declaration order
    pub parameters: Vec<String>,
}

impl DeclaredSymbol {
    /// Plain text signature, e.g. `cmd($a, $b)`
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.parameters.join(", "))
    }
}

/// An occurrence of a known name in the text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Usage {
    pub name: String,
    pub range: Range,
}

/// Data carried by a link whose target is resolved later
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkData {
    pub module_name: String,
}

/// A navigable link in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLink {
    pub range: Range,
    /// Set for path based links
    pub target: Option<PathBuf>,
    /// Set for declared module references, resolved through the registry
    pub data: Option<LinkData>,
}

/// Everything extracted from one document revision
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentAnalysis {
    pub imports: Vec<Import>,
    pub declared_symbols: Vec<DeclaredSymbol>,
    pub usages: Vec<Usage>,
    pub links: Vec<DocumentLink>,
}

impl DocumentAnalysis {
    /// Whether nothing at all was extracted
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
            && self.declared_symbols.is_empty()
            && self.usages.is_empty()
            && self.links.is_empty()
    }
}

/// A workspace-wide declared module
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Module {
    pub name: String,
    pub path: PathBuf,
}

/// The module declaration state of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckFileResult {
    pub path: PathBuf,
    /// Declared module name, `None` when the file declares no module
    pub module_name: Option<String>,
}
