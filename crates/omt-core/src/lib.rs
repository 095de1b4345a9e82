//! omt-core - analysis for OMT documents
//!
//! Protocol-agnostic building blocks of the OMT language server:
//! - Path alias discovery and link resolution
//! - Symbol extraction (imports, declarations, usages, links)
//! - The workspace module registry
//! - Cross-file reference resolution
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use omt_core::{analyze, ShorthandMap};
//!
//! let text = "queries: |\n    DEFINE QUERY greet => 'Hello';\n";
//! let analysis = analyze(text, Path::new("/w/doc.omt"), &ShorthandMap::new()).unwrap();
//!
//! assert_eq!(analysis.declared_symbols[0].name, "greet");
//! ```

pub mod aliases;
pub mod error;
pub mod extract;
pub mod fs;
pub mod model;
pub mod module_decl;
pub mod paths;
pub mod registry;
pub mod resolve;
pub mod scanner;
pub mod span;

// Re-export main types and functions
pub use aliases::{AliasConfigs, DEFAULT_CONFIG_GLOB};
pub use error::{AnalysisError, ConfigError, RegistryError, Result};
pub use extract::{analyze, document_links, extract, Extraction};
pub use fs::{DiskFileSystem, FileSystem, MemoryFileSystem};
pub use model::{
    CheckFileResult, DeclaredSymbol, DocumentAnalysis, DocumentLink, Import, ImportTarget,
    LinkData, Module, SymbolKind, Usage,
};
pub use module_decl::{parse_module_file, parse_module_name, parse_module_text};
pub use paths::{resolve_link, ShorthandMap};
pub use registry::ModuleRegistry;
pub use resolve::{AnalysisContext, Definition, ReferenceResolver};
pub use span::{Position, Range};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, "0.1.0");
    }
}
