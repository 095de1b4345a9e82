//! Navigation helpers
//!
//! Hover text, definition lookup, link conversion and diagnostics, plus the
//! conversions between `omt_core` positions and `lsp_types`.

use std::path::{Path, PathBuf};

use tower_lsp::lsp_types::{
    self, Diagnostic, DiagnosticSeverity, Location, NumberOrString, Url,
};
use tracing::debug;

use omt_core::{AnalysisError, Definition, DocumentAnalysis, DocumentLink, LinkData, Usage};

/// Diagnostic source name
pub const SOURCE: &str = "omt";

pub fn to_lsp_position(position: omt_core::Position) -> lsp_types::Position {
    lsp_types::Position::new(position.line, position.character)
}

pub fn to_core_position(position: lsp_types::Position) -> omt_core::Position {
    omt_core::Position::new(position.line, position.character)
}

pub fn to_lsp_range(range: omt_core::Range) -> lsp_types::Range {
    lsp_types::Range::new(to_lsp_position(range.start), to_lsp_position(range.end))
}

/// Filesystem path of a `file:` URI
pub fn uri_to_path(uri: &Url) -> Option<PathBuf> {
    let path = uri.to_file_path().ok();
    if path.is_none() {
        debug!("Not a file URI: {}", uri);
    }
    path
}

pub fn path_to_uri(path: &Path) -> Option<Url> {
    Url::from_file_path(path).ok()
}

/// The usage under the cursor. Both range ends count as inside.
pub fn usage_at(analysis: &DocumentAnalysis, position: omt_core::Position) -> Option<&Usage> {
    analysis
        .usages
        .iter()
        .find(|usage| usage.range.contains(position))
}

/// Hover text for a set of definitions.
///
/// Only a single unambiguous definition is rendered, as `name(a, b)`.
pub fn hover_text(definitions: &[Definition]) -> Option<String> {
    match definitions {
        [definition] => Some(definition.symbol.signature()),
        _ => None,
    }
}

pub fn to_locations(definitions: &[Definition]) -> Vec<Location> {
    definitions
        .iter()
        .filter_map(|definition| {
            let uri = path_to_uri(&definition.path)?;
            Some(Location::new(uri, to_lsp_range(definition.symbol.range)))
        })
        .collect()
}

pub fn to_lsp_link(link: &DocumentLink) -> lsp_types::DocumentLink {
    lsp_types::DocumentLink {
        range: to_lsp_range(link.range),
        target: link.target.as_deref().and_then(path_to_uri),
        tooltip: None,
        data: link
            .data
            .as_ref()
            .and_then(|data| serde_json::to_value(data).ok()),
    }
}

/// Module reference carried by an unresolved link
pub fn link_data(link: &lsp_types::DocumentLink) -> Option<LinkData> {
    let data = link.data.clone()?;
    serde_json::from_value(data).ok()
}

/// One diagnostic at the top of the document describing a failed analysis
pub fn problem_diagnostic(problem: &AnalysisError) -> Diagnostic {
    Diagnostic {
        range: lsp_types::Range::new(lsp_types::Position::new(0, 0), lsp_types::Position::new(0, 0)),
        severity: Some(DiagnosticSeverity::ERROR),
        code: Some(NumberOrString::String(problem.code().to_string())),
        source: Some(SOURCE.to_string()),
        message: problem.to_string(),
        ..Default::default()
    }
}

/// Diagnostics to publish for a document, empty when its analysis succeeded
pub fn problem_diagnostics(problem: Option<&AnalysisError>) -> Vec<Diagnostic> {
    problem.map(problem_diagnostic).into_iter().collect()
}
