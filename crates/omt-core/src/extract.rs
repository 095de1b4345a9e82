//! Symbol extraction
//!
//! Builds a [`DocumentAnalysis`] from document text in two passes:
//!
//! 1. The YAML structure gives the imports, the names defined in `queries`,
//!    `commands` and `model`, and model entry parameters.
//! 2. The raw text gives positions. Definition sites must be found on exactly
//!    one line, usages are whole-token matches of every known name, and links
//!    come from the lines of the `import:` block.

use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde_yaml::Value;
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::model::{
    DeclaredSymbol, DocumentAnalysis, DocumentLink, Import, ImportTarget, LinkData, SymbolKind,
    Usage,
};
use crate::paths::{resolve_link, ShorthandMap};
use crate::scanner::{find_definition, find_model_key, split_parameters, usage_offsets};
use crate::span::{utf16_column, utf16_len, Range};

/// Import key prefix for declared-module imports
const MODULE_IMPORT_PREFIX: &str = "module:";

fn define_header_regex() -> &'static Regex {
    static DEFINE_RE: OnceLock<Regex> = OnceLock::new();
    DEFINE_RE.get_or_init(|| {
        Regex::new(r"DEFINE (QUERY|COMMAND) ([\w-]+)(?:[ \t]*(\([^)]*\))[ \t]*=>)?").unwrap()
    })
}

fn import_start_regex() -> &'static Regex {
    static IMPORT_START_RE: OnceLock<Regex> = OnceLock::new();
    IMPORT_START_RE.get_or_init(|| Regex::new(r"^import:").unwrap())
}

fn top_level_key_regex() -> &'static Regex {
    static TOP_LEVEL_KEY_RE: OnceLock<Regex> = OnceLock::new();
    TOP_LEVEL_KEY_RE.get_or_init(|| Regex::new(r"^\w+:").unwrap())
}

fn omt_path_regex() -> &'static Regex {
    static OMT_PATH_RE: OnceLock<Regex> = OnceLock::new();
    OMT_PATH_RE.get_or_init(|| Regex::new(r#"^( +["']?)(.*\.omt)"#).unwrap())
}

fn module_import_regex() -> &'static Regex {
    static MODULE_IMPORT_RE: OnceLock<Regex> = OnceLock::new();
    MODULE_IMPORT_RE.get_or_init(|| Regex::new(r"^( +)module:(.*):").unwrap())
}

/// Imports, declarations and usages of one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub imports: Vec<Import>,
    pub declared_symbols: Vec<DeclaredSymbol>,
    pub usages: Vec<Usage>,
}

/// Extract imports, declared symbols and usages from document text.
///
/// Fails with [`AnalysisError::MalformedDocument`] when the YAML cannot be
/// parsed, and with a range error when a declared name cannot be located on
/// exactly one line.
pub fn extract(text: &str, document: &Path, shorthands: &ShorthandMap) -> Result<Extraction> {
    let root: Value = serde_yaml::from_str(text)?;
    let root = untag(&root);

    let imports = root
        .get("import")
        .map(|section| collect_imports(section, document, shorthands))
        .unwrap_or_default();

    let mut declared_symbols = Vec::new();
    if let Some(block) = root.get("queries") {
        declared_symbols.extend(find_defined_symbols(block, text, SymbolKind::Query)?);
    }
    if let Some(block) = root.get("commands") {
        declared_symbols.extend(find_defined_symbols(block, text, SymbolKind::Command)?);
    }
    if let Some(model) = root.get("model") {
        declared_symbols.extend(find_model_entries(model, text)?);
    }

    let link_lines: HashSet<u32> = scan_import_block(text).iter().map(|m| m.line).collect();
    let usages = find_usages(text, &imports, &declared_symbols, &link_lines);

    Ok(Extraction {
        imports,
        declared_symbols,
        usages,
    })
}

/// Navigable links of the `import:` block.
///
/// Path links are resolved right away. Declared-module links carry the module
/// name so they can be resolved once the module registry knows it.
pub fn document_links(text: &str, document: &Path, shorthands: &ShorthandMap) -> Vec<DocumentLink> {
    scan_import_block(text)
        .into_iter()
        .map(|link| match link.kind {
            LinkKind::Path(raw) => DocumentLink {
                range: link.range,
                target: Some(resolve_link(&raw, document, shorthands)),
                data: None,
            },
            LinkKind::Module(module_name) => DocumentLink {
                range: link.range,
                target: None,
                data: Some(LinkData { module_name }),
            },
        })
        .collect()
}

/// Full analysis: extraction plus links
pub fn analyze(text: &str, document: &Path, shorthands: &ShorthandMap) -> Result<DocumentAnalysis> {
    let extraction = extract(text, document, shorthands)?;
    let links = document_links(text, document, shorthands);
    debug!(
        "Analyzed {}: {} imports, {} declarations, {} usages, {} links",
        document.display(),
        extraction.imports.len(),
        extraction.declared_symbols.len(),
        extraction.usages.len(),
        links.len()
    );
    Ok(DocumentAnalysis {
        imports: extraction.imports,
        declared_symbols: extraction.declared_symbols,
        usages: extraction.usages,
        links,
    })
}

fn untag(value: &Value) -> &Value {
    let mut value = value;
    while let Value::Tagged(tagged) = value {
        value = &tagged.value;
    }
    value
}

fn scalar_string(value: &Value) -> Option<String> {
    match untag(value) {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
    .filter(|s| !s.is_empty())
}

fn collect_imports(section: &Value, document: &Path, shorthands: &ShorthandMap) -> Vec<Import> {
    let Some(entries) = untag(section).as_mapping() else {
        return Vec::new();
    };

    let mut imports = Vec::new();
    for (key, names) in entries {
        let Some(declared_url) = key.as_str() else {
            continue;
        };
        let names: Vec<String> = match untag(names) {
            Value::Sequence(items) => items.iter().filter_map(scalar_string).collect(),
            other => scalar_string(other).into_iter().collect(),
        };
        if names.is_empty() {
            continue;
        }

        let target = match declared_url.trim().strip_prefix(MODULE_IMPORT_PREFIX) {
            Some(module) => ImportTarget::Module(module.trim().to_string()),
            None => ImportTarget::File(resolve_link(declared_url, document, shorthands)),
        };
        imports.extend(names.into_iter().map(|name| Import {
            name,
            declared_url: declared_url.to_string(),
            target: target.clone(),
        }));
    }
    imports
}

/// Declarations made with `DEFINE QUERY` / `DEFINE COMMAND` inside a block
fn find_defined_symbols(block: &Value, text: &str, kind: SymbolKind) -> Result<Vec<DeclaredSymbol>> {
    let (Some(code), Some(keyword)) = (untag(block).as_str(), kind.define_keyword()) else {
        return Ok(Vec::new());
    };

    define_header_regex()
        .captures_iter(code)
        .filter(|caps| &caps[1] == keyword)
        .map(|caps| -> Result<DeclaredSymbol> {
            let name = caps[2].to_string();
            let range = locate_unique(text, &format!("DEFINE {} {}", keyword, name), &name, |line| {
                find_definition(line, keyword, &name)
            })?;
            let parameters = caps
                .get(3)
                .map(|list| split_parameters(list.as_str()))
                .unwrap_or_default();
            Ok(DeclaredSymbol {
                name,
                kind,
                range,
                parameters,
            })
        })
        .collect()
}

/// Keys of the `model:` section, plus the ODT blocks nested inside them
fn find_model_entries(model: &Value, text: &str) -> Result<Vec<DeclaredSymbol>> {
    let Some(entries) = untag(model).as_mapping() else {
        return Ok(Vec::new());
    };

    let mut symbols = Vec::new();
    for (key, entry) in entries {
        let Some(name) = key.as_str() else {
            continue;
        };
        let range = locate_unique(text, &format!("{}: !", name), name, |line| {
            find_model_key(line, name)
        })?;
        let parameters = untag(entry)
            .get("params")
            .and_then(|params| untag(params).as_sequence())
            .map(|params| params.iter().filter_map(scalar_string).collect())
            .unwrap_or_default();
        symbols.push(DeclaredSymbol {
            name: name.to_string(),
            kind: SymbolKind::ModelEntry,
            range,
            parameters,
        });
    }

    for entry in entries.values() {
        let entry = untag(entry);
        if let Some(block) = entry.get("commands") {
            symbols.extend(find_defined_symbols(block, text, SymbolKind::Command)?);
        }
        if let Some(block) = entry.get("queries") {
            symbols.extend(find_defined_symbols(block, text, SymbolKind::Query)?);
        }
    }
    Ok(symbols)
}

/// Range of `name` on the single line where `find` matches.
///
/// Zero or several matching lines mean the parsed structure and the raw text
/// disagree, which is reported rather than guessed around.
fn locate_unique<F>(text: &str, pattern: &str, name: &str, find: F) -> Result<Range>
where
    F: Fn(&str) -> Option<usize>,
{
    let found: Vec<(usize, &str, usize)> = text
        .lines()
        .enumerate()
        .filter_map(|(index, line)| find(line).map(|offset| (index, line, offset)))
        .collect();

    match found.as_slice() {
        [(index, line, offset)] => Ok(Range::on_line(
            *index as u32,
            utf16_column(line, *offset),
            utf16_len(name),
        )),
        [] => Err(AnalysisError::RangeNotFound {
            pattern: pattern.to_string(),
        }),
        several => Err(AnalysisError::RangeAmbiguous {
            pattern: pattern.to_string(),
            count: several.len(),
        }),
    }
}

fn find_usages(
    text: &str,
    imports: &[Import],
    declared: &[DeclaredSymbol],
    link_lines: &HashSet<u32>,
) -> Vec<Usage> {
    let mut seen = HashSet::new();
    let names: Vec<&str> = imports
        .iter()
        .map(|import| import.name.as_str())
        .chain(declared.iter().map(|symbol| symbol.name.as_str()))
        .filter(|name| seen.insert(*name))
        .collect();
    let declaration_sites: HashSet<Range> = declared.iter().map(|symbol| symbol.range).collect();

    let mut usages = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line_number = index as u32;
        if link_lines.contains(&line_number) {
            continue;
        }
        for name in &names {
            let usage = usage_offsets(line, name)
                .map(|offset| Range::on_line(line_number, utf16_column(line, offset), utf16_len(name)))
                .find(|range| !declaration_sites.contains(range));
            if let Some(range) = usage {
                usages.push(Usage {
                    name: name.to_string(),
                    range,
                });
            }
        }
    }
    usages
}

enum LinkKind {
    Path(String),
    Module(String),
}

struct LinkMatch {
    line: u32,
    range: Range,
    kind: LinkKind,
}

/// Link lines between `import:` and the next top-level key
fn scan_import_block(text: &str) -> Vec<LinkMatch> {
    let mut links = Vec::new();
    let mut scanning = false;

    for (index, line) in text.lines().enumerate() {
        if import_start_regex().is_match(line) {
            scanning = true;
            continue;
        }
        if !scanning {
            continue;
        }
        if top_level_key_regex().is_match(line) {
            scanning = false;
            continue;
        }

        let line_number = index as u32;
        if let Some(caps) = omt_path_regex().captures(line) {
            let (prefix, link) = (&caps[1], &caps[2]);
            links.push(LinkMatch {
                line: line_number,
                range: Range::on_line(line_number, utf16_len(prefix), utf16_len(link)),
                kind: LinkKind::Path(link.to_string()),
            });
        } else if let Some(caps) = module_import_regex().captures(line) {
            let (whole, indent) = (&caps[0], &caps[1]);
            links.push(LinkMatch {
                line: line_number,
                range: Range::on_line(
                    line_number,
                    utf16_len(indent),
                    utf16_len(&whole[indent.len()..]),
                ),
                kind: LinkKind::Module(caps[2].trim().to_string()),
            });
        }
    }
    links
}
