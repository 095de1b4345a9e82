//! `moduleName:` declarations
//!
//! A file becomes a workspace module by declaring its name on a line of its
//! own, e.g. `moduleName: Registration`, optionally followed by a comment.

use std::io;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::fs::FileSystem;
use crate::model::CheckFileResult;

fn module_name_regex() -> &'static Regex {
    static MODULE_NAME_RE: OnceLock<Regex> = OnceLock::new();
    MODULE_NAME_RE.get_or_init(|| {
        // one optional trailing blank, then an optional comment, nothing else
        Regex::new(r"(?m)^moduleName: (\w+)[ \t]?(?:#.*?)?\r?$").unwrap()
    })
}

/// Extract the declared module name from document text
pub fn parse_module_name(text: &str) -> Option<String> {
    module_name_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Module declaration state for a file whose text is already known
pub fn parse_module_text(path: &Path, text: &str) -> CheckFileResult {
    CheckFileResult {
        path: path.to_path_buf(),
        module_name: parse_module_name(text),
    }
}

/// Read a file and determine its module declaration state
pub fn parse_module_file(fs: &dyn FileSystem, path: &Path) -> io::Result<CheckFileResult> {
    let text = fs.read_to_string(path)?;
    Ok(parse_module_text(path, &text))
}
