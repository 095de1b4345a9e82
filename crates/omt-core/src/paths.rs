//! Path alias resolution
//!
//! Turns the link text found in an OMT document (`./other.omt`,
//! `'@shared/util.omt'`, `/abs/file.omt`) into a normalised absolute path.
//! Aliases come from a [`ShorthandMap`] built per document, see
//! [`crate::aliases`].

use std::path::{Component, Path, PathBuf};

/// Ordered alias prefix to base directory mapping
///
/// Keys are alias prefixes without the trailing `/*` (e.g. `@shared`), values
/// are absolute base paths that usually still end in `/*`. Inserting a key
/// that is already present keeps the earlier entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShorthandMap {
    entries: Vec<(String, String)>,
}

impl ShorthandMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an alias unless one with the same key exists.
    ///
    /// Returns `false` when the key was already taken.
    pub fn insert(&mut self, alias: impl Into<String>, base: impl Into<String>) -> bool {
        let alias = alias.into();
        if alias.is_empty() || self.get(&alias).is_some() {
            return false;
        }
        self.entries.push((alias, base.into()));
        true
    }

    pub fn get(&self, alias: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == alias)
            .map(|(_, base)| base.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ShorthandMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ShorthandMap::new();
        for (alias, base) in iter {
            map.insert(alias, base);
        }
        map
    }
}

/// Resolve link text written in `document` to an absolute path
pub fn resolve_link(raw_link: &str, document: &Path, shorthands: &ShorthandMap) -> PathBuf {
    let link = strip_quotes(raw_link.trim());
    let link = expand_alias(link, shorthands);
    let link = Path::new(&link);

    if link.is_absolute() {
        normalize(link)
    } else {
        normalize(&parent_dir(document).join(link))
    }
}

/// Directory containing `document`
pub fn parent_dir(document: &Path) -> &Path {
    document.parent().unwrap_or(document)
}

/// Lexically normalise a path, removing `.` and folding `..`
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = out.parent().is_none() && out.has_root();
                if at_root {
                    continue;
                }
                if !out.pop() {
                    out.push("..");
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Remove one matching pair of surrounding quotes
fn strip_quotes(link: &str) -> &str {
    ['"', '\'']
        .into_iter()
        .find_map(|quote| link.strip_prefix(quote)?.strip_suffix(quote))
        .map_or(link, str::trim)
}

/// Replace a leading alias with its base. The longest matching alias wins.
fn expand_alias(link: &str, shorthands: &ShorthandMap) -> String {
    let matched = shorthands
        .iter()
        .filter_map(|(alias, base)| {
            let rest = link.strip_prefix(alias)?;
            let at_boundary = rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\');
            at_boundary.then_some((alias.len(), base, rest))
        })
        .max_by_key(|(len, _, _)| *len);

    let Some((_, base, rest)) = matched else {
        return link.to_string();
    };

    match wildcard_base(base) {
        Some(base_dir) => Path::new(base_dir)
            .join(format!(".{}", rest))
            .to_string_lossy()
            .into_owned(),
        None => format!("{}{}", base, rest),
    }
}

/// The part of an alias base before a trailing `/*` (or `\*`) segment
fn wildcard_base(base: &str) -> Option<&str> {
    base.rfind("/*")
        .or_else(|| base.rfind("\\*"))
        .map(|idx| &base[..idx])
}
