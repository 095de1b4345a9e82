//! Filesystem access
//!
//! Analysis never touches the disk directly. Reads and glob scans go through
//! [`FileSystem`] so that the same code runs against the real disk or an
//! in-memory tree.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use glob::{MatchOptions, Pattern};
use tracing::warn;

/// Read and glob primitives used by analysis and workspace scanning
pub trait FileSystem: Send + Sync {
    /// Read a whole file as UTF-8 text
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Find files under `root` whose path relative to `root` matches `pattern`.
    ///
    /// Unreadable entries are logged and skipped.
    fn find_files(&self, root: &Path, pattern: &str) -> Vec<PathBuf>;
}

/// The real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFileSystem;

impl FileSystem for DiskFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn find_files(&self, root: &Path, pattern: &str) -> Vec<PathBuf> {
        let full_pattern = format!(
            "{}/{}",
            Pattern::escape(&root.to_string_lossy()),
            pattern
        );

        let entries = match glob::glob(&full_pattern) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Invalid glob pattern {}: {}", full_pattern, e);
                return Vec::new();
            }
        };

        let mut files = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable path during scan: {}", e),
            }
        }
        files
    }
}

/// An in-memory file tree, keyed by absolute path
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RwLock<BTreeMap<PathBuf, String>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with_file(self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    /// Add or replace a file
    pub fn insert(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
        let mut files = self.files.write().unwrap_or_else(|e| e.into_inner());
        files.insert(path.into(), text.into());
    }

    /// Delete a file, returning whether it existed
    pub fn remove(&self, path: &Path) -> bool {
        let mut files = self.files.write().unwrap_or_else(|e| e.into_inner());
        files.remove(path).is_some()
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )
        })
    }

    fn find_files(&self, root: &Path, pattern: &str) -> Vec<PathBuf> {
        let pattern = match Pattern::new(pattern) {
            Ok(p) => p,
            Err(e) => {
                warn!("Invalid glob pattern {}: {}", pattern, e);
                return Vec::new();
            }
        };
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };

        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        files
            .keys()
            .filter(|path| {
                path.strip_prefix(root)
                    .map(|rel| pattern.matches_path_with(rel, options))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }
}
