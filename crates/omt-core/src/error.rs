//! Error types for OMT analysis

use std::path::PathBuf;

use thiserror::Error;

/// Result type for document analysis
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors raised while extracting symbols from a single document
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// The YAML structure of the document could not be parsed
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// A declared name was not found in the raw text
    #[error("0 results found for {pattern}, expected only one")]
    RangeNotFound { pattern: String },

    /// A declared name was found on more than one line of the raw text
    #[error("{count} results found for {pattern}, expected only one")]
    RangeAmbiguous { pattern: String, count: usize },
}

impl AnalysisError {
    /// Short diagnostic code used when the failure is shown to a user
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::MalformedDocument(_) => "OMT001",
            AnalysisError::RangeNotFound { .. } | AnalysisError::RangeAmbiguous { .. } => "OMT002",
        }
    }
}

impl From<serde_yaml::Error> for AnalysisError {
    fn from(err: serde_yaml::Error) -> Self {
        AnalysisError::MalformedDocument(err.to_string())
    }
}

/// Errors raised while reading a path alias configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON
    #[error("Could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Misuse of the module registry's folder bookkeeping
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The folder is already being tracked
    #[error("workspace folder was already added: {0}")]
    DuplicateFolder(PathBuf),

    /// The folder was never tracked, or was removed already
    #[error("workspace folder was already removed: {0}")]
    UnknownFolder(PathBuf),
}
