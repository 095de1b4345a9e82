//! OMT Language Server Protocol implementation
//!
//! This library provides LSP support for OMT documents, including:
//! - Document links for import paths, path aliases and declared modules
//! - Hover with the signature of the symbol under the cursor
//! - Go to definition across imported files
//! - Diagnostics for documents whose symbols could not be extracted
//!
//! # Library Usage
//!
//! ```ignore
//! use omt_lsp::run_server;
//!
//! // Run the LSP server
//! run_server().await;
//! ```
//!
//! # Binary Usage
//!
//! ```bash
//! # Start the language server (typically called by an editor)
//! omt-lsp
//!
//! # With debug logging
//! RUST_LOG=debug omt-lsp
//! ```

pub mod config;
pub mod index;
pub mod navigation;
pub mod server;
pub mod workspace;

// Re-export main entry point
pub use server::{run_server, Backend};

// Re-export commonly used types
pub use config::Settings;
pub use index::DocumentIndex;
pub use workspace::WorkspaceLookup;
