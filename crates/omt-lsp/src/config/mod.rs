//! Server configuration
//!
//! Settings are loaded from `omt-lsp.toml` in the first workspace folder:
//!
//! ```toml
//! [index]
//! debounce_ms = 300
//!
//! [workspace]
//! module_glob = "**/*.omt"
//! alias_config_glob = "**/tsconfig*.json"
//! ignore = ["node_modules"]
//! ```
//!
//! Every field is optional. A missing file gives the defaults.

mod settings;

#[cfg(test)]
mod tests;

pub use settings::{IndexSettings, Settings, WorkspaceSettings, CONFIG_FILE_NAME};
