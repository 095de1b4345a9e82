//! Workspace Module
//!
//! Tracks what the workspace knows independent of open documents:
//! declared modules and path alias configuration files.

pub mod lookup;

#[cfg(test)]
mod tests;

pub use lookup::WorkspaceLookup;
