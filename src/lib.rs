//! Kiln - A declarative YAML build pipeline runner
//!
//! Kiln reads a `kiln.yml` file that declares a configuration tree and named
//! tasks. Tasks expand into leaf actions (clean, concat, minify, archive, ...)
//! whose options are templated against the same tree, and run one after
//! another until the first failure.

// Public modules
pub mod actions;
pub mod cli;
pub mod config;
pub mod error;
pub mod runner;

// Re-export commonly used types
pub use error::{KilnError, Result};

/// Current version of Kiln
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
