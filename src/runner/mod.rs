//! Task execution engine
//!
//! This module resolves tasks into leaf actions, runs them in order and
//! re-runs them in watch mode.

pub mod command;
pub mod context;
pub mod registry;
pub mod run;
pub mod watch;

// Re-export main types
pub use context::*;
pub use registry::*;
pub use run::*;
pub use watch::{load_bindings, WatchBinding, Watcher};
