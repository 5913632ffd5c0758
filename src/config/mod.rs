//! Configuration parsing and validation
//!
//! This module handles parsing of kiln.yml files, the configuration tree
//! they declare and template expansion over that tree.

pub mod node;
pub mod parse;
pub mod schema;
pub mod store;
pub mod template;
pub mod types;

// Re-export main types
pub use node::{ConfigNode, Mapping};
pub use parse::*;
pub use schema::*;
pub use store::ConfigStore;
pub use types::*;
