//! Config store
//!
//! Holds the configuration tree for one invocation and answers dotted-path
//! lookups. Templates are expanded on demand through [`ConfigStore::expand`]
//! and [`ConfigStore::expand_path`]; the tree itself is never rewritten.

use crate::config::node::{ConfigNode, Mapping};
use crate::config::template::Resolver;
use crate::error::{TemplateError, TemplateResult};

/// Configuration tree with dotted-path access
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    root: Mapping,
}

impl ConfigStore {
    pub fn new() -> Self {
        ConfigStore::default()
    }

    /// Build a store from a parsed tree; anything but a mapping yields an empty store
    pub fn from_node(node: ConfigNode) -> Self {
        match node {
            ConfigNode::Mapping(root) => ConfigStore { root },
            _ => ConfigStore::new(),
        }
    }

    pub fn root(&self) -> &Mapping {
        &self.root
    }

    /// Look up a node by dotted path (`concat.js.dest`, `files.0.src`)
    pub fn get(&self, path: &str) -> TemplateResult<&ConfigNode> {
        let mut segments = split_path(path)?.into_iter();
        let unknown = || TemplateError::UnknownPath(path.to_string());

        let first = segments.next().ok_or_else(unknown)?;
        let mut node = self.root.get(first).ok_or_else(unknown)?;

        for segment in segments {
            node = match node {
                ConfigNode::Mapping(m) => m.get(segment),
                ConfigNode::Sequence(items) => {
                    segment.parse::<usize>().ok().and_then(|i| items.get(i))
                }
                _ => None,
            }
            .ok_or_else(unknown)?;
        }

        Ok(node)
    }

    /// Check whether a path exists
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_ok()
    }

    /// Set a node by dotted path, creating intermediate mappings.
    ///
    /// A scalar in the way of the path is replaced by a mapping.
    pub fn set(&mut self, path: &str, value: ConfigNode) -> TemplateResult<()> {
        let segments = split_path(path)?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| TemplateError::InvalidSyntax(path.to_string()))?;

        let mut current = &mut self.root;
        for segment in parents {
            if !matches!(current.get(segment), Some(ConfigNode::Mapping(_))) {
                current.insert(*segment, ConfigNode::Mapping(Mapping::new()));
            }
            current = match current.get_mut(segment) {
                Some(ConfigNode::Mapping(m)) => m,
                _ => return Err(TemplateError::InvalidSyntax(path.to_string())),
            };
        }

        current.insert(*last, value);
        Ok(())
    }

    /// Expand every template in `node` against this store
    pub fn expand(&self, node: &ConfigNode) -> TemplateResult<ConfigNode> {
        Resolver::new(self).expand(node)
    }

    /// Look up `path` and return its fully expanded value
    pub fn expand_path(&self, path: &str) -> TemplateResult<ConfigNode> {
        Resolver::new(self).lookup(path)
    }
}

/// Split a dotted path into its segments, rejecting empty ones
pub fn split_path(path: &str) -> TemplateResult<Vec<&str>> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(TemplateError::InvalidSyntax(path.to_string()));
    }

    let segments: Vec<&str> = trimmed.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(TemplateError::InvalidSyntax(path.to_string()));
    }
    Ok(segments)
}
