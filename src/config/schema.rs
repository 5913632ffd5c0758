//! Configuration validation
//!
//! Classifies the top-level sections of the config tree and checks the
//! shape of action sections before any task is registered.

use crate::actions::ActionKind;
use crate::config::node::{ConfigNode, Mapping};
use crate::config::store::ConfigStore;
use crate::config::types::Kilnfile;
use crate::error::{ConfigError, ConfigResult};

/// Section holding watch bindings
pub const WATCH_SECTION: &str = "watch";

/// Section holding package metadata
pub const PACKAGE_SECTION: &str = "pkg";

/// Keys of an action section that are not targets
const RESERVED_KEYS: &[&str] = &["kind", "options"];

/// A config section that declares leaf actions
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSection {
    pub name: String,
    pub kind: ActionKind,
    /// Target names in declaration order
    pub targets: Vec<String>,
}

/// Collect every action section of the tree, in declaration order
pub fn action_sections(store: &ConfigStore) -> ConfigResult<Vec<ActionSection>> {
    let mut sections = Vec::new();
    for (name, node) in store.root().iter() {
        if let Some(section) = classify_section(name, node)? {
            sections.push(section);
        }
    }
    Ok(sections)
}

/// Decide whether a section declares actions.
///
/// A section is an action section when it carries a `kind` key or when its
/// name is itself a kind name. `watch` and `pkg` never are.
pub fn classify_section(name: &str, node: &ConfigNode) -> ConfigResult<Option<ActionSection>> {
    if name == WATCH_SECTION || name == PACKAGE_SECTION {
        return Ok(None);
    }

    let declared = node.as_mapping().and_then(|m| m.get("kind"));
    let kind = match declared {
        Some(kind) => {
            let kind_name = kind.as_str().ok_or_else(|| ConfigError::UnknownKind {
                section: name.to_string(),
                kind: kind.render().unwrap_or_else(|| "<mapping>".to_string()),
            })?;
            kind_name.parse().map_err(|_| ConfigError::UnknownKind {
                section: name.to_string(),
                kind: kind_name.to_string(),
            })?
        }
        None => match name.parse::<ActionKind>() {
            Ok(kind) => kind,
            Err(_) => return Ok(None),
        },
    };

    if name.contains(':') || name.contains('.') {
        return Err(ConfigError::Invalid(format!(
            "Section name '{}' may not contain ':' or '.'",
            name
        )));
    }

    let map = node.as_mapping().ok_or_else(|| {
        ConfigError::Invalid(format!(
            "Section '{}' must be a mapping of targets",
            name
        ))
    })?;

    if let Some(options) = map.get("options") {
        if !matches!(options, ConfigNode::Mapping(_) | ConfigNode::Null) {
            return Err(ConfigError::Invalid(format!(
                "'{}.options' must be a mapping",
                name
            )));
        }
    }

    let targets = target_names(map);
    if targets.is_empty() {
        return Err(ConfigError::Invalid(format!(
            "Section '{}' has no targets",
            name
        )));
    }

    for target in &targets {
        if target.contains(':') || target.contains('.') {
            return Err(ConfigError::Invalid(format!(
                "Target name '{}:{}' may not contain ':' or '.'",
                name, target
            )));
        }
    }

    Ok(Some(ActionSection {
        name: name.to_string(),
        kind,
        targets,
    }))
}

fn target_names(map: &Mapping) -> Vec<String> {
    map.keys()
        .filter(|key| !RESERVED_KEYS.contains(key))
        .map(str::to_string)
        .collect()
}

/// Validate the parts of the file outside the config tree
pub fn validate_config(file: &Kilnfile) -> ConfigResult<()> {
    if let Some(interpreter) = &file.interpreter {
        if interpreter.is_empty() {
            return Err(ConfigError::Invalid(
                "'interpreter' must name a program".to_string(),
            ));
        }
    }

    for (name, _) in &file.tasks {
        if name.trim().is_empty() {
            return Err(ConfigError::Invalid("Task names may not be empty".to_string()));
        }
        if name.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "Task name '{}' may not contain whitespace",
                name
            )));
        }
    }

    match &file.config {
        ConfigNode::Mapping(_) | ConfigNode::Null => Ok(()),
        _ => Err(ConfigError::Invalid("'config' must be a mapping".to_string())),
    }
}
