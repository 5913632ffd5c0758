//! Leaf action kinds and their handlers
//!
//! Every leaf action names an [`ActionKind`]. The runner looks the kind up in
//! a [`HandlerTable`] and hands the handler a [`ResolvedAction`] whose options
//! have already been template-expanded.

pub mod archive;
pub mod clean;
pub mod concat;
pub mod copy;
pub mod exec;
pub mod files;
pub mod tool;

use crate::config::{ConfigNode, Mapping};
use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::{Context, LeafAction};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// The kinds of leaf action a config section can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    Clean,
    Lint,
    Concat,
    Copy,
    Minify,
    CompileStyle,
    Prefix,
    Format,
    Docs,
    ValidateMarkup,
    Archive,
    Exec,
}

impl ActionKind {
    pub const ALL: [ActionKind; 12] = [
        ActionKind::Clean,
        ActionKind::Lint,
        ActionKind::Concat,
        ActionKind::Copy,
        ActionKind::Minify,
        ActionKind::CompileStyle,
        ActionKind::Prefix,
        ActionKind::Format,
        ActionKind::Docs,
        ActionKind::ValidateMarkup,
        ActionKind::Archive,
        ActionKind::Exec,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Clean => "clean",
            ActionKind::Lint => "lint",
            ActionKind::Concat => "concat",
            ActionKind::Copy => "copy",
            ActionKind::Minify => "minify",
            ActionKind::CompileStyle => "compile-style",
            ActionKind::Prefix => "prefix",
            ActionKind::Format => "format",
            ActionKind::Docs => "docs",
            ActionKind::ValidateMarkup => "validate-markup",
            ActionKind::Archive => "archive",
            ActionKind::Exec => "exec",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown action kind '{}'", s))
    }
}

/// A leaf action with its options expanded, ready for a handler
#[derive(Debug, Clone)]
pub struct ResolvedAction {
    pub kind: ActionKind,
    pub section: String,
    pub target: String,
    /// Section-wide options overlaid with the target's own options
    pub options: Mapping,
    /// The target node without its `options` key
    pub data: ConfigNode,
}

impl ResolvedAction {
    /// Combine expanded section options and target data into a resolved action
    pub fn new(leaf: &LeafAction, section_options: Option<ConfigNode>, target: ConfigNode) -> Self {
        let mut options = match section_options {
            Some(ConfigNode::Mapping(m)) => m,
            _ => Mapping::new(),
        };

        let data = match target {
            ConfigNode::Mapping(mut m) => {
                if let Some(ConfigNode::Mapping(own)) = m.remove("options") {
                    for (key, value) in own.iter() {
                        options.insert(key, value.clone());
                    }
                }
                ConfigNode::Mapping(m)
            }
            other => other,
        };

        ResolvedAction {
            kind: leaf.kind,
            section: leaf.section.clone(),
            target: leaf.target.clone(),
            options,
            data,
        }
    }

    /// `section:target`
    pub fn label(&self) -> String {
        format!("{}:{}", self.section, self.target)
    }

    pub fn option(&self, key: &str) -> Option<&ConfigNode> {
        self.options.get(key).filter(|node| !node.is_null())
    }

    pub fn option_str(&self, key: &str) -> ExecutionResult<Option<String>> {
        match self.option(key) {
            None => Ok(None),
            Some(node) => match node {
                ConfigNode::Mapping(_) | ConfigNode::Sequence(_) => {
                    Err(invalid(key, "expected a string"))
                }
                other => Ok(other.render()),
            },
        }
    }

    pub fn require_option_str(&self, key: &str) -> ExecutionResult<String> {
        self.option_str(key)?
            .ok_or_else(|| ExecutionError::MissingOption(key.to_string()))
    }

    pub fn option_bool(&self, key: &str) -> ExecutionResult<bool> {
        match self.option(key) {
            None => Ok(false),
            Some(node) => node
                .as_bool()
                .ok_or_else(|| invalid(key, "expected true or false")),
        }
    }

    pub fn option_i64(&self, key: &str) -> ExecutionResult<Option<i64>> {
        match self.option(key) {
            None => Ok(None),
            Some(node) => node
                .as_i64()
                .map(Some)
                .ok_or_else(|| invalid(key, "expected an integer")),
        }
    }

    pub fn option_list(&self, key: &str) -> ExecutionResult<Vec<String>> {
        match self.option(key) {
            None => Ok(Vec::new()),
            Some(node) => node
                .string_list()
                .ok_or_else(|| invalid(key, "expected a string or a list of strings")),
        }
    }

    /// A string field of the target data
    pub fn data_str(&self, key: &str) -> ExecutionResult<Option<String>> {
        match self.data.get(key) {
            None | Some(ConfigNode::Null) => Ok(None),
            Some(ConfigNode::Mapping(_)) | Some(ConfigNode::Sequence(_)) => {
                Err(invalid(key, "expected a string"))
            }
            Some(other) => Ok(other.render()),
        }
    }
}

fn invalid(name: &str, error: &str) -> ExecutionError {
    ExecutionError::InvalidOption {
        name: name.to_string(),
        error: error.to_string(),
    }
}

/// A pluggable implementation of one action kind
pub trait ActionHandler {
    fn run(&self, action: &ResolvedAction, ctx: &Context) -> ExecutionResult<()>;
}

impl<F> ActionHandler for F
where
    F: Fn(&ResolvedAction, &Context) -> ExecutionResult<()>,
{
    fn run(&self, action: &ResolvedAction, ctx: &Context) -> ExecutionResult<()> {
        self(action, ctx)
    }
}

/// Handler lookup by action kind
#[derive(Default)]
pub struct HandlerTable {
    handlers: HashMap<ActionKind, Box<dyn ActionHandler>>,
}

impl HandlerTable {
    /// An empty table
    pub fn new() -> Self {
        HandlerTable::default()
    }

    /// A table with every built-in handler registered
    pub fn builtin() -> Self {
        let mut table = HandlerTable::new();
        table.register(ActionKind::Clean, clean::CleanHandler);
        table.register(ActionKind::Concat, concat::ConcatHandler);
        table.register(ActionKind::Copy, copy::CopyHandler);
        table.register(ActionKind::Archive, archive::ArchiveHandler);
        table.register(ActionKind::Exec, exec::ExecHandler);
        for kind in tool::TOOL_KINDS {
            table.register(kind, tool::ToolHandler::new(kind));
        }
        table
    }

    /// Register a handler, replacing any existing one for `kind`
    pub fn register<H>(&mut self, kind: ActionKind, handler: H)
    where
        H: ActionHandler + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
    }

    pub fn get(&self, kind: ActionKind) -> Option<&dyn ActionHandler> {
        self.handlers.get(&kind).map(|h| h.as_ref())
    }

    pub fn contains(&self, kind: ActionKind) -> bool {
        self.handlers.contains_key(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf() -> LeafAction {
        LeafAction {
            kind: ActionKind::Minify,
            section: "uglify".to_string(),
            target: "js".to_string(),
        }
    }

    #[test]
    fn test_kind_round_trips_through_names() {
        for kind in ActionKind::ALL {
            assert_eq!(kind.as_str().parse::<ActionKind>(), Ok(kind));
        }
        assert!("uglify".parse::<ActionKind>().is_err());
    }

    #[test]
    fn test_target_options_override_section_options() {
        let section: ConfigNode =
            serde_yaml::from_str("{preserve-comments: some, banner: top}").unwrap();
        let target: ConfigNode = serde_yaml::from_str(
            r#"
src: dist/a.js
dest: dist/a.min.js
options:
  preserve-comments: all
"#,
        )
        .unwrap();

        let action = ResolvedAction::new(&leaf(), Some(section), target);
        assert_eq!(
            action.option_str("preserve-comments").unwrap(),
            Some("all".to_string())
        );
        assert_eq!(action.option_str("banner").unwrap(), Some("top".to_string()));
        assert!(action.data.get("options").is_none());
        assert_eq!(action.data_str("dest").unwrap(), Some("dist/a.min.js".to_string()));
        assert_eq!(action.label(), "uglify:js");
    }

    #[test]
    fn test_option_accessors() {
        let section: ConfigNode =
            serde_yaml::from_str("{level: 9, force: true, browsers: [a, b], name: {x: 1}}")
                .unwrap();
        let action = ResolvedAction::new(&leaf(), Some(section), ConfigNode::Null);

        assert_eq!(action.option_i64("level").unwrap(), Some(9));
        assert!(action.option_bool("force").unwrap());
        assert!(!action.option_bool("missing").unwrap());
        assert_eq!(action.option_list("browsers").unwrap(), vec!["a", "b"]);
        assert!(action.option_str("name").is_err());
        assert!(matches!(
            action.require_option_str("archive"),
            Err(ExecutionError::MissingOption(_))
        ));
    }

    #[test]
    fn test_builtin_table_covers_every_kind() {
        let table = HandlerTable::builtin();
        for kind in ActionKind::ALL {
            assert!(table.contains(kind), "missing handler for {}", kind);
        }
    }

    #[test]
    fn test_register_replaces_handler() {
        let mut table = HandlerTable::new();
        table.register(ActionKind::Exec, |_: &ResolvedAction, _: &Context| {
            Err(ExecutionError::MissingOption("first".to_string()))
        });
        table.register(ActionKind::Exec, |_: &ResolvedAction, _: &Context| Ok(()));

        let action = ResolvedAction::new(&leaf(), None, ConfigNode::Null);
        let handler = table.get(ActionKind::Exec).unwrap();
        assert!(handler.run(&action, &Context::new()).is_ok());
    }
}
