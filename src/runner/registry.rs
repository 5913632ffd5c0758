//! Task registry
//!
//! Tasks are named lists of steps. A step either refers to another task by
//! name or is a leaf action bound to one target of an action section.
//! Resolution flattens a task depth-first, left to right.

use crate::actions::ActionKind;
use crate::config::schema::action_sections;
use crate::config::{ConfigStore, Kilnfile};
use crate::error::{ConfigResult, TaskError, TaskResult};
use std::collections::HashMap;
use std::fmt;

/// One step of a task
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Run another task by name
    Task(String),
    /// Run a single leaf action
    Leaf(LeafAction),
}

/// A leaf action: one target of one action section
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LeafAction {
    pub kind: ActionKind,
    pub section: String,
    pub target: String,
}

impl LeafAction {
    pub fn new(kind: ActionKind, section: impl Into<String>, target: impl Into<String>) -> Self {
        LeafAction {
            kind,
            section: section.into(),
            target: target.into(),
        }
    }

    /// `section:target`
    pub fn label(&self) -> String {
        format!("{}:{}", self.section, self.target)
    }

    /// Config path of the target data
    pub fn target_path(&self) -> String {
        format!("{}.{}", self.section, self.target)
    }

    /// Config path of the section-wide options
    pub fn options_path(&self) -> String {
        format!("{}.options", self.section)
    }
}

impl fmt::Display for LeafAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.section, self.target, self.kind)
    }
}

/// A named task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDefinition {
    pub name: String,
    pub description: Option<String>,
    pub steps: Vec<Step>,
}

/// Registered tasks, kept in registration order
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: Vec<TaskDefinition>,
    index: HashMap<String, usize>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        TaskRegistry::default()
    }

    /// Register a task, overwriting any earlier definition of the same name
    pub fn register(&mut self, name: impl Into<String>, steps: Vec<Step>) {
        self.register_definition(TaskDefinition {
            name: name.into(),
            description: None,
            steps,
        });
    }

    pub fn register_definition(&mut self, definition: TaskDefinition) {
        match self.index.get(&definition.name) {
            Some(&position) => {
                tracing::debug!(task = %definition.name, "task redefined");
                self.tasks[position] = definition;
            }
            None => {
                self.index
                    .insert(definition.name.clone(), self.tasks.len());
                self.tasks.push(definition);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&TaskDefinition> {
        self.index.get(name).map(|&i| &self.tasks[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Task names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.name.as_str())
    }

    pub fn definitions(&self) -> impl Iterator<Item = &TaskDefinition> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Flatten a task into its leaf actions.
    ///
    /// Fails on the first unknown task name or on a task that reaches itself.
    pub fn resolve(&self, name: &str) -> TaskResult<Vec<LeafAction>> {
        let mut stack = Vec::new();
        let mut memo = HashMap::new();
        self.expand(name, None, &mut stack, &mut memo)
    }

    fn expand<'a>(
        &'a self,
        name: &'a str,
        referenced_by: Option<&str>,
        stack: &mut Vec<&'a str>,
        memo: &mut HashMap<&'a str, Vec<LeafAction>>,
    ) -> TaskResult<Vec<LeafAction>> {
        if let Some(done) = memo.get(name) {
            return Ok(done.clone());
        }

        if let Some(start) = stack.iter().position(|n| *n == name) {
            let mut chain: Vec<&str> = stack[start..].to_vec();
            chain.push(name);
            return Err(TaskError::CyclicTask(chain.join(" -> ")));
        }

        let definition = self.get(name).ok_or_else(|| TaskError::UnknownTask {
            name: name.to_string(),
            referenced_by: referenced_by.map(str::to_string),
        })?;

        stack.push(&definition.name);
        let mut leaves = Vec::new();
        for step in &definition.steps {
            match step {
                Step::Leaf(leaf) => leaves.push(leaf.clone()),
                Step::Task(child) => {
                    leaves.extend(self.expand(child, Some(&definition.name), stack, memo)?)
                }
            }
        }
        stack.pop();

        memo.insert(&definition.name, leaves.clone());
        Ok(leaves)
    }

    /// Build the registry for a parsed file.
    ///
    /// Every action section registers `section` (all targets in order) and
    /// one `section:target` task per target. Aliases from `tasks:` come
    /// after and may shadow section tasks.
    pub fn from_kilnfile(file: &Kilnfile, store: &ConfigStore) -> ConfigResult<Self> {
        let mut registry = TaskRegistry::new();

        for section in action_sections(store)? {
            let mut steps = Vec::with_capacity(section.targets.len());
            for target in &section.targets {
                let leaf = LeafAction::new(section.kind, section.name.clone(), target.clone());
                let label = leaf.label();
                registry.register(label.clone(), vec![Step::Leaf(leaf)]);
                steps.push(Step::Task(label));
            }
            registry.register_definition(TaskDefinition {
                name: section.name.clone(),
                description: Some(format!("Run every {} target", section.kind)),
                steps,
            });
        }

        for (name, spec) in &file.tasks {
            registry.register_definition(TaskDefinition {
                name: name.clone(),
                description: spec.description.clone(),
                steps: spec.run.iter().cloned().map(Step::Task).collect(),
            });
        }

        Ok(registry)
    }
}
