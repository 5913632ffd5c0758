//! Core configuration types
//!
//! This module defines the data structures that represent a kiln.yml file.

use crate::config::node::ConfigNode;
use serde::{Deserialize, Serialize};

/// Top-level configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Kilnfile {
    /// Application name (optional)
    #[serde(default)]
    pub name: Option<String>,

    /// Application usage description (optional)
    #[serde(default)]
    pub usage: Option<String>,

    /// JSON package metadata mounted at `pkg` in the config tree
    #[serde(default)]
    pub package: Option<String>,

    /// Interpreter for shell commands (e.g., ["sh", "-c"])
    #[serde(default)]
    pub interpreter: Option<Vec<String>>,

    /// Dotenv file whose values are passed to spawned processes
    #[serde(rename = "env-file", default)]
    pub env_file: Option<String>,

    /// The configuration tree
    #[serde(default)]
    pub config: ConfigNode,

    /// Named task aliases, in declaration order
    #[serde(default, deserialize_with = "deserialize_tasks")]
    pub tasks: Vec<(String, TaskSpec)>,
}

/// An alias task definition
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TaskSpec {
    /// Description for help text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Steps to run, by task name
    #[serde(default, deserialize_with = "deserialize_steps")]
    pub run: Vec<String>,
}

/// Task entries may be a bare step list or a mapping with a description
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTask {
    Steps(StringOrList),
    Detailed(TaskSpec),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl From<StringOrList> for Vec<String> {
    fn from(value: StringOrList) -> Self {
        match value {
            StringOrList::One(s) => vec![s],
            StringOrList::Many(v) => v,
        }
    }
}

/// Custom deserializer for the task table that keeps declaration order
fn deserialize_tasks<'de, D>(deserializer: D) -> Result<Vec<(String, TaskSpec)>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let value = Value::deserialize(deserializer)?;

    match value {
        Value::Mapping(map) => {
            let mut tasks = Vec::new();
            for (key, item) in map {
                let name = key
                    .as_str()
                    .ok_or_else(|| D::Error::custom("task names must be strings"))?
                    .to_string();
                let raw = RawTask::deserialize(item).map_err(|e| {
                    D::Error::custom(format!("task '{}': {}", name, e))
                })?;
                let spec = match raw {
                    RawTask::Steps(steps) => TaskSpec {
                        description: None,
                        run: steps.into(),
                    },
                    RawTask::Detailed(spec) => spec,
                };
                tasks.push((name, spec));
            }
            Ok(tasks)
        }
        Value::Null => Ok(Vec::new()),
        _ => Err(D::Error::custom("tasks must be a mapping")),
    }
}

/// Custom deserializer for steps that handles both single values and arrays
fn deserialize_steps<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<StringOrList>::deserialize(deserializer)?
        .map(Vec::from)
        .unwrap_or_default())
}
