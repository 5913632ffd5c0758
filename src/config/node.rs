//! Configuration tree
//!
//! A `ConfigNode` is the typed form of everything under `config:` in a
//! kiln.yml file. Mappings keep declaration order because target order
//! decides execution order.

use serde::Deserialize;

/// A node in the configuration tree
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "serde_yaml::Value")]
pub enum ConfigNode {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<ConfigNode>),
    Mapping(Mapping),
}

/// An ordered string-keyed mapping
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mapping {
    entries: Vec<(String, ConfigNode)>,
}

impl Mapping {
    pub fn new() -> Self {
        Mapping::default()
    }

    pub fn get(&self, key: &str) -> Option<&ConfigNode> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut ConfigNode> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Insert a value, replacing an existing key in place
    pub fn insert(&mut self, key: impl Into<String>, value: ConfigNode) {
        let key = key.into();
        match self.get_mut(&key) {
            Some(slot) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<ConfigNode> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, ConfigNode)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (String, ConfigNode)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        for (k, v) in iter {
            mapping.insert(k, v);
        }
        mapping
    }
}

impl ConfigNode {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigNode::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigNode::Bool(b) => Some(*b),
            ConfigNode::String(s) if s == "true" => Some(true),
            ConfigNode::String(s) if s == "false" => Some(false),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigNode::Integer(i) => Some(*i),
            ConfigNode::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            ConfigNode::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConfigNode::Null)
    }

    /// Look up a key when this node is a mapping
    pub fn get(&self, key: &str) -> Option<&ConfigNode> {
        self.as_mapping().and_then(|m| m.get(key))
    }

    /// Scalar form used when a value is embedded into a larger string.
    ///
    /// Sequences join their elements with `,`. Mappings have no scalar form.
    pub fn render(&self) -> Option<String> {
        match self {
            ConfigNode::Null => Some(String::new()),
            ConfigNode::Bool(b) => Some(b.to_string()),
            ConfigNode::Integer(i) => Some(i.to_string()),
            ConfigNode::Float(f) => Some(f.to_string()),
            ConfigNode::String(s) => Some(s.clone()),
            ConfigNode::Sequence(items) => items
                .iter()
                .map(ConfigNode::render)
                .collect::<Option<Vec<_>>>()
                .map(|parts| parts.join(",")),
            ConfigNode::Mapping(_) => None,
        }
    }

    /// Collect a string or a sequence of scalars into a list of strings
    pub fn string_list(&self) -> Option<Vec<String>> {
        match self {
            ConfigNode::Null => Some(Vec::new()),
            ConfigNode::Sequence(items) => items
                .iter()
                .map(|item| match item {
                    ConfigNode::Mapping(_) | ConfigNode::Sequence(_) => None,
                    other => other.render(),
                })
                .collect(),
            ConfigNode::Mapping(_) => None,
            other => other.render().map(|s| vec![s]),
        }
    }

    /// Parse a command-line value (`--set path=value`) as a YAML scalar
    pub fn parse_scalar(raw: &str) -> ConfigNode {
        serde_yaml::from_str::<serde_yaml::Value>(raw)
            .map(ConfigNode::from)
            .unwrap_or_else(|_| ConfigNode::String(raw.to_string()))
    }
}

fn key_string(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

impl From<serde_yaml::Value> for ConfigNode {
    fn from(value: serde_yaml::Value) -> Self {
        use serde_yaml::Value;

        match value {
            Value::Null => ConfigNode::Null,
            Value::Bool(b) => ConfigNode::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ConfigNode::Integer(i),
                None => ConfigNode::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => ConfigNode::String(s),
            Value::Sequence(seq) => {
                ConfigNode::Sequence(seq.into_iter().map(ConfigNode::from).collect())
            }
            Value::Mapping(map) => ConfigNode::Mapping(
                map.into_iter()
                    .map(|(k, v)| (key_string(k), ConfigNode::from(v)))
                    .collect(),
            ),
            Value::Tagged(tagged) => ConfigNode::from(tagged.value),
        }
    }
}

impl From<serde_json::Value> for ConfigNode {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => ConfigNode::Null,
            Value::Bool(b) => ConfigNode::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ConfigNode::Integer(i),
                None => ConfigNode::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => ConfigNode::String(s),
            Value::Array(items) => {
                ConfigNode::Sequence(items.into_iter().map(ConfigNode::from).collect())
            }
            Value::Object(map) => ConfigNode::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, ConfigNode::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for ConfigNode {
    fn from(s: &str) -> Self {
        ConfigNode::String(s.to_string())
    }
}

impl From<String> for ConfigNode {
    fn from(s: String) -> Self {
        ConfigNode::String(s)
    }
}

impl From<Mapping> for ConfigNode {
    fn from(m: Mapping) -> Self {
        ConfigNode::Mapping(m)
    }
}
