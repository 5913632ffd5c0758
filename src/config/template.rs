//! Template expansion for configuration values
//!
//! Strings may reference other config paths with `<%= path.to.value %>`.
//! A string made of exactly one placeholder evaluates to the referenced node
//! itself, so lists can be shared between sections. Everywhere else the
//! referenced value is rendered to text and spliced in.

use crate::config::node::{ConfigNode, Mapping};
use crate::config::store::{split_path, ConfigStore};
use crate::error::{TemplateError, TemplateResult};
use once_cell::sync::Lazy;
use regex::Regex;

/// Matches any `<%= ... %>` placeholder
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"<%=\s*(.*?)\s*%>").unwrap());

/// A dotted config path as it may appear inside a placeholder
static PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_$-]+(?:\.[A-Za-z0-9_$-]+)*$").unwrap());

/// Upper bound on rescans of one string
const MAX_PASSES: usize = 32;

/// Check whether a string contains any placeholder
pub fn has_template(s: &str) -> bool {
    PLACEHOLDER.is_match(s)
}

/// Recursive resolver with an explicit stack of paths being expanded
pub struct Resolver<'a> {
    store: &'a ConfigStore,
    stack: Vec<String>,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a ConfigStore) -> Self {
        Resolver {
            store,
            stack: Vec::new(),
        }
    }

    /// Expand every string scalar below `node`
    pub fn expand(&mut self, node: &ConfigNode) -> TemplateResult<ConfigNode> {
        match node {
            ConfigNode::String(s) => self.expand_str(s),
            ConfigNode::Sequence(items) => items
                .iter()
                .map(|item| self.expand(item))
                .collect::<TemplateResult<Vec<_>>>()
                .map(ConfigNode::Sequence),
            ConfigNode::Mapping(map) => map
                .iter()
                .map(|(k, v)| self.expand(v).map(|v| (k.to_string(), v)))
                .collect::<TemplateResult<Mapping>>()
                .map(ConfigNode::Mapping),
            other => Ok(other.clone()),
        }
    }

    /// Resolve `path` and expand its value
    pub fn lookup(&mut self, path: &str) -> TemplateResult<ConfigNode> {
        let path = path.trim();
        split_path(path)?;

        if let Some(start) = self.stack.iter().position(|p| p == path) {
            let mut chain = self.stack[start..].to_vec();
            chain.push(path.to_string());
            return Err(TemplateError::TemplateCycle(chain.join(" -> ")));
        }

        let store = self.store;
        let node = store.get(path)?;
        self.stack.push(path.to_string());
        let result = self.expand(node);
        self.stack.pop();
        result
    }

    /// Expand until no placeholder is left, so spliced text that forms a
    /// new placeholder is resolved too
    fn expand_str(&mut self, s: &str) -> TemplateResult<ConfigNode> {
        let mut current = s.to_string();
        for _ in 0..MAX_PASSES {
            match self.expand_once(&current)? {
                ConfigNode::String(next) if next != current && has_template(&next) => {
                    current = next
                }
                done => return Ok(done),
            }
        }
        Err(TemplateError::TemplateCycle(s.to_string()))
    }

    fn expand_once(&mut self, s: &str) -> TemplateResult<ConfigNode> {
        if !has_template(s) {
            return Ok(ConfigNode::String(s.to_string()));
        }

        // A lone placeholder keeps the type of what it references
        if let Some(caps) = PLACEHOLDER.captures(s) {
            let whole = caps.get(0).map(|m| m.range());
            if whole == Some(0..s.len()) {
                let path = placeholder_path(&caps[1])?;
                return self.lookup(path);
            }
        }

        let mut out = String::with_capacity(s.len());
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(s) {
            let Some(m) = caps.get(0) else { continue };
            let path = placeholder_path(&caps[1])?;
            let value = self.lookup(path)?;
            let text = value
                .render()
                .ok_or_else(|| TemplateError::NotScalar(path.to_string()))?;

            out.push_str(&s[last..m.start()]);
            out.push_str(&text);
            last = m.end();
        }
        out.push_str(&s[last..]);

        Ok(ConfigNode::String(out))
    }
}

fn placeholder_path(body: &str) -> TemplateResult<&str> {
    if PATH.is_match(body) {
        Ok(body)
    } else {
        Err(TemplateError::InvalidSyntax(format!("<%= {} %>", body)))
    }
}
