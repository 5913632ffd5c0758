//! Error types for Kiln

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Kiln operations
pub type Result<T> = std::result::Result<T, KilnError>;

/// Main error type for Kiln
#[derive(Error, Debug)]
pub enum KilnError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task graph resolution errors
    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    /// Template expansion errors
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// No handler is registered for an action kind
    #[error("No handler registered for action kind '{0}'")]
    MissingHandler(String),

    /// A leaf action failed while running
    #[error("Action '{action}' (step {position} of {total}) failed: {source}")]
    ActionFailed {
        action: String,
        position: usize,
        total: usize,
        #[source]
        source: ExecutionError,
    },

    /// File watching errors
    #[error("Watch error: {0}")]
    Watch(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl KilnError {
    /// Structural errors are detected before any action has run.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            KilnError::Config(_)
                | KilnError::Task(_)
                | KilnError::Template(_)
                | KilnError::MissingHandler(_)
        )
    }
}

impl From<notify::Error> for KilnError {
    fn from(err: notify::Error) -> Self {
        KilnError::Watch(err.to_string())
    }
}

/// Configuration parsing and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find config file (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Section '{section}' has unknown kind '{kind}'")]
    UnknownKind { section: String, kind: String },

    #[error("Failed to load package metadata '{}': {error}", .path.display())]
    Package { path: PathBuf, error: String },
}

/// Task registry resolution errors
#[derive(Error, Debug, PartialEq)]
pub enum TaskError {
    #[error("Task '{name}' is not defined{}", referenced_suffix(.referenced_by))]
    UnknownTask {
        name: String,
        referenced_by: Option<String>,
    },

    #[error("Circular task reference: {0}")]
    CyclicTask(String),
}

fn referenced_suffix(parent: &Option<String>) -> String {
    match parent {
        Some(parent) => format!(" (referenced by '{}')", parent),
        None => String::new(),
    }
}

/// Template expansion errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("Config path '{0}' is not defined")]
    UnknownPath(String),

    #[error("Template cycle detected: {0}")]
    TemplateCycle(String),

    #[error("Invalid template syntax: {0}")]
    InvalidSyntax(String),

    #[error("Config path '{0}' is a mapping and cannot be embedded in a string")]
    NotScalar(String),
}

/// Errors raised by action handlers
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("'{program}' failed with exit code {code:?}")]
    CommandFailed { program: String, code: Option<i32> },

    #[error("Failed to start '{program}': {error}")]
    Spawn { program: String, error: String },

    #[error("{}: {error}", .path.display())]
    Io { path: PathBuf, error: io::Error },

    #[error("Option '{0}' is required but not provided")]
    MissingOption(String),

    #[error("Invalid option value for '{name}': {error}")]
    InvalidOption { name: String, error: String },

    #[error("Refusing to delete '{}' outside the working directory (set force: true to override)", .0.display())]
    Unsafe(PathBuf),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl ExecutionError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, error: io::Error) -> Self {
        ExecutionError::Io {
            path: path.into(),
            error,
        }
    }
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for task resolution
pub type TaskResult<T> = std::result::Result<T, TaskError>;

/// Specialized result type for template expansion
pub type TemplateResult<T> = std::result::Result<T, TemplateError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;
