//! Execution context for task running
//!
//! The context carries what handlers need besides their options: where to
//! run, which environment to pass on, and how much to print.

use colored::Colorize;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Execution context shared by the runner and every handler
pub struct Context {
    /// Directory relative paths in the config resolve against
    pub working_dir: PathBuf,

    /// Variables from the env file, passed to spawned processes
    pub env: HashMap<String, String>,

    /// Shell used for `exec` actions and `command` overrides (e.g., ["bash", "-c"])
    pub interpreter: Vec<String>,

    /// Verbosity level
    pub verbosity: Verbosity,
}

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    Normal = 2,
    Verbose = 3,
}

impl Context {
    /// Create a new context with default settings
    pub fn new() -> Self {
        Context {
            working_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env: HashMap::new(),
            interpreter: vec!["sh".to_string(), "-c".to_string()],
            verbosity: Verbosity::Normal,
        }
    }

    /// Create a context with a specific working directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }

    /// Set environment variables for spawned processes
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Set the interpreter
    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Set verbosity level
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Print info message
    pub fn print_info(&self, message: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{} {}", "[INFO]".cyan(), message);
        }
    }

    /// Print warning message
    pub fn print_warn(&self, message: &str) {
        if self.verbosity >= Verbosity::Quiet {
            eprintln!("{} {}", "[WARN]".yellow(), message);
        }
    }

    /// Print error message
    pub fn print_error(&self, message: &str) {
        if self.verbosity >= Verbosity::Quiet {
            eprintln!("{} {}", "[ERROR]".red().bold(), message);
        }
    }

    /// Print debug message (only in verbose mode)
    pub fn print_debug(&self, message: &str) {
        if self.verbosity >= Verbosity::Verbose {
            eprintln!("{} {}", "[DEBUG]".dimmed(), message);
        }
    }

    /// Print a command line about to be spawned
    pub fn print_run(&self, command: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{} {}", "[RUN]".blue(), command);
        }
    }

    /// Print action start message
    pub fn print_action_start(&self, label: &str, position: usize, total: usize) {
        self.print_info(&format!(
            "Running \"{}\" ({}/{})",
            label.bold(),
            position,
            total
        ));
    }

    /// Print action complete message
    pub fn print_action_complete(&self, label: &str, elapsed: Duration) {
        self.print_debug(&format!("Done \"{}\" in {}", label, format_duration(elapsed)));
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Human-readable elapsed time: `850ms`, `1.2s`, `2m 5s`
pub fn format_duration(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{:.1}s", elapsed.as_secs_f64())
    } else {
        format!("{}m {}s", millis / 60_000, (millis % 60_000) / 1000)
    }
}
