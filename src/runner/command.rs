//! Process execution
//!
//! This module spawns external programs and shell commands for handlers.

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::{Context, Verbosity};
use std::path::PathBuf;
use std::process::{Command as StdCommand, Stdio};

/// A program invocation prepared by a handler
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Extra environment on top of the context's env file values
    pub env: Vec<(String, String)>,
    /// Working directory relative to the context's working directory
    pub dir: Option<PathBuf>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>) -> Self {
        ProcessSpec {
            program: program.into(),
            ..ProcessSpec::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// A shell command run through the context's interpreter
    pub fn shell(command: &str, ctx: &Context) -> Self {
        let (program, rest) = match ctx.interpreter.split_first() {
            Some((program, rest)) => (program.clone(), rest.to_vec()),
            None => ("sh".to_string(), vec!["-c".to_string()]),
        };
        ProcessSpec::new(program).args(rest).arg(command)
    }

    /// Printable form of the command line
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| quote(part))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote(part: &str) -> String {
    if !part.is_empty() && !part.contains(|c: char| c.is_whitespace() || c == '\'' || c == '"') {
        part.to_string()
    } else {
        format!("'{}'", part.replace('\'', "'\\''"))
    }
}

/// Run a prepared process, inheriting stdio
pub fn run_process(spec: &ProcessSpec, ctx: &Context) -> ExecutionResult<()> {
    if ctx.verbosity >= Verbosity::Normal {
        ctx.print_run(&spec.display());
    }

    let working_dir = match &spec.dir {
        Some(dir) => ctx.working_dir.join(dir),
        None => ctx.working_dir.clone(),
    };

    let mut command = StdCommand::new(&spec.program);
    command.args(&spec.args);
    command.current_dir(&working_dir);
    command.envs(ctx.env.iter());
    command.envs(spec.env.iter().map(|(k, v)| (k, v)));

    command.stdin(Stdio::inherit());
    if ctx.verbosity == Verbosity::Silent {
        command.stdout(Stdio::null());
        command.stderr(Stdio::null());
    } else {
        command.stdout(Stdio::inherit());
        command.stderr(Stdio::inherit());
    }

    tracing::debug!(program = %spec.program, dir = %working_dir.display(), "spawning process");
    let status = command.status().map_err(|e| ExecutionError::Spawn {
        program: spec.program.clone(),
        error: e.to_string(),
    })?;

    if !status.success() {
        return Err(ExecutionError::CommandFailed {
            program: spec.program.clone(),
            code: status.code(),
        });
    }

    Ok(())
}
