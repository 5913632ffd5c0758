//! Run an arbitrary shell command

use crate::actions::{ActionHandler, ResolvedAction};
use crate::config::ConfigNode;
use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::command::{run_process, ProcessSpec};
use crate::runner::Context;
use std::path::PathBuf;

/// Runs `command` through the configured interpreter.
///
/// A target may be the command string itself or a mapping with `command`
/// and an optional `cwd`.
pub struct ExecHandler;

impl ActionHandler for ExecHandler {
    fn run(&self, action: &ResolvedAction, ctx: &Context) -> ExecutionResult<()> {
        let (command, cwd) = match &action.data {
            ConfigNode::Mapping(_) => (
                action
                    .data_str("command")?
                    .ok_or_else(|| ExecutionError::MissingOption("command".to_string()))?,
                action.data_str("cwd")?,
            ),
            ConfigNode::Sequence(_) | ConfigNode::Null => {
                return Err(ExecutionError::MissingOption("command".to_string()))
            }
            scalar => (scalar.render().unwrap_or_default(), None),
        };

        let mut spec = ProcessSpec::shell(&command, ctx);
        spec.dir = cwd.map(PathBuf::from);
        run_process(&spec, ctx)
    }
}
