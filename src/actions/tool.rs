//! Actions backed by external command-line tools
//!
//! Each kind builds the argument list of a well-known CLI from the action's
//! options and file specs. Every kind also accepts:
//!
//! - `bin`: the program to run instead of the default
//! - `args`: extra arguments appended to each command
//! - `command`: a complete shell command replacing the generated ones

use crate::actions::files::{target_mappings, target_sources};
use crate::actions::{ActionHandler, ActionKind, ResolvedAction};
use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::command::{run_process, ProcessSpec};
use crate::runner::Context;
use std::fs;
use std::path::{Path, PathBuf};

/// Kinds handled by [`ToolHandler`]
pub const TOOL_KINDS: [ActionKind; 7] = [
    ActionKind::Lint,
    ActionKind::Minify,
    ActionKind::CompileStyle,
    ActionKind::Prefix,
    ActionKind::Format,
    ActionKind::Docs,
    ActionKind::ValidateMarkup,
];

/// Work prepared for one tool-backed action
#[derive(Debug, Default, PartialEq)]
pub struct ToolPlan {
    /// Scratch files written before the commands run and removed afterwards
    pub scratch: Vec<(PathBuf, String)>,
    pub commands: Vec<ProcessSpec>,
}

/// Spawns the external tool for one action kind
pub struct ToolHandler {
    kind: ActionKind,
}

impl ToolHandler {
    pub fn new(kind: ActionKind) -> Self {
        ToolHandler { kind }
    }

    /// Build the commands for an action without running anything
    pub fn plan(&self, action: &ResolvedAction, ctx: &Context) -> ExecutionResult<ToolPlan> {
        if let Some(command) = action.option_str("command")? {
            return Ok(ToolPlan {
                scratch: Vec::new(),
                commands: vec![ProcessSpec::shell(&command, ctx)],
            });
        }

        let base = ctx.working_dir.as_path();
        let mut scratch = Vec::new();
        let mut commands = match self.kind {
            ActionKind::Lint => lint(action, base)?,
            ActionKind::Minify => minify(action, base)?,
            ActionKind::CompileStyle => compile_style(action, base)?,
            ActionKind::Prefix => prefix(action, base)?,
            ActionKind::Format => format(action, base)?,
            ActionKind::Docs => docs(action, &mut scratch)?,
            ActionKind::ValidateMarkup => validate_markup(action, base)?,
            other => {
                return Err(ExecutionError::InvalidOption {
                    name: "kind".to_string(),
                    error: format!("{} is not a tool-backed kind", other),
                })
            }
        };

        let extra = action.option_list("args")?;
        for command in &mut commands {
            command.args.extend(extra.iter().cloned());
        }
        Ok(ToolPlan { scratch, commands })
    }
}

impl ActionHandler for ToolHandler {
    fn run(&self, action: &ResolvedAction, ctx: &Context) -> ExecutionResult<()> {
        let plan = self.plan(action, ctx)?;
        if plan.commands.is_empty() {
            ctx.print_warn(&format!("{}: no files to process", action.label()));
            return Ok(());
        }

        for (path, contents) in &plan.scratch {
            fs::write(path, contents).map_err(|e| ExecutionError::io(path, e))?;
        }

        let result = plan
            .commands
            .iter()
            .try_for_each(|command| run_process(command, ctx));

        for (path, _) in &plan.scratch {
            if let Err(e) = fs::remove_file(path) {
                tracing::debug!(path = %path.display(), error = %e, "could not remove scratch file");
            }
        }
        result
    }
}

fn program(action: &ResolvedAction, default: &str) -> ExecutionResult<String> {
    Ok(action
        .option_str("bin")?
        .unwrap_or_else(|| default.to_string()))
}

fn relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

/// Existing source files of the target, relative to `base`
fn source_files(action: &ResolvedAction, base: &Path) -> ExecutionResult<Vec<String>> {
    Ok(target_sources(&action.data, base)?
        .iter()
        .filter(|p| p.is_file())
        .map(|p| relative(p, base))
        .collect())
}

/// Source/destination pairs, skipping mappings without existing sources
fn file_pairs(
    action: &ResolvedAction,
    base: &Path,
) -> ExecutionResult<Vec<(Vec<String>, String)>> {
    let mut pairs = Vec::new();
    for mapping in target_mappings(&action.data, base)? {
        let dest = mapping
            .dest
            .ok_or_else(|| ExecutionError::MissingOption("dest".to_string()))?;
        let src: Vec<String> = mapping
            .src
            .iter()
            .filter(|p| p.is_file())
            .map(|p| relative(p, base))
            .collect();
        if !src.is_empty() {
            pairs.push((src, relative(&dest, base)));
        }
    }
    Ok(pairs)
}

fn lint(action: &ResolvedAction, base: &Path) -> ExecutionResult<Vec<ProcessSpec>> {
    let files = source_files(action, base)?;
    if files.is_empty() {
        return Ok(Vec::new());
    }

    let mut spec = ProcessSpec::new(program(action, "jshint")?);
    if let Some(config) = action.option_str("config")? {
        spec = spec.arg("--config").arg(config);
    }
    Ok(vec![spec.args(files)])
}

fn minify(action: &ResolvedAction, base: &Path) -> ExecutionResult<Vec<ProcessSpec>> {
    let comments = action.option_str("preserve-comments")?;
    let compatibility = action.option_str("compatibility")?;

    let mut specs = Vec::new();
    for (src, dest) in file_pairs(action, base)? {
        let spec = if dest.ends_with(".css") {
            let mut spec = ProcessSpec::new(program(action, "cleancss")?)
                .arg("-o")
                .arg(dest);
            if let Some(compatibility) = &compatibility {
                spec = spec.arg("--compatibility").arg(compatibility.as_str());
            }
            spec.args(src)
        } else {
            let spec = ProcessSpec::new(program(action, "uglifyjs")?)
                .args(src)
                .arg("-o")
                .arg(dest);
            match comments.as_deref() {
                None | Some("false") | Some("none") => spec,
                Some("some") => spec.arg("--comments"),
                Some("all") => spec.arg("--comments").arg("all"),
                Some(other) => {
                    return Err(ExecutionError::InvalidOption {
                        name: "preserve-comments".to_string(),
                        error: format!("expected some, all or false, got '{}'", other),
                    })
                }
            }
        };
        specs.push(spec);
    }
    Ok(specs)
}

fn compile_style(action: &ResolvedAction, base: &Path) -> ExecutionResult<Vec<ProcessSpec>> {
    let mut specs = Vec::new();
    for (src, dest) in file_pairs(action, base)? {
        if src.len() > 1 {
            return Err(ExecutionError::InvalidOption {
                name: "src".to_string(),
                error: format!("{} has more than one entry file", dest),
            });
        }

        let mut spec = ProcessSpec::new(program(action, "lessc")?);
        if action.option_bool("strict-math")? {
            spec = spec.arg("--strict-math=on");
        }
        if action.option_bool("source-map")? {
            let filename = action
                .option_str("source-map-filename")?
                .unwrap_or_else(|| format!("{}.map", dest));
            spec = spec.arg(format!("--source-map={}", filename));
            if let Some(url) = action.option_str("source-map-url")? {
                spec = spec.arg(format!("--source-map-url={}", url));
            }
            if action.option_bool("output-source-files")? {
                spec = spec.arg("--source-map-include-source");
            }
        }
        specs.push(spec.args(src).arg(dest));
    }
    Ok(specs)
}

fn prefix(action: &ResolvedAction, base: &Path) -> ExecutionResult<Vec<ProcessSpec>> {
    let files = source_files(action, base)?;
    if files.is_empty() {
        return Ok(Vec::new());
    }

    let mut spec = ProcessSpec::new(program(action, "postcss")?)
        .args(files)
        .arg("--use")
        .arg("autoprefixer")
        .arg("--replace");
    if action.option("map").is_some() {
        spec = spec.arg(if action.option_bool("map")? {
            "--map"
        } else {
            "--no-map"
        });
    }

    let browsers = action.option_list("browsers")?;
    if !browsers.is_empty() {
        spec = spec.env("BROWSERSLIST", browsers.join(", "));
    }
    Ok(vec![spec])
}

/// Reorders properties in place
fn format(action: &ResolvedAction, base: &Path) -> ExecutionResult<Vec<ProcessSpec>> {
    let mut files = Vec::new();
    for mapping in target_mappings(&action.data, base)? {
        if let (Some(dest), [src]) = (&mapping.dest, mapping.src.as_slice()) {
            if dest != src && !dest.is_dir() {
                return Err(ExecutionError::InvalidOption {
                    name: "dest".to_string(),
                    error: format!(
                        "{} formats in place and cannot write to {}",
                        relative(src, base),
                        relative(dest, base)
                    ),
                });
            }
        }
        for src in mapping.src.iter().filter(|p| p.is_file()) {
            let file = relative(src, base);
            if !files.contains(&file) {
                files.push(file);
            }
        }
    }
    if files.is_empty() {
        return Ok(Vec::new());
    }

    let mut spec = ProcessSpec::new(program(action, "csscomb")?);
    if let Some(config) = action.option_str("config")? {
        spec = spec.arg("--config").arg(config);
    }
    Ok(vec![spec.args(files)])
}

fn docs(
    action: &ResolvedAction,
    scratch: &mut Vec<(PathBuf, String)>,
) -> ExecutionResult<Vec<ProcessSpec>> {
    let mut spec = ProcessSpec::new(program(action, "jekyll")?).arg("build");

    let mut configs = Vec::new();
    if let Some(config) = action.option_str("config")? {
        configs.push(config);
    }
    if let Some(raw) = action.option_str("raw")? {
        let path = std::env::temp_dir().join(format!(
            "kiln-{}-{}-{}.yml",
            std::process::id(),
            action.section,
            action.target
        ));
        configs.push(path.to_string_lossy().into_owned());
        scratch.push((path, format!("{}\n", raw)));
    }
    if !configs.is_empty() {
        spec = spec.arg("--config").arg(configs.join(","));
    }

    if let Some(source) = action.option_str("src")? {
        spec = spec.arg("--source").arg(source);
    }
    if let Some(destination) = action.option_str("dest")? {
        spec = spec.arg("--destination").arg(destination);
    }
    Ok(vec![spec])
}

fn validate_markup(action: &ResolvedAction, base: &Path) -> ExecutionResult<Vec<ProcessSpec>> {
    let files = source_files(action, base)?;
    if files.is_empty() {
        return Ok(Vec::new());
    }

    let mut spec = ProcessSpec::new(program(action, "vnu")?).arg("--errors-only");
    let ignore = action.option_list("ignore")?;
    if !ignore.is_empty() {
        spec = spec.arg("--filterpattern").arg(ignore_pattern(&ignore));
    }
    Ok(vec![spec.args(files)])
}

/// A pattern matching any message that contains one of `messages` verbatim
fn ignore_pattern(messages: &[String]) -> String {
    let alternatives: Vec<String> = messages.iter().map(|m| regex::escape(m)).collect();
    format!(".*(?:{}).*", alternatives.join("|"))
}
