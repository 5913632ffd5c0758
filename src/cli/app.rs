//! Main CLI application

use crate::actions::HandlerTable;
use crate::cli::completion::print_completions;
use crate::config::schema::WATCH_SECTION;
use crate::config::{
    build_store, load_env_file, parse_config_auto, parse_config_file, validate_config,
    ConfigNode, ConfigStore, Kilnfile,
};
use crate::error::{ConfigError, KilnError, Result};
use crate::runner::{load_bindings, Context, Runner, TaskRegistry, Verbosity, Watcher};
use clap::{Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Task run when none is named
pub const DEFAULT_TASK: &str = "default";

/// Environment variable holding the diagnostics filter
pub const LOG_ENV: &str = "KILN_LOG";

/// CLI application
pub struct App {
    /// Parsed configuration file
    file: Kilnfile,
    /// Config file path
    config_path: PathBuf,
    /// Config tree, including package metadata
    store: ConfigStore,
    /// Tasks declared by the file
    registry: TaskRegistry,
}

impl App {
    /// Create a new app from the discovered configuration file
    pub fn new() -> Result<Self> {
        let (file, config_path) = parse_config_auto()?;
        App::from_parts(file, config_path)
    }

    /// Create app with a specific config file
    pub fn with_config_file(path: PathBuf) -> Result<Self> {
        let file = parse_config_file(&path)?;
        App::from_parts(file, path)
    }

    fn from_parts(file: Kilnfile, config_path: PathBuf) -> Result<Self> {
        validate_config(&file)?;
        let store = build_store(&file, &base_dir(&config_path)?)?;
        let registry = TaskRegistry::from_kilnfile(&file, &store)?;
        Ok(App {
            file,
            config_path,
            store,
            registry,
        })
    }

    /// Build the clap command for this configuration
    pub fn command(&self) -> Command {
        build_command(&self.file, &self.store, &self.registry)
    }

    /// Run the application with the process arguments
    pub fn run(self) -> Result<()> {
        let matches = self.command().get_matches();
        self.run_matches(&matches)
    }

    fn run_matches(mut self, matches: &ArgMatches) -> Result<()> {
        let verbosity = get_verbosity(matches);
        init_tracing(verbosity);

        if let Some(shell) = matches.get_one::<Shell>("completions") {
            print_completions(*shell, &mut self.command());
            return Ok(());
        }

        let (task_name, extra) = match matches.subcommand() {
            Some((name, sub_matches)) => (name.to_string(), external_args(sub_matches)),
            None => (DEFAULT_TASK.to_string(), Vec::new()),
        };
        if !extra.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "Unexpected arguments after '{}': {} (options go before the task name)",
                task_name,
                extra.join(" ")
            ))
            .into());
        }

        let overrides: Vec<&String> = matches
            .get_many::<String>("set")
            .map(|values| values.collect())
            .unwrap_or_default();
        if !overrides.is_empty() {
            for raw in overrides {
                let (path, value) = parse_set_override(raw)?;
                self.store.set(&path, value)?;
            }
            self.registry = TaskRegistry::from_kilnfile(&self.file, &self.store)?;
        }

        if matches.get_flag("list") {
            print_task_list(&self.registry, &self.store);
            return Ok(());
        }

        let base = base_dir(&self.config_path)?;
        let mut ctx = Context::new()
            .with_working_dir(base.clone())
            .with_env(load_env_file(&self.file, &base)?)
            .with_verbosity(verbosity);

        // Set interpreter if specified in config
        if let Some(interpreter) = &self.file.interpreter {
            ctx = ctx.with_interpreter(interpreter.clone());
        }

        let handlers = HandlerTable::builtin();
        let runner = Runner::new(&self.store, &self.registry, &handlers, &ctx);
        let dry_run = matches.get_flag("dry-run");

        if let Some(binding) = watch_target(&task_name, &self.registry) {
            let bindings = load_bindings(&self.store, binding)?;
            let watcher = Watcher::new(&runner, bindings)?;
            if dry_run {
                for binding in watcher.bindings() {
                    println!(
                        "watch:{}  {}  ->  {}",
                        binding.name,
                        binding.files.join(", "),
                        binding.tasks.join(", ")
                    );
                }
                return Ok(());
            }
            return watcher.watch();
        }

        if dry_run {
            let leaves = runner.plan(&task_name)?;
            for (index, leaf) in leaves.iter().enumerate() {
                println!("{:>3}. {}", index + 1, leaf);
            }
            return Ok(());
        }

        let report = runner.run(&task_name)?;
        report.print_summary(&ctx);
        ctx.print_info(&"Done, without errors.".green().to_string());
        Ok(())
    }
}

/// Absolute directory that relative paths in the config resolve against
fn base_dir(config_path: &Path) -> Result<PathBuf> {
    let parent = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if parent.is_absolute() {
        return Ok(parent);
    }
    let dir = std::env::current_dir()?.join(parent);
    Ok(dir.canonicalize().unwrap_or(dir))
}

/// `watch` or `watch:<binding>`, unless a task of that name exists
fn watch_target<'a>(task_name: &'a str, registry: &TaskRegistry) -> Option<Option<&'a str>> {
    if registry.contains(task_name) {
        return None;
    }
    if task_name == WATCH_SECTION {
        return Some(None);
    }
    task_name
        .strip_prefix(WATCH_SECTION)
        .and_then(|rest| rest.strip_prefix(':'))
        .map(Some)
}

/// Build the clap command from configuration
fn build_command(file: &Kilnfile, store: &ConfigStore, registry: &TaskRegistry) -> Command {
    let mut cmd = Command::new(file.name.clone().unwrap_or_else(|| "kiln".to_string()))
        .version(env!("CARGO_PKG_VERSION"))
        .about(file.usage.clone().unwrap_or_else(|| {
            "A declarative YAML build pipeline runner".to_string()
        }))
        .allow_external_subcommands(true)
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Path to kiln.yml config file")
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print command output and errors")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output and a timing summary")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("set")
                .long("set")
                .value_name("PATH=VALUE")
                .help("Override a config value (VALUE is parsed as YAML)")
                .action(ArgAction::Append)
                .global(true),
        )
        .arg(
            Arg::new("dry-run")
                .short('n')
                .long("dry-run")
                .help("Print the actions a task would run without running them")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .help("List available tasks")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("completions")
                .long("completions")
                .value_name("SHELL")
                .help("Print shell completions")
                .value_parser(clap::value_parser!(Shell)),
        );

    // Add subcommands for each task; `section:target` names come in as
    // external subcommands
    for definition in registry.definitions() {
        if definition.name.contains(':') {
            continue;
        }

        let mut task_cmd = Command::new(definition.name.clone());
        if let Some(desc) = &definition.description {
            task_cmd = task_cmd.about(desc.clone());
        }
        cmd = cmd.subcommand(task_cmd);
    }

    if !registry.contains(WATCH_SECTION) && store.contains(WATCH_SECTION) {
        cmd = cmd.subcommand(
            Command::new(WATCH_SECTION).about("Watch files and re-run bound tasks"),
        );
    }

    cmd
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Trailing arguments captured by an external subcommand
fn external_args(matches: &ArgMatches) -> Vec<String> {
    // Only external subcommands define the unnamed argument
    matches
        .try_get_many::<std::ffi::OsString>("")
        .ok()
        .flatten()
        .map(|values| {
            values
                .map(|v| v.to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}

/// Split `PATH=VALUE`; the value is read as a YAML scalar
fn parse_set_override(raw: &str) -> Result<(String, ConfigNode)> {
    match raw.split_once('=') {
        Some((path, value)) if !path.trim().is_empty() => {
            Ok((path.trim().to_string(), ConfigNode::parse_scalar(value)))
        }
        _ => Err(ConfigError::Invalid(format!(
            "--set expects PATH=VALUE, got '{}'",
            raw
        ))
        .into()),
    }
}

fn print_task_list(registry: &TaskRegistry, store: &ConfigStore) {
    let width = registry.names().map(str::len).max().unwrap_or(0);
    for definition in registry.definitions() {
        let description = definition.description.clone().unwrap_or_default();
        println!(
            "  {:<width$}  {}",
            definition.name,
            description.dimmed(),
            width = width
        );
    }

    if !registry.contains(WATCH_SECTION) {
        if let Ok(bindings) = load_bindings(store, None) {
            for binding in bindings {
                println!(
                    "  {}  {}",
                    format!("watch:{}", binding.name),
                    format!("runs {} on change", binding.tasks.join(", ")).dimmed()
                );
            }
        }
    }
}

/// Install the diagnostics subscriber; `KILN_LOG` overrides the level
fn init_tracing(verbosity: Verbosity) {
    let default = match verbosity {
        Verbosity::Verbose => "kiln=debug",
        _ => "warn",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    // A second initialization (e.g. in tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Run the CLI application with provided arguments
pub fn run() -> Result<()> {
    // Check if --file flag is provided first
    let args: Vec<String> = std::env::args().collect();
    let file_path = extract_file_arg(&args);

    let app = if let Some(path) = file_path {
        App::with_config_file(path)?
    } else {
        App::new()?
    };

    app.run()
}

/// Extract --file argument before clap parsing
fn extract_file_arg(args: &[String]) -> Option<PathBuf> {
    for i in 0..args.len() {
        if let Some(path) = args[i].strip_prefix("--file=") {
            return Some(PathBuf::from(path));
        }
        if (args[i] == "--file" || args[i] == "-f") && i + 1 < args.len() {
            return Some(PathBuf::from(&args[i + 1]));
        }
    }
    None
}

/// Print a top-level error the way the binary reports it
pub fn report_error(error: &KilnError) {
    eprintln!("{} {}", "Error:".red().bold(), error);
    if error.is_structural() {
        eprintln!("{}", "No actions were run.".dimmed());
    }
}
