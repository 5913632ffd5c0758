//! Watch mode
//!
//! Re-runs bound tasks when files matching a binding change:
//!
//! ```text
//! notify callback ──PathBuf──▶ mpsc channel ──▶ drive loop ──▶ Runner::run
//! ```
//!
//! Runs never overlap. Changes that arrive while a run is in progress are
//! drained once it finishes and produce a single follow-up run per binding.

use crate::config::schema::WATCH_SECTION;
use crate::config::{ConfigNode, ConfigStore};
use crate::error::{ConfigError, KilnError, Result};
use crate::runner::Runner;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

/// Quiet period used to absorb bursts of events from one save
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Files to observe and the tasks to run when they change
#[derive(Debug, Clone)]
pub struct WatchBinding {
    pub name: String,
    pub files: Vec<String>,
    pub tasks: Vec<String>,
    pub debounce: Duration,
    include: GlobSet,
    exclude: GlobSet,
}

impl WatchBinding {
    /// Build a binding from its expanded config node
    pub fn from_node(name: &str, node: &ConfigNode, default_debounce: Duration) -> Result<Self> {
        let invalid = |message: &str| -> KilnError {
            ConfigError::Invalid(format!("watch.{}: {}", name, message)).into()
        };

        let files = node
            .get("files")
            .and_then(ConfigNode::string_list)
            .ok_or_else(|| invalid("'files' must be a pattern or a list of patterns"))?;
        let tasks = node
            .get("tasks")
            .and_then(ConfigNode::string_list)
            .ok_or_else(|| invalid("'tasks' must be a task name or a list of task names"))?;
        if tasks.is_empty() {
            return Err(invalid("no tasks to run"));
        }

        let debounce = match node.get("options").and_then(|o| o.get("debounce")) {
            None | Some(ConfigNode::Null) => default_debounce,
            Some(value) => debounce_from(value).ok_or_else(|| invalid("'debounce' must be milliseconds"))?,
        };

        let mut include = GlobSetBuilder::new();
        let mut exclude = GlobSetBuilder::new();
        let mut includes = 0;
        for pattern in &files {
            let (builder, raw) = match pattern.strip_prefix('!') {
                Some(negated) => (&mut exclude, negated),
                None => {
                    includes += 1;
                    (&mut include, pattern.as_str())
                }
            };
            let glob = GlobBuilder::new(raw.trim_start_matches("./"))
                .literal_separator(true)
                .build()
                .map_err(|e| invalid(&format!("bad pattern '{}': {}", pattern, e)))?;
            builder.add(glob);
        }
        if includes == 0 {
            return Err(invalid("no file patterns to watch"));
        }

        Ok(WatchBinding {
            name: name.to_string(),
            files,
            tasks,
            debounce,
            include: include.build().map_err(|e| invalid(&e.to_string()))?,
            exclude: exclude.build().map_err(|e| invalid(&e.to_string()))?,
        })
    }

    /// Whether a path relative to the watched root belongs to this binding
    pub fn matches(&self, path: &Path) -> bool {
        self.include.is_match(path) && !self.exclude.is_match(path)
    }
}

fn debounce_from(value: &ConfigNode) -> Option<Duration> {
    let millis = match value {
        ConfigNode::Integer(n) => *n,
        ConfigNode::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    u64::try_from(millis).ok().map(Duration::from_millis)
}

/// Read watch bindings from the `watch` section.
///
/// With `only`, just that binding is returned.
pub fn load_bindings(store: &ConfigStore, only: Option<&str>) -> Result<Vec<WatchBinding>> {
    let section = match store.get(WATCH_SECTION) {
        Ok(ConfigNode::Mapping(section)) => section,
        Ok(_) => {
            return Err(ConfigError::Invalid("'watch' must be a mapping of bindings".to_string()).into())
        }
        Err(_) => return Err(ConfigError::Invalid("No 'watch' section in config".to_string()).into()),
    };

    let default_debounce = if store.contains("watch.options.debounce") {
        debounce_from(&store.expand_path("watch.options.debounce")?).ok_or_else(|| {
            ConfigError::Invalid("watch.options.debounce must be milliseconds".to_string())
        })?
    } else {
        Duration::from_millis(DEFAULT_DEBOUNCE_MS)
    };

    let mut bindings = Vec::new();
    for name in section.keys().filter(|k| *k != "options") {
        if only.is_some_and(|wanted| wanted != name) {
            continue;
        }
        let node = store.expand_path(&format!("{}.{}", WATCH_SECTION, name))?;
        bindings.push(WatchBinding::from_node(name, &node, default_debounce)?);
    }

    match only {
        Some(wanted) if bindings.is_empty() => Err(ConfigError::Invalid(format!(
            "Unknown watch binding '{}'",
            wanted
        ))
        .into()),
        None if bindings.is_empty() => {
            Err(ConfigError::Invalid("The 'watch' section has no bindings".to_string()).into())
        }
        _ => Ok(bindings),
    }
}

/// Consume changed paths until the channel closes, running bindings.
///
/// `run` is called once per affected binding per batch. Returns the number
/// of binding runs performed.
pub fn drive<F>(
    rx: &Receiver<PathBuf>,
    bindings: &[WatchBinding],
    root: &Path,
    mut run: F,
) -> usize
where
    F: FnMut(&WatchBinding),
{
    let debounce = bindings
        .iter()
        .map(|b| b.debounce)
        .max()
        .unwrap_or(Duration::ZERO);

    let mut pending: BTreeSet<usize> = BTreeSet::new();
    let mut disconnected = false;
    let mut runs = 0;

    loop {
        if pending.is_empty() {
            if disconnected {
                return runs;
            }
            match rx.recv() {
                Ok(path) => collect(&path, bindings, root, &mut pending),
                Err(_) => return runs,
            }
            if pending.is_empty() {
                continue;
            }
        }

        let deadline = Instant::now() + debounce;
        while !disconnected {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match rx.recv_timeout(deadline - now) {
                Ok(path) => collect(&path, bindings, root, &mut pending),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => disconnected = true,
            }
        }

        for index in std::mem::take(&mut pending) {
            run(&bindings[index]);
            runs += 1;
        }

        // Changes made while running are folded into one follow-up batch
        while !disconnected {
            match rx.try_recv() {
                Ok(path) => collect(&path, bindings, root, &mut pending),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => disconnected = true,
            }
        }
    }
}

fn collect(path: &Path, bindings: &[WatchBinding], root: &Path, pending: &mut BTreeSet<usize>) {
    let relative = path.strip_prefix(root).unwrap_or(path);
    for (index, binding) in bindings.iter().enumerate() {
        if binding.matches(relative) {
            tracing::debug!(path = %relative.display(), binding = %binding.name, "change matched");
            pending.insert(index);
        }
    }
}

fn is_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Watches the working directory and re-runs bound tasks through a runner
pub struct Watcher<'a> {
    runner: &'a Runner<'a>,
    bindings: Vec<WatchBinding>,
}

impl<'a> Watcher<'a> {
    /// Check every bound task up front so structural errors surface before watching
    pub fn new(runner: &'a Runner<'a>, bindings: Vec<WatchBinding>) -> Result<Self> {
        for binding in &bindings {
            for task in &binding.tasks {
                runner.plan(task)?;
            }
        }
        Ok(Watcher { runner, bindings })
    }

    pub fn bindings(&self) -> &[WatchBinding] {
        &self.bindings
    }

    /// Block, running bindings as their files change
    pub fn watch(&self) -> Result<()> {
        let ctx = self.runner.context();
        let root = ctx
            .working_dir
            .canonicalize()
            .unwrap_or_else(|_| ctx.working_dir.clone());

        let (tx, rx) = mpsc::channel::<PathBuf>();
        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| match result {
                Ok(event) if is_change(&event.kind) => {
                    for path in event.paths {
                        // The receiver only goes away when watching stops
                        let _ = tx.send(path);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "watch error"),
            },
            Config::default(),
        )?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        for binding in &self.bindings {
            ctx.print_info(&format!(
                "Watching {} for {} -> {}",
                binding.files.join(", "),
                binding.name,
                binding.tasks.join(", ")
            ));
        }
        ctx.print_info("Waiting...");

        drive(&rx, &self.bindings, &root, |binding| {
            self.run_binding(binding);
            ctx.print_info("Waiting...");
        });
        Ok(())
    }

    /// Run a binding's tasks in order, stopping at the first failure
    pub fn run_binding(&self, binding: &WatchBinding) {
        let ctx = self.runner.context();
        ctx.print_info(&format!("File changed, running watch:{}", binding.name));
        for task in &binding.tasks {
            match self.runner.run(task) {
                Ok(report) => report.print_summary(ctx),
                Err(e) => {
                    ctx.print_error(&e.to_string());
                    break;
                }
            }
        }
    }
}
