//! Task runner
//!
//! Resolves a task to its leaf actions, checks them all before anything
//! runs, then executes them in order through the handler table. The first
//! failing action stops the run; whatever earlier actions did stays done.

use crate::actions::{HandlerTable, ResolvedAction};
use crate::config::ConfigStore;
use crate::error::{KilnError, Result, TemplateResult};
use crate::runner::context::format_duration;
use crate::runner::{Context, LeafAction, TaskRegistry, Verbosity};
use colored::Colorize;
use std::time::{Duration, Instant};

/// Elapsed time of one executed action
#[derive(Debug, Clone, PartialEq)]
pub struct StepTiming {
    pub label: String,
    pub elapsed: Duration,
}

/// Outcome of a successful run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub task: String,
    pub steps: Vec<StepTiming>,
    pub elapsed: Duration,
}

impl RunReport {
    /// Labels of the executed actions, in order
    pub fn labels(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.label.as_str()).collect()
    }

    /// Per-action timing table, shown in verbose mode
    pub fn print_summary(&self, ctx: &Context) {
        if ctx.verbosity < Verbosity::Verbose || self.steps.is_empty() {
            return;
        }

        let width = self.steps.iter().map(|s| s.label.len()).max().unwrap_or(0);
        let total = self.elapsed.as_secs_f64().max(f64::EPSILON);

        eprintln!();
        eprintln!(
            "{} {}",
            "Execution Time".bold(),
            format!("({})", self.task).dimmed()
        );
        for step in &self.steps {
            let share = step.elapsed.as_secs_f64() / total * 100.0;
            eprintln!(
                "  {:<width$}  {:>8}  {:>3.0}%",
                step.label,
                format_duration(step.elapsed),
                share,
                width = width
            );
        }
        eprintln!(
            "  {:<width$}  {:>8}",
            "Total".bold(),
            format_duration(self.elapsed),
            width = width
        );
    }
}

/// Runs tasks against one config store and registry
pub struct Runner<'a> {
    store: &'a ConfigStore,
    registry: &'a TaskRegistry,
    handlers: &'a HandlerTable,
    ctx: &'a Context,
}

impl<'a> Runner<'a> {
    pub fn new(
        store: &'a ConfigStore,
        registry: &'a TaskRegistry,
        handlers: &'a HandlerTable,
        ctx: &'a Context,
    ) -> Self {
        Runner {
            store,
            registry,
            handlers,
            ctx,
        }
    }

    pub fn context(&self) -> &Context {
        self.ctx
    }

    /// Resolve a task and check every leaf without running anything.
    ///
    /// Fails when a task is unknown or cyclic, when a leaf kind has no
    /// handler, or when a leaf's options do not expand.
    pub fn plan(&self, task: &str) -> Result<Vec<LeafAction>> {
        let leaves = self.registry.resolve(task)?;
        for leaf in &leaves {
            if !self.handlers.contains(leaf.kind) {
                return Err(KilnError::MissingHandler(leaf.kind.to_string()));
            }
            self.resolve_action(leaf)?;
        }
        tracing::debug!(task, leaves = leaves.len(), "planned task");
        Ok(leaves)
    }

    /// Expand a leaf's section options and target data
    pub fn resolve_action(&self, leaf: &LeafAction) -> TemplateResult<ResolvedAction> {
        let options_path = leaf.options_path();
        let options = if self.store.contains(&options_path) {
            Some(self.store.expand_path(&options_path)?)
        } else {
            None
        };
        let target = self.store.expand_path(&leaf.target_path())?;
        Ok(ResolvedAction::new(leaf, options, target))
    }

    /// Run a task to completion or to its first failing action
    pub fn run(&self, task: &str) -> Result<RunReport> {
        let span = tracing::info_span!("run", task);
        let _enter = span.enter();

        let leaves = self.plan(task)?;
        let total = leaves.len();
        let started = Instant::now();
        let mut report = RunReport {
            task: task.to_string(),
            ..RunReport::default()
        };

        for (index, leaf) in leaves.iter().enumerate() {
            let position = index + 1;
            let label = leaf.label();

            let action = self.resolve_action(leaf)?;
            let handler = self
                .handlers
                .get(leaf.kind)
                .ok_or_else(|| KilnError::MissingHandler(leaf.kind.to_string()))?;

            self.ctx.print_action_start(&label, position, total);
            tracing::debug!(action = %label, kind = %leaf.kind, "running action");

            let step_started = Instant::now();
            handler
                .run(&action, self.ctx)
                .map_err(|source| KilnError::ActionFailed {
                    action: label.clone(),
                    position,
                    total,
                    source,
                })?;

            let elapsed = step_started.elapsed();
            self.ctx.print_action_complete(&label, elapsed);
            report.steps.push(StepTiming { label, elapsed });
        }

        report.elapsed = started.elapsed();
        tracing::debug!(actions = ?report.labels(), "run finished");
        Ok(report)
    }
}
