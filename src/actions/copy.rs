//! Copy files into the output tree

use crate::actions::files::{target_mappings, FileMapping};
use crate::actions::{ActionHandler, ResolvedAction};
use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::Context;
use std::fs;
use std::path::Path;

/// Copies matched files, recreating directories
pub struct CopyHandler;

impl ActionHandler for CopyHandler {
    fn run(&self, action: &ResolvedAction, ctx: &Context) -> ExecutionResult<()> {
        let mut copied = 0;
        for mapping in target_mappings(&action.data, &ctx.working_dir)? {
            copied += copy_mapping(&mapping, &ctx.working_dir)?;
        }
        ctx.print_debug(&format!("{}: copied {} files", action.label(), copied));
        Ok(())
    }
}

fn copy_mapping(mapping: &FileMapping, base: &Path) -> ExecutionResult<usize> {
    let dest = mapping
        .dest
        .as_ref()
        .ok_or_else(|| ExecutionError::MissingOption("dest".to_string()))?;

    // A single file copied onto a file path; otherwise dest is a directory
    let into_dir = mapping.src.len() != 1
        || dest.to_string_lossy().ends_with('/')
        || (dest.is_dir() && mapping.src.iter().all(|s| s.is_file()));

    let mut copied = 0;
    for src in &mapping.src {
        let target = if into_dir {
            let rel = src.strip_prefix(base).unwrap_or(src);
            dest.join(rel)
        } else {
            dest.clone()
        };

        if src.is_dir() {
            fs::create_dir_all(&target).map_err(|e| ExecutionError::io(&target, e))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| ExecutionError::io(parent, e))?;
        }
        fs::copy(src, &target).map_err(|e| ExecutionError::io(src, e))?;
        copied += 1;
    }

    Ok(copied)
}
