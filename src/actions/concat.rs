//! Concatenate source files into a destination

use crate::actions::files::target_mappings;
use crate::actions::{ActionHandler, ResolvedAction};
use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::Context;
use std::fs;
use std::path::Path;

const DEFAULT_SEPARATOR: &str = "\n";

/// Joins sources with `separator`, wrapped in optional `banner` and `footer`
pub struct ConcatHandler;

impl ActionHandler for ConcatHandler {
    fn run(&self, action: &ResolvedAction, ctx: &Context) -> ExecutionResult<()> {
        let separator = action
            .option_str("separator")?
            .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string());
        let banner = action.option_str("banner")?.unwrap_or_default();
        let footer = action.option_str("footer")?.unwrap_or_default();

        for mapping in target_mappings(&action.data, &ctx.working_dir)? {
            let dest = mapping
                .dest
                .ok_or_else(|| ExecutionError::MissingOption("dest".to_string()))?;

            let files: Vec<_> = mapping.src.into_iter().filter(|p| p.is_file()).collect();
            if files.is_empty() {
                ctx.print_warn(&format!(
                    "{}: no source files, {} not written",
                    action.label(),
                    dest.display()
                ));
                continue;
            }

            let mut parts = Vec::with_capacity(files.len());
            for file in &files {
                parts.push(fs::read_to_string(file).map_err(|e| ExecutionError::io(file, e))?);
            }

            let mut output = banner.clone();
            output.push_str(&parts.join(&separator));
            output.push_str(&footer);

            write_file(&dest, &output)?;
            ctx.print_debug(&format!(
                "Wrote {} ({} files)",
                dest.display(),
                files.len()
            ));
        }

        Ok(())
    }
}

/// Write a file, creating parent directories as needed
pub fn write_file(path: &Path, contents: &str) -> ExecutionResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ExecutionError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| ExecutionError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionKind;
    use crate::config::ConfigNode;
    use crate::runner::LeafAction;
    use tempfile::TempDir;

    fn action(data: &str, options: Option<&str>) -> ResolvedAction {
        let leaf = LeafAction {
            kind: ActionKind::Concat,
            section: "concat".to_string(),
            target: "js".to_string(),
        };
        ResolvedAction::new(
            &leaf,
            options.map(|o| serde_yaml::from_str::<ConfigNode>(o).unwrap()),
            serde_yaml::from_str(data).unwrap(),
        )
    }

    #[test]
    fn test_concat_in_declaration_order() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/locale")).unwrap();
        fs::write(dir.path().join("src/table.js"), "table").unwrap();
        fs::write(dir.path().join("src/locale/en.js"), "en").unwrap();

        let ctx = Context::new().with_working_dir(dir.path().to_path_buf());
        ConcatHandler
            .run(
                &action(
                    "{src: [src/table.js, 'src/locale/*.js'], dest: dist/table.js}",
                    None,
                ),
                &ctx,
            )
            .unwrap();

        let out = fs::read_to_string(dir.path().join("dist/table.js")).unwrap();
        assert_eq!(out, "table\nen");
    }

    #[test]
    fn test_concat_banner_and_separator() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.js"), "a").unwrap();
        fs::write(dir.path().join("b.js"), "b").unwrap();

        let ctx = Context::new().with_working_dir(dir.path().to_path_buf());
        ConcatHandler
            .run(
                &action(
                    "{src: [a.js, b.js], dest: out.js}",
                    Some("{separator: ';', banner: '/* v1 */', footer: '//end'}"),
                ),
                &ctx,
            )
            .unwrap();

        let out = fs::read_to_string(dir.path().join("out.js")).unwrap();
        assert_eq!(out, "/* v1 */a;b//end");
    }

    #[test]
    fn test_concat_without_sources_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let ctx = Context::new().with_working_dir(dir.path().to_path_buf());
        ConcatHandler
            .run(&action("{src: missing.js, dest: out.js}", None), &ctx)
            .unwrap();
        assert!(!dir.path().join("out.js").exists());
    }

    #[test]
    fn test_concat_requires_dest() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.js"), "a").unwrap();
        let ctx = Context::new().with_working_dir(dir.path().to_path_buf());
        let result = ConcatHandler.run(&action("{src: a.js}", None), &ctx);
        assert!(matches!(result, Err(ExecutionError::MissingOption(_))));
    }
}
