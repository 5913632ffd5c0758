//! Remove build outputs

use crate::actions::files::target_sources;
use crate::actions::{ActionHandler, ResolvedAction};
use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::Context;
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Deletes every file or directory the target matches
pub struct CleanHandler;

impl ActionHandler for CleanHandler {
    fn run(&self, action: &ResolvedAction, ctx: &Context) -> ExecutionResult<()> {
        let force = action.option_bool("force")?;
        let targets = target_sources(&action.data, &ctx.working_dir)?;

        if targets.is_empty() {
            ctx.print_debug(&format!("{}: nothing to clean", action.label()));
        }

        for path in targets {
            if !force && !is_inside(&ctx.working_dir, &path) {
                return Err(ExecutionError::Unsafe(path));
            }

            ctx.print_debug(&format!("Removing {}", path.display()));
            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            result.map_err(|e| ExecutionError::io(&path, e))?;
        }

        Ok(())
    }
}

/// Whether `path` lies strictly below `root` once both are absolute and
/// normalized. Paths that cannot be made absolute are never inside.
fn is_inside(root: &Path, path: &Path) -> bool {
    match (absolute(root), absolute(path)) {
        (Some(root), Some(path)) => path != root && path.starts_with(&root),
        _ => false,
    }
}

fn absolute(path: &Path) -> Option<PathBuf> {
    let full = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().ok()?.join(path)
    };
    Some(normalize(&full))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
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
            kind: ActionKind::Clean,
            section: "clean".to_string(),
            target: "dist".to_string(),
        };
        ResolvedAction::new(
            &leaf,
            options.map(|o| serde_yaml::from_str::<ConfigNode>(o).unwrap()),
            serde_yaml::from_str(data).unwrap(),
        )
    }

    #[test]
    fn test_clean_removes_directory_and_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("dist/css")).unwrap();
        fs::write(dir.path().join("dist/css/a.css"), "a").unwrap();
        fs::write(dir.path().join("keep.txt"), "k").unwrap();
        fs::write(dir.path().join("old.log"), "l").unwrap();

        let ctx = Context::new().with_working_dir(dir.path().to_path_buf());
        CleanHandler
            .run(&action("[dist, '*.log']", None), &ctx)
            .unwrap();

        assert!(!dir.path().join("dist").exists());
        assert!(!dir.path().join("old.log").exists());
        assert!(dir.path().join("keep.txt").exists());
    }

    #[test]
    fn test_clean_missing_target_is_noop() {
        let dir = TempDir::new().unwrap();
        let ctx = Context::new().with_working_dir(dir.path().to_path_buf());
        assert!(CleanHandler.run(&action("dist", None), &ctx).is_ok());
    }

    #[test]
    fn test_clean_refuses_paths_outside_working_dir() {
        let outer = TempDir::new().unwrap();
        let work = outer.path().join("work");
        fs::create_dir_all(&work).unwrap();
        fs::write(outer.path().join("precious.txt"), "p").unwrap();

        let ctx = Context::new().with_working_dir(work.clone());
        let result = CleanHandler.run(&action("../precious.txt", None), &ctx);
        assert!(matches!(result, Err(ExecutionError::Unsafe(_))));
        assert!(outer.path().join("precious.txt").exists());

        CleanHandler
            .run(&action("../precious.txt", Some("{force: true}")), &ctx)
            .unwrap();
        assert!(!outer.path().join("precious.txt").exists());
    }

    #[test]
    fn test_is_inside() {
        let root = Path::new("/project");
        assert!(is_inside(root, Path::new("/project/dist")));
        assert!(!is_inside(root, Path::new("/project")));
        assert!(!is_inside(root, Path::new("/project/./")));
        assert!(!is_inside(root, Path::new("/project/dist/../../etc")));
    }

    #[test]
    fn test_is_inside_relative_working_dir() {
        let cwd = env::current_dir().unwrap();
        assert!(is_inside(Path::new("."), Path::new("./dist")));
        assert!(!is_inside(Path::new("."), Path::new("./../precious.txt")));
        assert!(!is_inside(Path::new("."), Path::new("precious/../..")));
        assert!(is_inside(Path::new("."), &cwd.join("dist")));
    }
}
