//! Package files into a zip archive

use crate::actions::files::{target_mappings, FileMapping};
use crate::actions::{ActionHandler, ResolvedAction};
use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::Context;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const DEFAULT_LEVEL: i64 = 6;

/// Writes `options.archive` from the target's file specs
pub struct ArchiveHandler;

impl ActionHandler for ArchiveHandler {
    fn run(&self, action: &ResolvedAction, ctx: &Context) -> ExecutionResult<()> {
        let archive = ctx.working_dir.join(action.require_option_str("archive")?);

        let mode = action
            .option_str("mode")?
            .unwrap_or_else(|| "zip".to_string());
        if mode != "zip" {
            return Err(ExecutionError::InvalidOption {
                name: "mode".to_string(),
                error: format!("unsupported archive mode '{}'", mode),
            });
        }

        let level = action.option_i64("level")?.unwrap_or(DEFAULT_LEVEL);
        if !(0..=9).contains(&level) {
            return Err(ExecutionError::InvalidOption {
                name: "level".to_string(),
                error: format!("{} is not between 0 and 9", level),
            });
        }

        let options = if level == 0 {
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
        } else {
            SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(level as _))
        };

        let mappings = target_mappings(&action.data, &ctx.working_dir)?;

        if let Some(parent) = archive.parent() {
            fs::create_dir_all(parent).map_err(|e| ExecutionError::io(parent, e))?;
        }
        let file = File::create(&archive).map_err(|e| ExecutionError::io(&archive, e))?;
        let mut zip = ZipWriter::new(file);

        let mut entries = 0;
        for mapping in &mappings {
            for (src, name) in entry_names(mapping, &ctx.working_dir) {
                if src == archive.as_path() || name.is_empty() {
                    continue;
                }

                if src.is_dir() {
                    zip.add_directory(format!("{}/", name), options)
                        .map_err(archive_error)?;
                    continue;
                }

                zip.start_file(name, options).map_err(archive_error)?;
                let mut input = File::open(src).map_err(|e| ExecutionError::io(src, e))?;
                io::copy(&mut input, &mut zip).map_err(|e| ExecutionError::io(src, e))?;
                entries += 1;
            }
        }

        zip.finish().map_err(archive_error)?;
        ctx.print_debug(&format!(
            "Wrote {} ({} files)",
            archive.display(),
            entries
        ));
        Ok(())
    }
}

/// Pair each source with its name inside the archive
fn entry_names<'a>(mapping: &'a FileMapping, base: &Path) -> Vec<(&'a Path, String)> {
    mapping
        .src
        .iter()
        .map(|src| {
            let name = match (&mapping.dest, mapping.src.len()) {
                // Expanded mappings carry the full destination path
                (Some(dest), 1) if !dest.to_string_lossy().ends_with('/') => {
                    archive_name(dest.strip_prefix(base).unwrap_or(dest))
                }
                (Some(dest), _) => {
                    let prefix = archive_name(dest.strip_prefix(base).unwrap_or(dest));
                    let rel = archive_name(src.strip_prefix(base).unwrap_or(src));
                    if prefix.is_empty() {
                        rel
                    } else {
                        format!("{}/{}", prefix, rel)
                    }
                }
                (None, _) => archive_name(src.strip_prefix(base).unwrap_or(src)),
            };
            (src.as_path(), name)
        })
        .collect()
}

/// Forward-slash archive path without root or `.`/`..` components
fn archive_name(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn archive_error(err: zip::result::ZipError) -> ExecutionError {
    ExecutionError::Archive(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionKind;
    use crate::config::ConfigNode;
    use crate::runner::LeafAction;
    use std::io::Read;
    use tempfile::TempDir;

    fn action(data: &str, options: &str) -> ResolvedAction {
        let leaf = LeafAction {
            kind: ActionKind::Archive,
            section: "compress".to_string(),
            target: "main".to_string(),
        };
        ResolvedAction::new(
            &leaf,
            Some(serde_yaml::from_str::<ConfigNode>(options).unwrap()),
            serde_yaml::from_str(data).unwrap(),
        )
    }

    fn dist() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("dist/css")).unwrap();
        fs::write(dir.path().join("dist/table.js"), "js").unwrap();
        fs::write(dir.path().join("dist/css/table.css"), "css").unwrap();
        dir
    }

    #[test]
    fn test_archive_with_expanded_prefix() {
        let dir = dist();
        let ctx = Context::new().with_working_dir(dir.path().to_path_buf());

        ArchiveHandler
            .run(
                &action(
                    "{files: [{expand: true, cwd: dist/, src: ['**'], dest: pkg-1.2.3-dist}]}",
                    "{archive: pkg-1.2.3.zip, level: 9}",
                ),
                &ctx,
            )
            .unwrap();

        let file = File::open(dir.path().join("pkg-1.2.3.zip")).unwrap();
        let mut zip = zip::ZipArchive::new(file).unwrap();
        let mut contents = String::new();
        zip.by_name("pkg-1.2.3-dist/css/table.css")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "css");
        assert!(zip.by_name("pkg-1.2.3-dist/table.js").is_ok());
    }

    #[test]
    fn test_archive_requires_path() {
        let dir = dist();
        let ctx = Context::new().with_working_dir(dir.path().to_path_buf());
        let result = ArchiveHandler.run(&action("{src: 'dist/**'}", "{level: 1}"), &ctx);
        assert!(matches!(result, Err(ExecutionError::MissingOption(_))));
    }

    #[test]
    fn test_archive_rejects_bad_level_and_mode() {
        let dir = dist();
        let ctx = Context::new().with_working_dir(dir.path().to_path_buf());
        let result =
            ArchiveHandler.run(&action("{src: 'dist/**'}", "{archive: a.zip, level: 12}"), &ctx);
        assert!(matches!(result, Err(ExecutionError::InvalidOption { .. })));

        let result =
            ArchiveHandler.run(&action("{src: 'dist/**'}", "{archive: a.tgz, mode: tgz}"), &ctx);
        assert!(matches!(result, Err(ExecutionError::InvalidOption { .. })));
    }

    #[test]
    fn test_archive_name_strips_dots() {
        assert_eq!(archive_name(Path::new("./a/../b/c.js")), "a/b/c.js");
    }
}
