//! File specifications shared by file-based actions
//!
//! A target describes its files in one of several shapes:
//!
//! ```yaml
//! clean: {dist: dist}                              # bare pattern(s)
//! concat: {js: {src: [a.js, b.js], dest: out.js}}  # src/dest
//! copy: {less: {expand: true, cwd: src, src: "less/**/*", dest: dist/}}
//! compress: {main: {files: [{cwd: dist/, src: ["**"], dest: pkg/}]}}
//! uglify: {all: {files: {dist/a.min.js: dist/a.js}}}
//! ```
//!
//! Patterns are expanded in order; a pattern starting with `!` removes
//! earlier matches.

use crate::config::ConfigNode;
use crate::error::{ExecutionError, ExecutionResult};
use globset::{GlobBuilder, GlobSetBuilder};
use std::path::{Path, PathBuf};

/// One group of source patterns with an optional destination
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileSpec {
    pub cwd: Option<String>,
    pub src: Vec<String>,
    pub dest: Option<String>,
    /// Map every matched file to its own destination under `dest`
    pub expand: bool,
    /// Replace the extension of expanded destinations
    pub ext: Option<String>,
    /// Drop directory parts of expanded destinations
    pub flatten: bool,
}

/// A concrete source-to-destination mapping
#[derive(Debug, Clone, PartialEq)]
pub struct FileMapping {
    pub src: Vec<PathBuf>,
    pub dest: Option<PathBuf>,
}

impl FileSpec {
    /// Read every file spec a target declares
    pub fn from_data(data: &ConfigNode) -> ExecutionResult<Vec<FileSpec>> {
        match data {
            ConfigNode::Null => Ok(Vec::new()),
            ConfigNode::Mapping(map) => match map.get("files") {
                Some(ConfigNode::Sequence(items))
                    if items.iter().all(|i| matches!(i, ConfigNode::Mapping(_))) =>
                {
                    items.iter().map(FileSpec::from_mapping).collect()
                }
                Some(ConfigNode::Mapping(pairs)) => pairs
                    .iter()
                    .map(|(dest, src)| {
                        Ok(FileSpec {
                            src: patterns(src, "files")?,
                            dest: Some(dest.to_string()),
                            ..FileSpec::default()
                        })
                    })
                    .collect(),
                Some(other) => Ok(vec![FileSpec {
                    src: patterns(other, "files")?,
                    ..FileSpec::default()
                }]),
                None => Ok(vec![FileSpec::from_mapping(data)?]),
            },
            other => Ok(vec![FileSpec {
                src: patterns(other, "src")?,
                ..FileSpec::default()
            }]),
        }
    }

    fn from_mapping(node: &ConfigNode) -> ExecutionResult<FileSpec> {
        let string = |key: &str| -> ExecutionResult<Option<String>> {
            match node.get(key) {
                None | Some(ConfigNode::Null) => Ok(None),
                Some(value) => value.render().map(Some).ok_or_else(|| invalid(key)),
            }
        };
        let flag = |key: &str| node.get(key).and_then(ConfigNode::as_bool).unwrap_or(false);

        Ok(FileSpec {
            cwd: string("cwd")?,
            src: match node.get("src") {
                Some(src) => patterns(src, "src")?,
                None => Vec::new(),
            },
            dest: string("dest")?,
            expand: flag("expand"),
            ext: string("ext")?,
            flatten: flag("flatten"),
        })
    }

    /// Resolve this spec against `base` into concrete mappings
    pub fn mappings(&self, base: &Path) -> ExecutionResult<Vec<FileMapping>> {
        let root = match &self.cwd {
            Some(cwd) => base.join(cwd),
            None => base.to_path_buf(),
        };
        let matched = expand_patterns(&root, &self.src)?;

        if !self.expand {
            return Ok(vec![FileMapping {
                src: matched.iter().map(|rel| root.join(rel)).collect(),
                dest: self.dest.as_ref().map(|d| base.join(d)),
            }]);
        }

        let dest_root = self.dest.as_ref().map(|d| base.join(d));
        Ok(matched
            .iter()
            .map(|rel| {
                let mut out = if self.flatten {
                    PathBuf::from(rel.file_name().unwrap_or(rel.as_os_str()))
                } else {
                    rel.clone()
                };
                if let Some(ext) = &self.ext {
                    out = replace_extension(&out, ext);
                }
                FileMapping {
                    src: vec![root.join(rel)],
                    dest: Some(match &dest_root {
                        Some(d) => d.join(out),
                        None => root.join(out),
                    }),
                }
            })
            .collect())
    }
}

/// Resolve every file spec of a target into mappings
pub fn target_mappings(data: &ConfigNode, base: &Path) -> ExecutionResult<Vec<FileMapping>> {
    let mut all = Vec::new();
    for spec in FileSpec::from_data(data)? {
        all.extend(spec.mappings(base)?);
    }
    Ok(all)
}

/// All source files of a target, in order, without duplicates
pub fn target_sources(data: &ConfigNode, base: &Path) -> ExecutionResult<Vec<PathBuf>> {
    let mut out: Vec<PathBuf> = Vec::new();
    for mapping in target_mappings(data, base)? {
        for src in mapping.src {
            if !out.contains(&src) {
                out.push(src);
            }
        }
    }
    Ok(out)
}

/// Expand glob patterns relative to `root`.
///
/// Returns paths relative to `root` in pattern order. Literal paths that
/// do not exist produce no match.
pub fn expand_patterns(root: &Path, patterns: &[String]) -> ExecutionResult<Vec<PathBuf>> {
    let mut matched: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        if let Some(negated) = pattern.strip_prefix('!') {
            let glob = GlobBuilder::new(negated.trim_start_matches("./"))
                .literal_separator(true)
                .build()
                .map_err(|e| invalid_pattern(pattern, e))?;
            let set = GlobSetBuilder::new()
                .add(glob)
                .build()
                .map_err(|e| invalid_pattern(pattern, e))?;
            matched.retain(|path| !set.is_match(path));
            continue;
        }

        let relative = pattern.trim_start_matches("./");
        if !relative.contains(&['*', '?', '['][..]) {
            let rel = PathBuf::from(relative.trim_end_matches('/'));
            if !rel.as_os_str().is_empty() && root.join(&rel).exists() && !matched.contains(&rel) {
                matched.push(rel);
            }
            continue;
        }

        let full = format!(
            "{}/{}",
            glob::Pattern::escape(root.to_string_lossy().trim_end_matches('/')),
            descend(relative)
        );
        let paths = glob::glob(&full).map_err(|e| ExecutionError::InvalidOption {
            name: pattern.clone(),
            error: e.to_string(),
        })?;

        for entry in paths {
            let path = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                ExecutionError::io(path, e.into())
            })?;
            let rel = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            if rel.as_os_str().is_empty() {
                continue;
            }
            if !matched.contains(&rel) {
                matched.push(rel);
            }
        }
    }

    Ok(matched)
}

/// A trailing `**` selects everything below, files included
fn descend(pattern: &str) -> String {
    if pattern == "**" || pattern.ends_with("/**") {
        format!("{}/*", pattern)
    } else {
        pattern.to_string()
    }
}

fn replace_extension(path: &Path, ext: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    // Everything after the first dot, as in `a.min.js` -> `a` + ext
    let stem = name.split('.').next().unwrap_or(&name).to_string();
    path.with_file_name(format!("{}{}", stem, ext))
}

fn patterns(node: &ConfigNode, name: &str) -> ExecutionResult<Vec<String>> {
    node.string_list().ok_or_else(|| invalid(name))
}

fn invalid(name: &str) -> ExecutionError {
    ExecutionError::InvalidOption {
        name: name.to_string(),
        error: "expected a string or a list of strings".to_string(),
    }
}

fn invalid_pattern(pattern: &str, error: globset::Error) -> ExecutionError {
    ExecutionError::InvalidOption {
        name: pattern.to_string(),
        error: error.to_string(),
    }
}
