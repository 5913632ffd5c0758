//! Common test utilities

#![allow(dead_code)]

use kiln::config::{build_store, parse_config_file, ConfigStore, Kilnfile};
use kiln::runner::TaskRegistry;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create a temporary directory with a kiln.yml file
pub fn create_test_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("kiln.yml");
    fs::write(&config_path, content).unwrap();
    (temp_dir, config_path)
}

/// Create a test config in a subdirectory
pub fn create_test_config_in_subdir(content: &str) -> (TempDir, PathBuf, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("kiln.yml");
    let sub_dir = temp_dir.path().join("subdir");

    fs::write(&config_path, content).unwrap();
    fs::create_dir(&sub_dir).unwrap();

    (temp_dir, config_path, sub_dir)
}

/// Write a file below `root`, creating parent directories
pub fn write_file(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Parse a config file and build its store and registry
pub fn load(config_path: &Path) -> (Kilnfile, ConfigStore, TaskRegistry) {
    let file = parse_config_file(config_path).unwrap();
    let store = build_store(&file, config_path.parent().unwrap()).unwrap();
    let registry = TaskRegistry::from_kilnfile(&file, &store).unwrap();
    (file, store, registry)
}

/// The demo pipeline shipped with the repository
pub fn demo_config() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/semi-auto-table/kiln.yml")
}
