//! Configuration file parsing and discovery

use crate::config::node::ConfigNode;
use crate::config::store::ConfigStore;
use crate::config::types::Kilnfile;
use crate::error::{ConfigError, ConfigResult, KilnError};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file names to search for
pub const CONFIG_FILE_NAMES: &[&str] = &["kiln.yml", "kiln.yaml"];

/// Dotenv file picked up next to the config file when none is named
const DEFAULT_ENV_FILE: &str = ".env";

/// Find the configuration file by searching current and parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    find_config_file_from(env::current_dir().map_err(|e| {
        ConfigError::Invalid(format!("Failed to get current directory: {}", e))
    })?)
}

/// Find the configuration file starting from a specific directory
pub fn find_config_file_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        for file_name in CONFIG_FILE_NAMES {
            let config_path = current_dir.join(file_name);
            searched_paths.push(config_path.display().to_string());

            if config_path.is_file() {
                return Ok(config_path);
            }
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(ConfigError::NotFound(searched_paths.join(", "))),
        }
    }
}

/// Parse a configuration file from a path
pub fn parse_config_file(path: &Path) -> Result<Kilnfile, KilnError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        ConfigError::Invalid(format!("Failed to read {}: {}", path.display(), e))
    })?;

    parse_config(&contents)
}

/// Parse configuration from a string
pub fn parse_config(yaml: &str) -> Result<Kilnfile, KilnError> {
    let config: Kilnfile = serde_yaml::from_str(yaml)?;
    Ok(config)
}

/// Parse configuration with automatic file discovery
pub fn parse_config_auto() -> Result<(Kilnfile, PathBuf), KilnError> {
    let config_path = find_config_file()?;
    let config = parse_config_file(&config_path)?;
    Ok((config, config_path))
}

/// Build the config store: the `config:` tree plus package metadata at `pkg`
pub fn build_store(file: &Kilnfile, base_dir: &Path) -> ConfigResult<ConfigStore> {
    let mut store = match &file.config {
        ConfigNode::Mapping(_) | ConfigNode::Null => ConfigStore::from_node(file.config.clone()),
        _ => {
            return Err(ConfigError::Invalid(
                "'config' must be a mapping".to_string(),
            ))
        }
    };

    if let Some(package) = &file.package {
        let pkg = load_package(&base_dir.join(package))?;
        store
            .set("pkg", pkg)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
    }

    Ok(store)
}

/// Load a JSON package manifest (e.g. package.json)
pub fn load_package(path: &Path) -> ConfigResult<ConfigNode> {
    let package_error = |error: String| ConfigError::Package {
        path: path.to_path_buf(),
        error,
    };

    let contents = fs::read_to_string(path).map_err(|e| package_error(e.to_string()))?;
    let value: serde_json::Value =
        serde_json::from_str(&contents).map_err(|e| package_error(e.to_string()))?;

    match value {
        serde_json::Value::Object(_) => Ok(ConfigNode::from(value)),
        _ => Err(package_error("expected a JSON object".to_string())),
    }
}

/// Load dotenv values for spawned processes.
///
/// A named env file must exist; the default `.env` is optional.
pub fn load_env_file(file: &Kilnfile, base_dir: &Path) -> ConfigResult<HashMap<String, String>> {
    let (path, required) = match &file.env_file {
        Some(name) => (base_dir.join(name), true),
        None => (base_dir.join(DEFAULT_ENV_FILE), false),
    };

    if !path.is_file() {
        if required {
            return Err(ConfigError::Invalid(format!(
                "env file '{}' does not exist",
                path.display()
            )));
        }
        return Ok(HashMap::new());
    }

    let iter = dotenvy::from_path_iter(&path)
        .map_err(|e| ConfigError::Invalid(format!("{}: {}", path.display(), e)))?;

    iter.map(|item| {
        item.map_err(|e| ConfigError::Invalid(format!("{}: {}", path.display(), e)))
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_simple_config() {
        let yaml = r#"
config:
  exec:
    hello:
      command: echo hello
tasks:
  default: exec:hello
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.tasks.len(), 1);
        assert!(config.config.get("exec").is_some());
    }

    #[test]
    fn test_find_config_in_current_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("kiln.yml");
        fs::write(&config_path, "tasks: {}\n").unwrap();

        let found = find_config_file_from(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(found, config_path);
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("kiln.yaml");
        let sub_dir = temp_dir.path().join("subdir");

        fs::create_dir(&sub_dir).unwrap();
        fs::write(&config_path, "tasks: {}\n").unwrap();

        let found = find_config_file_from(sub_dir).unwrap();
        assert_eq!(found, config_path);
    }

    #[test]
    fn test_config_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let result = find_config_file_from(temp_dir.path().to_path_buf());
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_build_store_mounts_package() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("package.json"),
            r#"{"name": "widget", "version": "1.2.3"}"#,
        )
        .unwrap();

        let file = parse_config(
            r#"
package: package.json
config:
  name: "<%= pkg.name %>"
"#,
        )
        .unwrap();
        let store = build_store(&file, temp_dir.path()).unwrap();
        assert_eq!(store.get("pkg.version").unwrap(), &ConfigNode::from("1.2.3"));
        assert_eq!(store.expand_path("name").unwrap(), ConfigNode::from("widget"));
    }

    #[test]
    fn test_build_store_missing_package() {
        let temp_dir = TempDir::new().unwrap();
        let file = parse_config("package: nope.json\n").unwrap();
        let result = build_store(&file, temp_dir.path());
        assert!(matches!(result, Err(ConfigError::Package { .. })));
    }

    #[test]
    fn test_load_default_env_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(".env"), "NODE_ENV=production\n").unwrap();

        let file = Kilnfile::default();
        let vars = load_env_file(&file, temp_dir.path()).unwrap();
        assert_eq!(vars.get("NODE_ENV"), Some(&"production".to_string()));
    }

    #[test]
    fn test_named_env_file_must_exist() {
        let temp_dir = TempDir::new().unwrap();
        let file = parse_config("env-file: .env.release\n").unwrap();
        assert!(load_env_file(&file, temp_dir.path()).is_err());
        assert!(load_env_file(&Kilnfile::default(), temp_dir.path())
            .unwrap()
            .is_empty());
    }
}
