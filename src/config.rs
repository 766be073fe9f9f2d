//! Configuration loading for treelint.
//!
//! Settings live in a `treelint.toml` found next to (or above) the linted
//! path; command line arguments take precedence over the file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::registry::RuleSelection;

pub const CONFIG_FILE_NAME: &str = "treelint.toml";

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Config {
    /// Rule ids or glob patterns to enable; empty (or `"all"`) enables
    /// every standard rule.
    #[serde(default)]
    pub enable: Vec<String>,

    /// Rule ids or glob patterns to disable.
    #[serde(default)]
    pub disable: Vec<String>,

    /// Path components to skip during file discovery.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// File extensions to lint when walking directories; empty lints
    /// every regular file.
    #[serde(default)]
    pub extensions: Vec<String>,

    #[serde(default)]
    pub autocorrect: Option<bool>,

    #[serde(default)]
    pub max_passes: Option<usize>,

    #[serde(default)]
    pub include_experimental: bool,

    /// Per-rule options, e.g. `[rules.max-line-length] limit = 80`.
    #[serde(default)]
    pub rules: HashMap<String, toml::Table>,
}

/// Find the nearest `treelint.toml` starting from a path and walking up.
pub fn find_config_file(start_path: &Path) -> Option<PathBuf> {
    let mut current = if start_path.is_file() {
        start_path.parent()?
    } else {
        start_path
    };

    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

/// Load configuration from an explicit path, or search upward from the
/// current directory.
pub fn load_config(path: Option<&Path>) -> Option<Config> {
    let config_path = match path {
        Some(p) if p.exists() => p.to_path_buf(),
        Some(_) => return None,
        None => find_config_file(&std::env::current_dir().ok()?)?,
    };

    let content = std::fs::read_to_string(&config_path).ok()?;
    match toml::from_str::<Config>(&content) {
        Ok(config) => Some(config),
        Err(error) => {
            warn!(path = %config_path.display(), %error, "ignoring unreadable config file");
            None
        }
    }
}

/// Merge the config file with command line arguments. CLI enable/disable
/// lists replace the file's when given; exclude patterns accumulate.
pub fn merge_config(
    config: Option<&Config>,
    cli_enable: &[String],
    cli_disable: &[String],
    cli_skip: &[String],
) -> (RuleSelection, Vec<String>) {
    let mut selection = RuleSelection::default();
    let mut exclude = Vec::new();

    if let Some(cfg) = config {
        selection.enable = cfg.enable.clone();
        selection.disable = cfg.disable.clone();
        selection.include_experimental = cfg.include_experimental;
        exclude.extend(cfg.exclude.iter().cloned());
    }

    if !cli_enable.is_empty() {
        selection.enable = cli_enable.to_vec();
        selection.disable.clear();
    }
    if !cli_disable.is_empty() {
        selection.disable = cli_disable.to_vec();
    }

    exclude.extend(cli_skip.iter().cloned());
    for default in [".git", "target", "node_modules", "build", "dist"] {
        if !exclude.iter().any(|e| e == default) {
            exclude.push(default.to_string());
        }
    }

    (selection, exclude)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, "exclude = [\"vendor\"]").unwrap();

        assert_eq!(find_config_file(dir.path()), Some(config_path.clone()));

        let subdir = dir.path().join("nested").join("deeper");
        fs::create_dir_all(&subdir).unwrap();
        assert_eq!(find_config_file(&subdir), Some(config_path));
    }

    #[test]
    fn test_load_config() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        let content = r#"
enable = ["max-line-length", "final-newline"]
exclude = ["vendor"]
autocorrect = true
max_passes = 5

[rules.max-line-length]
limit = 80
"#;
        fs::write(&config_path, content).unwrap();

        let config = load_config(Some(&config_path)).unwrap();
        assert_eq!(config.enable, vec!["max-line-length", "final-newline"]);
        assert_eq!(config.exclude, vec!["vendor"]);
        assert_eq!(config.autocorrect, Some(true));
        assert_eq!(config.max_passes, Some(5));
        assert_eq!(
            config.rules["max-line-length"]["limit"].as_integer(),
            Some(80)
        );
    }

    #[test]
    fn test_load_config_rejects_bad_toml() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, "enable = not-a-list").unwrap();
        assert!(load_config(Some(&config_path)).is_none());
    }

    #[test]
    fn test_merge_config_cli_overrides() {
        let config = Config {
            enable: vec!["filename".to_string()],
            exclude: vec!["vendor".to_string()],
            ..Default::default()
        };

        let (selection, exclude) = merge_config(
            Some(&config),
            &["max-line-length".to_string()],
            &[],
            &["skip_me".to_string()],
        );

        assert_eq!(selection.enable, vec!["max-line-length"]);
        assert!(exclude.contains(&"vendor".to_string()));
        assert!(exclude.contains(&"skip_me".to_string()));
        assert!(exclude.contains(&".git".to_string()));
    }

    #[test]
    fn test_merge_config_without_file() {
        let (selection, exclude) = merge_config(None, &[], &[], &[]);
        assert!(selection.enable.is_empty());
        assert!(selection.disable.is_empty());
        assert!(exclude.contains(&"target".to_string()));
    }
}
