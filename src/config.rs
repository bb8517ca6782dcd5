//! Configuration file support for rewire
//!
//! Reads from .rewire/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration structure
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct Config {
    /// Base dataset settings
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Backup reminder settings
    #[serde(default)]
    pub backup: BackupConfig,
}

/// Where the base protocol set comes from
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct DatasetConfig {
    /// Path to an external protocols.json replacing the compiled-in set.
    /// When set and unreadable, loading fails loudly instead of starting empty.
    #[serde(default)]
    pub path: Option<String>,
}

/// Backup reminder configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BackupConfig {
    /// Nag about a missing backup once it is older than this many hours.
    /// Default: 24
    #[serde(default = "default_remind_after_hours")]
    pub remind_after_hours: u64,
}

fn default_remind_after_hours() -> u64 {
    24
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            remind_after_hours: default_remind_after_hours(),
        }
    }
}

impl Config {
    /// Load config from .rewire/config.toml
    /// Returns default config if file doesn't exist
    pub fn load() -> Self {
        if let Some(path) = Self::find_config_path() {
            if let Ok(contents) = std::fs::read_to_string(&path) {
                if let Ok(config) = toml::from_str(&contents) {
                    return config;
                }
            }
        }
        Self::default()
    }

    /// Find config.toml by walking up directory tree
    fn find_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut dir = current_dir.as_path();

        loop {
            let config_path = dir.join(".rewire").join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }

            match dir.parent() {
                Some(parent) => dir = parent,
                None => break,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.dataset.path, None);
        assert_eq!(config.backup.remind_after_hours, 24);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[dataset]
path = "/home/me/protocols.json"

[backup]
remind_after_hours = 48
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.dataset.path.as_deref(), Some("/home/me/protocols.json"));
        assert_eq!(config.backup.remind_after_hours, 48);
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str("[dataset]\n").unwrap();
        assert_eq!(config.dataset.path, None);
        assert_eq!(config.backup.remind_after_hours, 24);
    }
}
