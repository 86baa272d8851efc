//! Configuration loading and management.
//!
//! Sources, highest priority first:
//! 1. `--config <file>` or `$TASKGRAPH_CONFIG` (must exist when given)
//! 2. `./.taskgraph/config.yaml`
//! 3. `~/.taskgraph/config.yaml`
//! 4. Built-in defaults
//!
//! `$TASKGRAPH_DB_PATH` then overrides the database path from whichever file
//! was used; the `--database` flag overrides both.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const ENV_CONFIG_PATH: &str = "TASKGRAPH_CONFIG";
/// Environment variable overriding the database path.
pub const ENV_DB_PATH: &str = "TASKGRAPH_DB_PATH";

const PROJECT_DIR: &str = ".taskgraph";
const CONFIG_FILE: &str = "config.yaml";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(PROJECT_DIR).join("tasks.db")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive, used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Parse YAML configuration. An empty document yields the defaults.
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Find and load the configuration, then apply environment overrides.
    ///
    /// Returns the config and the file it came from, if any.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let env_path = std::env::var_os(ENV_CONFIG_PATH).map(PathBuf::from);
        let explicit = explicit.map(Path::to_path_buf).or(env_path);

        let (mut config, used) = match explicit {
            Some(path) => (Self::load(&path)?, Some(path)),
            None => match candidate_paths().into_iter().find(|p| p.is_file()) {
                Some(path) => (Self::load(&path)?, Some(path)),
                None => (Self::default(), None),
            },
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok((config, used))
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_path) = lookup(ENV_DB_PATH).filter(|v| !v.is_empty()) {
            self.database.path = PathBuf::from(db_path);
        }
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.database.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }
        Ok(())
    }
}

/// Implicit config locations, project before user.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(PROJECT_DIR).join(CONFIG_FILE)];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(PROJECT_DIR).join(CONFIG_FILE));
    }
    paths
}
