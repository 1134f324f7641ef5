//! Configuration
//!
//! Handles finding and loading the engine config file, environment variable
//! overrides, and suite definition files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::models::TestSuite;

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./suiterun.yaml",
    "./suiterun.yml",
    "./.suiterun.yaml",
    "./.suiterun/config.yaml",
    "~/.config/suiterun/config.yaml",
    "~/.suiterun.yaml",
];

/// Environment variable prefix
const ENV_PREFIX: &str = "SUITERUN";

/// Engine-level defaults applied when a suite or the CLI does not override
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineDefaults {
    /// Owner recorded on suites created from the CLI
    #[serde(default = "default_owner")]
    pub owner: String,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: String,

    /// Run suites in parallel unless the suite says otherwise
    #[serde(default)]
    pub parallel: bool,

    /// Concurrency cap applied when forcing parallel runs
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Storage directory override; platform data dir when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<String>,
}

fn default_owner() -> String {
    "local".to_string()
}

fn default_format() -> String {
    "table".to_string()
}

fn default_max_concurrency() -> usize {
    4
}

impl Default for EngineDefaults {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            format: default_format(),
            parallel: false,
            max_concurrency: default_max_concurrency(),
            storage_dir: None,
        }
    }
}

/// Full configuration file structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub defaults: EngineDefaults,
}

impl ConfigFile {
    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        for location in CONFIG_LOCATIONS {
            let path = expand_path(location);
            if path.exists() {
                return Some(path);
            }
        }
        None
    }

    /// Load configuration from default location
    pub fn load_default() -> Result<Self> {
        if let Some(path) = Self::find() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply environment overrides on top of the file values
    pub fn with_env(mut self) -> Self {
        let env_config = EnvConfig::load();
        if let Some(owner) = env_config.owner {
            self.defaults.owner = owner;
        }
        if let Some(format) = env_config.format {
            self.defaults.format = format;
        }
        if let Some(parallel) = env_config.parallel {
            self.defaults.parallel = parallel;
        }
        if let Some(max_concurrency) = env_config.max_concurrency {
            self.defaults.max_concurrency = max_concurrency;
        }
        if let Some(storage_dir) = env_config.storage_dir {
            self.defaults.storage_dir = Some(storage_dir);
        }
        self
    }
}

/// Environment configuration from SUITERUN_* variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    pub owner: Option<String>,
    pub format: Option<String>,
    pub parallel: Option<bool>,
    pub max_concurrency: Option<usize>,
    pub storage_dir: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            owner: get_env("OWNER"),
            format: get_env("FORMAT"),
            parallel: get_env_bool("PARALLEL"),
            max_concurrency: get_env_parse("MAX_CONCURRENCY"),
            storage_dir: get_env("STORAGE_DIR"),
        }
    }
}

fn get_env(suffix: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{suffix}")).ok()
}

fn get_env_parse<T: std::str::FromStr>(suffix: &str) -> Option<T> {
    get_env(suffix).and_then(|v| v.parse().ok())
}

fn get_env_bool(suffix: &str) -> Option<bool> {
    get_env(suffix).map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn expand_path(location: &str) -> PathBuf {
    if let Some(rest) = location.strip_prefix("~/") {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest)
    } else {
        PathBuf::from(location)
    }
}

fn is_yaml_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Load a suite definition from a YAML or JSON file
pub fn load_suite_file(path: impl AsRef<Path>) -> Result<TestSuite> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read suite file: {}", path.display()))?;

    let suite: TestSuite = if is_yaml_file(path) {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML suite: {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON suite: {}", path.display()))?
    };
    Ok(suite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_sensible() {
        let config = ConfigFile::default();
        assert_eq!(config.defaults.owner, "local");
        assert_eq!(config.defaults.max_concurrency, 4);
        assert!(!config.defaults.parallel);
    }

    #[test]
    fn config_round_trips_through_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("suiterun.yaml");

        let mut config = ConfigFile::default();
        config.defaults.max_concurrency = 16;
        config.save(&path).unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded.defaults.max_concurrency, 16);
    }

    #[test]
    fn suite_file_loads_from_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("suite.yaml");
        std::fs::write(
            &path,
            r#"
id: suite_demo
owner: alice
name: demo suite
target_type: agent
target_id: agent-1
test_cases:
  - id: c1
    name: greeting
    input:
      type: text
      content: hello
    assertions:
      - type: contains
        field: content
        value: hello
"#,
        )
        .unwrap();

        let suite = load_suite_file(&path).unwrap();
        assert_eq!(suite.name, "demo suite");
        assert_eq!(suite.test_cases.len(), 1);
        assert!(suite.test_cases[0].enabled);
        assert_eq!(suite.test_cases[0].timeout_ms, 30_000);
    }

    #[test]
    fn malformed_suite_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "nonsense: [").unwrap();
        assert!(load_suite_file(&path).is_err());
    }
}
