use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::engine::{DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_RETRIES, DEFAULT_MIN_QUALITY_TASKS};

/// Top-level configuration.
/// Loaded from ~/.config/taskflow/config.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub executors: Vec<ExecutorConfig>,
    #[serde(default)]
    pub reflection: Option<ReflectionConfig>,
    #[serde(default)]
    pub defaults: Defaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub executor_type: ExecutorType,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Counts toward the reflection predicate
    #[serde(default)]
    pub quality: bool,
    /// Prefix prompts with the original request
    #[serde(default)]
    pub include_request: bool,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorType {
    Command,
    Echo,
}

impl std::fmt::Display for ExecutorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutorType::Command => write!(f, "command"),
            ExecutorType::Echo => write!(f, "echo"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectionConfig {
    pub command: String,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default = "default_min_quality_tasks")]
    pub min_quality_tasks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub task_timeout_secs: Option<u64>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            max_retries: default_max_retries(),
            task_timeout_secs: None,
            log_level: default_log_level(),
        }
    }
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_min_quality_tasks() -> usize {
    DEFAULT_MIN_QUALITY_TASKS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load config from the default path (~/.config/taskflow/config.yaml).
    pub fn load_default() -> anyhow::Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::empty())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> anyhow::Result<Self> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("taskflow")
            .join("config.yaml")
    }

    /// Empty config with no executors.
    pub fn empty() -> Self {
        Self {
            executors: Vec::new(),
            reflection: None,
            defaults: Defaults::default(),
        }
    }

    /// Find an executor config by name.
    pub fn find_executor(&self, name: &str) -> Option<&ExecutorConfig> {
        self.executors.iter().find(|e| e.name == name)
    }

    /// Find executors matching all given labels.
    pub fn find_by_labels(&self, labels: &[String]) -> Vec<&ExecutorConfig> {
        self.executors
            .iter()
            .filter(|e| labels.iter().all(|l| e.labels.contains(l)))
            .collect()
    }

    fn validate(&self) -> anyhow::Result<()> {
        let mut seen = std::collections::HashSet::new();
        for e in &self.executors {
            if !seen.insert(e.name.as_str()) {
                anyhow::bail!("executor '{}' is defined more than once", e.name);
            }
            if e.executor_type == ExecutorType::Command && e.command.is_none() {
                anyhow::bail!("executor '{}' has type command but no command", e.name);
            }
        }
        if self.defaults.max_concurrency == 0 {
            anyhow::bail!("defaults.max_concurrency must be at least 1");
        }
        Ok(())
    }
}

impl ExecutorConfig {
    pub fn timeout(&self) -> Option<std::time::Duration> {
        self.timeout_secs.map(std::time::Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
executors:
  - name: researcher_agent
    type: command
    command: ./bin/research
    quality: true
    timeout_secs: 600
    labels: [web]
  - name: report_agent
    type: echo
    include_request: true
reflection:
  command: ./bin/review
defaults:
  max_concurrency: 4
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.executors.len(), 2);

        let research = config.find_executor("researcher_agent").unwrap();
        assert_eq!(research.executor_type, ExecutorType::Command);
        assert!(research.quality);
        assert_eq!(research.timeout(), Some(std::time::Duration::from_secs(600)));

        let report = config.find_executor("report_agent").unwrap();
        assert!(report.include_request);
        assert!(!report.quality);

        assert_eq!(config.reflection.as_ref().unwrap().min_quality_tasks, 2);
        assert_eq!(config.defaults.max_concurrency, 4);
        assert_eq!(config.defaults.max_retries, 2);
        assert_eq!(config.defaults.log_level, "info");
        assert_eq!(config.find_by_labels(&["web".to_string()]).len(), 1);
    }

    #[test]
    fn test_command_executor_requires_command() {
        let err = Config::from_yaml("executors:\n  - name: x\n    type: command\n").unwrap_err();
        assert!(err.to_string().contains("no command"));
    }

    #[test]
    fn test_duplicate_executor_rejected() {
        let yaml = "executors:\n  - name: x\n    type: echo\n  - name: x\n    type: echo\n";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_empty_config_defaults() {
        let config = Config::empty();
        assert!(config.executors.is_empty());
        assert_eq!(config.defaults.max_concurrency, 3);
        assert!(config.reflection.is_none());
    }
}
