//! CLI configuration management.

use anyhow::{Context, Result};
use forkkeep_core::GitIdentity;
use forkkeep_github::DEFAULT_API_URL;
use forkkeep_plugins::ActionRegistry;
use forkkeep_tasks::{DEFAULT_INSTALL_COMMAND, TaskSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI configuration, read from `config.yaml` in the platform config dir
/// unless `--config` points elsewhere. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// GitHub API base URL.
    pub api_url: String,
    /// Account owning the forks.
    pub owner: GitIdentity,
    /// Account authoring commits.
    pub bot: GitIdentity,
    /// Dependency install command used by `build`.
    pub install_command: String,
    /// Directory holding workflow definitions.
    pub workflows_dir: PathBuf,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            owner: GitIdentity::owner(),
            bot: GitIdentity::bot(),
            install_command: DEFAULT_INSTALL_COMMAND.to_string(),
            workflows_dir: PathBuf::from("workflows"),
        }
    }
}

impl CliConfig {
    /// Load from `path`, or from the default location when `None`. A missing
    /// default file yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::config_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };
        if !explicit && !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Default configuration file path.
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "FriendsOfGalaxy", "forkkeep")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    pub fn task_settings(&self) -> TaskSettings {
        TaskSettings {
            owner: self.owner.clone(),
            bot: self.bot.clone(),
            install_command: self.install_command.clone(),
        }
    }

    pub fn action_registry(&self) -> ActionRegistry {
        ActionRegistry::new()
            .with_api_url(&self.api_url)
            .with_identities(self.owner.clone(), self.bot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = CliConfig::from_yaml(
            "api_url: http://localhost:9000\nbot:\n  login: TestBot\n  email: bot@example.invalid\n",
        )
        .unwrap();
        assert_eq!(config.api_url, "http://localhost:9000");
        assert_eq!(config.bot, GitIdentity::new("TestBot", "bot@example.invalid"));
        assert_eq!(config.owner, GitIdentity::owner());
        assert_eq!(config.install_command, DEFAULT_INSTALL_COMMAND);
        assert_eq!(config.task_settings().bot.login, "TestBot");
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CliConfig::load(Some(&dir.path().join("nope.yaml"))).is_err());
    }
}
