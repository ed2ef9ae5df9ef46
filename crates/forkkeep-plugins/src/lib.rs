//! Built-in step actions for forkkeep workflows.
//!
//! A step with `uses: <name>` runs one of these instead of a shell command.
//! Parameters come from the step's `with:` map after interpolation. A
//! `token` parameter names a credential, never a raw token; only the
//! credentials the step declares are reachable.

pub mod dispatch;
pub mod git;
pub mod version;

use async_trait::async_trait;
use forkkeep_core::credentials::CredentialStore;
use forkkeep_core::{Error, GitIdentity, Result};
use forkkeep_github::DEFAULT_API_URL;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Input passed to an action.
#[derive(Debug, Clone)]
pub struct ActionInput {
    pub step_name: String,
    pub workspace: PathBuf,
    pub params: BTreeMap<String, String>,
    pub credentials: CredentialStore,
}

impl ActionInput {
    pub fn new(step_name: impl Into<String>, workspace: impl Into<PathBuf>) -> Self {
        Self {
            step_name: step_name.into(),
            workspace: workspace.into(),
            params: BTreeMap::new(),
            credentials: CredentialStore::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn with_credentials(mut self, credentials: CredentialStore) -> Self {
        self.credentials = credentials;
        self
    }

    /// Parameter value, treating an empty string as absent.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }

    pub fn required(&self, action: &str, key: &str) -> Result<&str> {
        self.param(key).ok_or_else(|| Error::ActionFailed {
            action: action.to_string(),
            message: format!("missing '{}' input", key),
        })
    }

    /// `path` parameter resolved against the workspace.
    pub fn path(&self) -> PathBuf {
        self.workspace.join(self.param("path").unwrap_or("."))
    }
}

/// Output values set by an action.
#[derive(Debug, Clone, Default)]
pub struct ActionOutput {
    pub outputs: HashMap<String, String>,
}

impl ActionOutput {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.outputs.insert(key.to_string(), value.into());
        self
    }
}

/// A native step action.
#[async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> &str;
    async fn execute(&self, input: &ActionInput) -> Result<ActionOutput>;
}

/// Settings shared by the built-in actions.
#[derive(Debug, Clone)]
pub struct ActionRegistry {
    api_url: String,
    owner: GitIdentity,
    committer: GitIdentity,
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            owner: GitIdentity::owner(),
            committer: GitIdentity::bot(),
        }
    }
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_identities(mut self, owner: GitIdentity, committer: GitIdentity) -> Self {
        self.owner = owner;
        self.committer = committer;
        self
    }

    /// Look up a built-in action by name.
    pub fn get(&self, name: &str) -> Option<Box<dyn Action>> {
        match name {
            "git-clone" => Some(Box::new(git::GitCloneAction::new(self.owner.clone()))),
            "git-commit-push" => Some(Box::new(git::GitCommitPushAction::new(
                self.owner.clone(),
                self.committer.clone(),
            ))),
            "version-bump" => Some(Box::new(version::VersionBumpAction)),
            "repository-dispatch" => Some(Box::new(dispatch::RepositoryDispatchAction::new(
                &self.api_url,
            ))),
            _ => None,
        }
    }

    pub fn names() -> &'static [&'static str] {
        &[
            "git-clone",
            "git-commit-push",
            "repository-dispatch",
            "version-bump",
        ]
    }
}

/// Get a built-in action with default settings.
pub fn builtin(name: &str) -> Option<Box<dyn Action>> {
    ActionRegistry::default().get(name)
}
