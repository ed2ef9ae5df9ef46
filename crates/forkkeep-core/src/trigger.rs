//! Trigger events and the trigger filters a workflow declares.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Event that may start a workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerEvent {
    Push {
        branch: String,
        paths_changed: Vec<String>,
    },
    Dispatch {
        action: String,
    },
}

impl TriggerEvent {
    pub fn push(branch: impl Into<String>, paths: &[&str]) -> Self {
        TriggerEvent::Push {
            branch: branch.into(),
            paths_changed: paths.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn dispatch(action: impl Into<String>) -> Self {
        TriggerEvent::Dispatch {
            action: action.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TriggerEvent::Push { .. } => "push",
            TriggerEvent::Dispatch { .. } => "repository_dispatch",
        }
    }

    /// Build an event from a GitHub webhook payload.
    ///
    /// `event_name` is the value GitHub sends in `X-GitHub-Event` (or
    /// `GITHUB_EVENT_NAME` inside Actions).
    pub fn from_github(event_name: &str, payload: &serde_json::Value) -> Result<Self> {
        match event_name {
            "push" => {
                let git_ref = payload
                    .get("ref")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| Error::UnsupportedEvent("push payload without ref".into()))?;
                let branch = git_ref.strip_prefix("refs/heads/").ok_or_else(|| {
                    Error::UnsupportedEvent(format!("push to non-branch ref {}", git_ref))
                })?;

                let mut paths = BTreeSet::new();
                let commits = payload
                    .get("commits")
                    .and_then(|v| v.as_array())
                    .into_iter()
                    .flatten()
                    .chain(payload.get("head_commit").filter(|c| !c.is_null()));
                for commit in commits {
                    for key in ["added", "modified", "removed"] {
                        let files = commit.get(key).and_then(|v| v.as_array());
                        for file in files.into_iter().flatten() {
                            if let Some(path) = file.as_str() {
                                paths.insert(path.to_string());
                            }
                        }
                    }
                }

                Ok(TriggerEvent::Push {
                    branch: branch.to_string(),
                    paths_changed: paths.into_iter().collect(),
                })
            }
            "repository_dispatch" => {
                let action = payload
                    .get("action")
                    .or_else(|| payload.get("event_type"))
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        Error::UnsupportedEvent("repository_dispatch payload without action".into())
                    })?;
                Ok(TriggerEvent::Dispatch {
                    action: action.to_string(),
                })
            }
            other => Err(Error::UnsupportedEvent(other.to_string())),
        }
    }
}

/// Trigger filters declared under a workflow's `on:` key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowTriggers {
    #[serde(default)]
    pub push: Option<PushTrigger>,
    #[serde(default)]
    pub repository_dispatch: Option<DispatchTrigger>,
}

impl WorkflowTriggers {
    pub fn is_empty(&self) -> bool {
        self.push.is_none() && self.repository_dispatch.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushTrigger {
    #[serde(default)]
    pub branches: Vec<String>,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub paths_ignore: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchTrigger {
    #[serde(default)]
    pub types: Vec<String>,
}
