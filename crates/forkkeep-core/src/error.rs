//! Error types for forkkeep.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Workflow errors
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("Invalid workflow definition: {0}")]
    InvalidWorkflow(String),

    #[error("Unsupported trigger event: {0}")]
    UnsupportedEvent(String),

    // Step errors
    #[error("Step '{step}' failed with exit code {exit_code}")]
    StepFailed { step: String, exit_code: i32 },

    #[error("Step '{step}' timed out after {seconds}s")]
    StepTimeout { step: String, seconds: u64 },

    #[error("Workflow '{workflow}' exceeded its {minutes} minute limit")]
    WorkflowTimeout { workflow: String, minutes: u32 },

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Action '{action}' failed: {message}")]
    ActionFailed { action: String, message: String },

    // Credential errors
    #[error("Credential not found: {0}")]
    MissingCredential(String),

    #[error("Credential '{name}' is scoped to {allowed} and cannot be used for {requested}")]
    CredentialScope {
        name: String,
        requested: String,
        allowed: String,
    },

    // External collaborators
    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },

    #[error("GitHub API error ({status}): {message}")]
    GitHub { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    // Local files
    #[error("Invalid version '{0}'")]
    InvalidVersion(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
