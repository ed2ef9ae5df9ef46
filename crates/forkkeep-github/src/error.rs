//! GitHub client errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("GitHub returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl GitHubError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GitHubError::NotFound(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            GitHubError::NotFound(_) => Some(404),
            GitHubError::Unauthorized(_) => Some(401),
            GitHubError::Api { status, .. } => Some(*status),
            GitHubError::Http(e) => e.status().map(|s| s.as_u16()),
            GitHubError::Decode(_) => None,
        }
    }
}

impl From<GitHubError> for forkkeep_core::Error {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::Http(e) => forkkeep_core::Error::Network(e.to_string()),
            other => forkkeep_core::Error::GitHub {
                status: other.status().unwrap_or_default(),
                message: other.to_string(),
            },
        }
    }
}
