//! Cross-repository dispatch notifications.

use crate::client::{DEFAULT_API_URL, GitHubClient};
use async_trait::async_trait;
use forkkeep_core::Result;
use forkkeep_core::credentials::CredentialStore;
use tracing::{info, warn};

/// Sends a named event to another repository. Success or failure only.
#[async_trait]
pub trait DispatchNotifier: Send + Sync {
    async fn notify(&self, target_repo: &str, event_type: &str) -> Result<()>;
}

/// Dispatch notifier backed by the GitHub `repository_dispatch` endpoint.
///
/// The token is looked up per call so a credential scoped to one
/// repository can never reach another.
pub struct GitHubDispatcher {
    base_url: String,
    credentials: CredentialStore,
    credential: String,
}

impl GitHubDispatcher {
    pub fn new(credentials: CredentialStore, credential: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_API_URL, credentials, credential)
    }

    pub fn with_base_url(
        base_url: &str,
        credentials: CredentialStore,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.to_string(),
            credentials,
            credential: credential.into(),
        }
    }
}

#[async_trait]
impl DispatchNotifier for GitHubDispatcher {
    async fn notify(&self, target_repo: &str, event_type: &str) -> Result<()> {
        let token = self
            .credentials
            .for_repository(&self.credential, target_repo)?;
        let client = GitHubClient::with_base_url(&self.base_url, token);

        match client.repository_dispatch(target_repo, event_type).await {
            Ok(()) => {
                info!(target = %target_repo, event_type = %event_type, "Dispatch delivered");
                Ok(())
            }
            Err(e) => {
                warn!(target = %target_repo, error = %e, "Dispatch failed");
                Err(e.into())
            }
        }
    }
}
