use crate::{Action, ActionInput, ActionOutput};
use async_trait::async_trait;
use forkkeep_core::Result;
use forkkeep_github::{DispatchNotifier, GitHubDispatcher};

/// `repository-dispatch`: send `event_type` to `repository` using the
/// credential named by `token`.
pub struct RepositoryDispatchAction {
    api_url: String,
}

impl RepositoryDispatchAction {
    pub fn new(api_url: &str) -> Self {
        Self {
            api_url: api_url.to_string(),
        }
    }
}

#[async_trait]
impl Action for RepositoryDispatchAction {
    fn name(&self) -> &str {
        "repository-dispatch"
    }

    async fn execute(&self, input: &ActionInput) -> Result<ActionOutput> {
        let repository = input.required(self.name(), "repository")?;
        let event_type = input.required(self.name(), "event_type")?;
        let token = input.required(self.name(), "token")?;

        let dispatcher =
            GitHubDispatcher::with_base_url(&self.api_url, input.credentials.clone(), token);
        dispatcher.notify(repository, event_type).await?;

        Ok(ActionOutput::empty())
    }
}
