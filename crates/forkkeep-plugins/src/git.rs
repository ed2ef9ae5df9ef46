use crate::{Action, ActionInput, ActionOutput};
use async_trait::async_trait;
use forkkeep_core::{Error, GitIdentity, Result};
use forkkeep_git::{GitRepo, authenticated_url};
use tracing::info;

/// Repository given as a URL or filesystem path rather than `owner/name`.
fn is_explicit_location(repository: &str) -> bool {
    repository.contains("://") || repository.starts_with('/') || repository.starts_with('.')
}

/// Remote URL for `repository`, authenticated when the step passes a
/// `token` credential. Returns the token too so callers can mask it.
fn remote_url(
    input: &ActionInput,
    login: &str,
    repository: &str,
) -> Result<(String, Option<String>)> {
    if is_explicit_location(repository) {
        return Ok((repository.to_string(), None));
    }
    match input.param("token") {
        Some(name) => {
            let token = input.credentials.for_repository(name, repository)?;
            Ok((
                authenticated_url(login, token, repository),
                Some(token.to_string()),
            ))
        }
        None => Ok((format!("https://github.com/{}.git", repository), None)),
    }
}

/// `git-clone`: clone `repository` into `path`.
pub struct GitCloneAction {
    owner: GitIdentity,
}

impl GitCloneAction {
    pub fn new(owner: GitIdentity) -> Self {
        Self { owner }
    }
}

#[async_trait]
impl Action for GitCloneAction {
    fn name(&self) -> &str {
        "git-clone"
    }

    async fn execute(&self, input: &ActionInput) -> Result<ActionOutput> {
        let repository = input.required(self.name(), "repository")?;
        let (url, _) = remote_url(input, &self.owner.login, repository)?;
        let dest = input.path();

        info!(repository = %repository, dest = %dest.display(), "Cloning");
        GitRepo::clone_from(&url, &dest, input.param("ref")).await?;

        Ok(ActionOutput::empty().with("path", dest.to_string_lossy()))
    }
}

/// `git-commit-push`: commit everything under `path` and push it to
/// `branch` of `repository`. Having nothing to commit is a failure.
pub struct GitCommitPushAction {
    owner: GitIdentity,
    committer: GitIdentity,
}

impl GitCommitPushAction {
    pub fn new(owner: GitIdentity, committer: GitIdentity) -> Self {
        Self { owner, committer }
    }
}

#[async_trait]
impl Action for GitCommitPushAction {
    fn name(&self) -> &str {
        "git-commit-push"
    }

    async fn execute(&self, input: &ActionInput) -> Result<ActionOutput> {
        let repository = input.required(self.name(), "repository")?;
        let message = input.required(self.name(), "message")?;
        let branch = input.param("branch").unwrap_or("master");
        let (url, token) = remote_url(input, &self.owner.login, repository)?;

        let mut repo = GitRepo::open(input.path());
        if let Some(token) = token {
            repo = repo.with_secret(token);
        }

        repo.configure_user(&self.committer.login, &self.committer.email)
            .await?;
        repo.add_all().await?;
        if !repo.has_staged_changes().await? {
            return Err(Error::ActionFailed {
                action: self.name().to_string(),
                message: "nothing to commit".into(),
            });
        }
        repo.commit(message).await?;
        repo.push(&url, &format!("HEAD:{}", branch)).await?;

        info!(repository = %repository, branch = %branch, "Pushed commit");
        Ok(ActionOutput::empty())
    }
}
