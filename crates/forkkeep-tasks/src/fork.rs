//! GitHub side of one maintained fork.

use forkkeep_core::manifest::{FOG_CONFIG_FILE, FogConfig, MANIFEST_FILE, PluginManifest};
use forkkeep_core::{Error, Result};
use forkkeep_git::authenticated_url;
use forkkeep_github::{
    ContentKind, GitHubClient, LicenseInfo, NewPullRequest, NewRelease, PullRequest, Release,
    ReleaseUpdate, Repository, User,
};
use std::collections::VecDeque;
use std::path::PathBuf;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Branch upstream authors can use to mark what should be released.
pub const FOG_RELEASE_BRANCH: &str = "fog_release";
/// Default branch of every fork.
pub const BASE_BRANCH: &str = "master";
/// Branch carrying pending upstream changes.
pub const AUTOUPDATE_BRANCH: &str = "autoupdate";
pub const AUTOUPDATE_LABEL: &str = "autoupdate";
pub const ALLOWED_LICENSES: &[&str] = &["mit", "gpl-3.0"];

const PR_BODY: &str = "Sync with the original repository";

pub struct ForkManager {
    client: GitHubClient,
    user: User,
    fork: Repository,
    parent: Repository,
    release_branch: OnceCell<String>,
}

impl ForkManager {
    /// Resolve the authenticated user, the fork and its parent.
    pub async fn connect(client: GitHubClient, fork_name: &str) -> Result<Self> {
        let user = client.authenticated_user().await?;
        let fork = client.repository(fork_name).await?;
        let parent = fork
            .parent
            .as_deref()
            .cloned()
            .ok_or_else(|| Error::Other(format!("{} is not a fork", fork.full_name)))?;

        info!(fork = %fork.full_name, parent = %parent.full_name, user = %user.login, "Connected to fork");
        Ok(Self {
            client,
            user,
            fork,
            parent,
            release_branch: OnceCell::new(),
        })
    }

    pub fn client(&self) -> &GitHubClient {
        &self.client
    }

    pub fn fork(&self) -> &Repository {
        &self.fork
    }

    pub fn parent(&self) -> &Repository {
        &self.parent
    }

    /// URL for pushing to the fork. GitHub forks get the token embedded;
    /// any other clone URL is used as is.
    pub fn push_url(&self, login: &str) -> String {
        if self.fork.clone_url.starts_with("https://github.com/") {
            authenticated_url(login, self.client.token(), &self.fork.full_name)
        } else {
            self.fork.clone_url.clone()
        }
    }

    /// `fog_release` when the parent has it, else the parent default branch.
    pub async fn release_branch(&self) -> Result<&str> {
        let branch = self
            .release_branch
            .get_or_try_init(|| async {
                match self
                    .client
                    .branch(&self.parent.full_name, FOG_RELEASE_BRANCH)
                    .await
                {
                    Ok(branch) => Ok(branch.name),
                    Err(e) if e.is_not_found() => Ok(self.parent.default_branch.clone()),
                    Err(e) => Err(Error::from(e)),
                }
            })
            .await?;
        Ok(branch.as_str())
    }

    /// Walk the parent tree at the release branch, breadth first, and
    /// return the first `manifest.json`.
    pub async fn parent_manifest(&self) -> Result<PluginManifest> {
        let branch = self.release_branch().await?;
        let repo = &self.parent.full_name;
        let mut queue = VecDeque::from([String::new()]);

        while let Some(dir) = queue.pop_front() {
            let entries = self.client.list_dir(repo, &dir, Some(branch)).await?;
            for entry in &entries {
                if entry.kind == ContentKind::File && entry.name == MANIFEST_FILE {
                    info!(path = %entry.path, "Found parent manifest");
                    let bytes = self
                        .client
                        .file_content(repo, &entry.path, Some(branch))
                        .await?;
                    return PluginManifest::from_slice(&bytes);
                }
            }
            queue.extend(
                entries
                    .into_iter()
                    .filter(|e| e.kind == ContentKind::Dir)
                    .map(|e| e.path),
            );
        }
        Err(Error::Manifest(format!(
            "{} not found in parent repository {}",
            MANIFEST_FILE, repo
        )))
    }

    /// Parent's `.fog_config.json`, if it has one.
    pub async fn parent_config(&self) -> Result<Option<FogConfig>> {
        match self
            .client
            .file_content(&self.parent.full_name, FOG_CONFIG_FILE, None)
            .await
        {
            Ok(bytes) => Ok(Some(FogConfig::from_slice(&bytes)?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Parent license; only MIT and GPL-3.0 are accepted.
    pub async fn check_license(&self) -> Result<LicenseInfo> {
        let license = match self.client.license(&self.parent.full_name).await {
            Ok(l) => l.license,
            Err(e) if e.is_not_found() => {
                return Err(Error::Other(format!(
                    "Error while getting license of {}: {}",
                    self.parent.full_name, e
                )));
            }
            Err(e) => return Err(e.into()),
        };
        if !ALLOWED_LICENSES.contains(&license.key.as_str()) {
            return Err(Error::Other(format!(
                "{} license is not supported",
                license.name
            )));
        }
        Ok(license)
    }

    /// The open `autoupdate` -> `master` pull request, if any.
    pub async fn autoupdate_pr(&self) -> Result<Option<PullRequest>> {
        let head = format!("{}:{}", self.fork.owner.login, AUTOUPDATE_BRANCH);
        let mut pulls = self
            .client
            .list_pulls(&self.fork.full_name, "open", BASE_BRANCH, &head)
            .await?;
        if pulls.len() > 1 {
            return Err(Error::Internal(format!(
                "{} open {} pull requests on {}",
                pulls.len(),
                AUTOUPDATE_BRANCH,
                self.fork.full_name
            )));
        }
        Ok(pulls.pop())
    }

    pub async fn create_or_update_pr(&self, version: &str) -> Result<PullRequest> {
        let title = format!("Version {}", version);
        let repo = &self.fork.full_name;

        if let Some(pr) = self.autoupdate_pr().await? {
            info!(number = pr.number, version = %version, "Updating pull request title");
            return Ok(self.client.update_pull_title(repo, pr.number, &title).await?);
        }

        info!(version = %version, "Creating pull request");
        let pr = self
            .client
            .create_pull(
                repo,
                &NewPullRequest {
                    title,
                    body: PR_BODY.to_string(),
                    base: BASE_BRANCH.to_string(),
                    head: AUTOUPDATE_BRANCH.to_string(),
                },
            )
            .await?;
        self.client
            .set_labels(repo, pr.number, &[AUTOUPDATE_LABEL])
            .await?;
        Ok(pr)
    }

    /// Ask the authenticated user to review the autoupdate pull request.
    pub async fn assign_review(&self) -> Result<()> {
        let pr = self
            .autoupdate_pr()
            .await?
            .ok_or_else(|| Error::Other("no open autoupdate pull request".into()))?;
        self.client
            .request_reviewers(&self.fork.full_name, pr.number, &[self.user.login.as_str()])
            .await?;
        Ok(())
    }

    /// Delete `heads/<branch>` or `tags/<tag>` on the fork.
    pub async fn remove_fork_ref(&self, git_ref: &str, ignore_missing: bool) -> Result<()> {
        let repo = &self.fork.full_name;
        match self.client.get_ref(repo, git_ref).await {
            Ok(_) => {
                info!(git_ref = %git_ref, "Deleting fork ref");
                Ok(self.client.delete_ref(repo, git_ref).await?)
            }
            Err(e) if e.is_not_found() && ignore_missing => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Publish a release with the given assets: create a draft, upload every
    /// asset, then publish. If any step after the draft fails, the draft is
    /// deleted and the error returned.
    pub async fn release(&self, tag: &str, assets: &[PathBuf]) -> Result<Release> {
        let repo = &self.fork.full_name;
        let name = format!("Release version {}", tag);
        let body = format!("Version {}", tag);

        let draft = self
            .client
            .create_release(
                repo,
                &NewRelease {
                    tag_name: tag.to_string(),
                    target_commitish: BASE_BRANCH.to_string(),
                    name: name.clone(),
                    body: body.clone(),
                    draft: true,
                },
            )
            .await?;

        match self.finalize_release(&draft, assets, name, body).await {
            Ok(release) => {
                info!(tag = %tag, assets = assets.len(), "Release published");
                Ok(release)
            }
            Err(e) => {
                warn!(tag = %tag, error = %e, "Failed to finalize release, removing draft");
                if let Err(delete_err) = self.client.delete_release(repo, draft.id).await {
                    warn!(error = %delete_err, "Could not delete draft release");
                }
                Err(e)
            }
        }
    }

    async fn finalize_release(
        &self,
        draft: &Release,
        assets: &[PathBuf],
        name: String,
        body: String,
    ) -> Result<Release> {
        for path in assets {
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| Error::Other(format!("invalid asset path {}", path.display())))?;
            let data = tokio::fs::read(path).await?;
            self.client
                .upload_release_asset(draft, file_name, "application/zip", data)
                .await?;
        }
        let release = self
            .client
            .update_release(
                &self.fork.full_name,
                draft.id,
                &ReleaseUpdate {
                    name: Some(name),
                    body: Some(body),
                    draft: Some(false),
                },
            )
            .await?;
        Ok(release)
    }

    pub async fn latest_release(&self) -> Result<Release> {
        Ok(self.client.latest_release(&self.fork.full_name).await?)
    }

    pub async fn send_dispatch(&self, event_type: &str) -> Result<()> {
        Ok(self
            .client
            .repository_dispatch(&self.fork.full_name, event_type)
            .await?)
    }
}
