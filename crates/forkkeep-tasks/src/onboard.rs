//! Take an upstream integration under maintenance.

use crate::fork::ForkManager;
use forkkeep_core::manifest::SyncConfig;
use forkkeep_core::{Error, Result};
use forkkeep_github::{GitHubClient, Repository, RepositoryEdit};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::info;

pub const FORK_NAME_PREFIX: &str = "galaxy-integration-";
pub const FORK_DESCRIPTION: &str = "In case of any issues please refer to the original repository:";
pub const BOT_PERMISSION: &str = "push";

pub struct OnboardOptions {
    /// `owner/name` of the upstream repository.
    pub upstream: String,
    /// `config.json` listing the forks to sync.
    pub sync_config: PathBuf,
    /// Client authenticated as the bot, used to accept the invitation.
    pub bot_client: GitHubClient,
    pub bot_login: String,
    pub invitation_timeout: Duration,
    pub poll_interval: Duration,
}

impl OnboardOptions {
    pub fn new(
        upstream: impl Into<String>,
        sync_config: impl Into<PathBuf>,
        bot_client: GitHubClient,
        bot_login: impl Into<String>,
    ) -> Self {
        Self {
            upstream: upstream.into(),
            sync_config: sync_config.into(),
            bot_client,
            bot_login: bot_login.into(),
            invitation_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardReport {
    pub fork: String,
    pub added_to_config: bool,
    pub bot_invited: bool,
}

/// Our fork of `upstream`, created when the user has none yet.
pub async fn fork_repository(client: &GitHubClient, upstream: &str) -> Result<Repository> {
    let user = client.authenticated_user().await?;
    let forks = client.list_forks(upstream).await?;
    if let Some(fork) = forks.into_iter().find(|f| f.owner.login == user.login) {
        info!(fork = %fork.full_name, "Already forked");
        return Ok(fork);
    }
    info!(upstream = %upstream, "Not forked yet, forking");
    Ok(client.create_fork(upstream).await?)
}

/// Rename the fork after the integration platform and point it at the
/// original repository.
pub async fn edit_metadata(manager: &ForkManager) -> Result<Repository> {
    let manifest = manager.parent_manifest().await?;
    let edit = RepositoryEdit {
        name: Some(format!("{}{}", FORK_NAME_PREFIX, manifest.platform()?)),
        description: Some(FORK_DESCRIPTION.to_string()),
        homepage: Some(manager.parent().html_url.clone()),
        has_issues: Some(false),
        allow_squash_merge: Some(false),
    };
    info!(name = ?edit.name, homepage = ?edit.homepage, "Editing fork metadata");
    Ok(manager
        .client()
        .edit_repository(&manager.fork().full_name, &edit)
        .await?)
}

/// Add `name` to the sync list; returns false when it was already there.
pub fn add_to_synced(path: &std::path::Path, name: &str) -> Result<bool> {
    let mut config = SyncConfig::load(path)?;
    if !config.add(name) {
        info!(fork = %name, "Already in sync config");
        return Ok(false);
    }
    config.save(path)?;
    info!(fork = %name, "Added to sync config");
    Ok(true)
}

/// Accept the first pending invitation of the bot, polling until
/// `timeout`.
pub async fn accept_invitation(
    bot_client: &GitHubClient,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<u64> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Some(invitation) = bot_client.list_invitations().await?.into_iter().next() {
            bot_client.accept_invitation(invitation.id).await?;
            info!(invitation = invitation.id, "Bot accepted invitation");
            return Ok(invitation.id);
        }
        info!("No invitations received by bot yet");
        sleep(poll_interval).await;
    }
    Err(Error::Other(format!(
        "No invitation received by bot in {} seconds",
        timeout.as_secs()
    )))
}

pub async fn onboard(client: &GitHubClient, options: &OnboardOptions) -> Result<OnboardReport> {
    let fork = fork_repository(client, &options.upstream).await?;
    let manager = ForkManager::connect(client.clone(), &fork.full_name).await?;

    client.watch(&fork.full_name).await?;
    let renamed = edit_metadata(&manager).await?;
    let added_to_config = add_to_synced(&options.sync_config, &renamed.name)?;

    let collaborators = client.list_collaborators(&renamed.full_name).await?;
    let bot_invited = if collaborators.iter().any(|u| u.login == options.bot_login) {
        info!(bot = %options.bot_login, "Bot is already a collaborator");
        false
    } else {
        client
            .add_collaborator(&renamed.full_name, &options.bot_login, BOT_PERMISSION)
            .await?;
        accept_invitation(
            &options.bot_client,
            options.invitation_timeout,
            options.poll_interval,
        )
        .await?;
        true
    };

    Ok(OnboardReport {
        fork: renamed.full_name,
        added_to_config,
        bot_invited,
    })
}
