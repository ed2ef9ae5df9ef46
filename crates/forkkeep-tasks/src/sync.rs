//! Bring a new upstream release into the fork's `autoupdate` branch.

use crate::fork::{AUTOUPDATE_BRANCH, BASE_BRANCH, ForkManager};
use crate::{ORIGIN_REMOTE, TaskSettings, UPSTREAM_REMOTE};
use forkkeep_core::manifest::{PluginManifest, RELEASE_FILE};
use forkkeep_core::version::StrictVersion;
use forkkeep_core::{Error, Result};
use forkkeep_git::GitRepo;
use tracing::{info, warn};

/// Paths the fork owns; upstream content never replaces them.
pub const RESERVED_PATHS: &[&str] = &["README.md", ".github/", RELEASE_FILE];

/// Version in the fork checkout, or `None` when it has no manifest yet.
fn local_version(repo: &GitRepo) -> Result<Option<StrictVersion>> {
    match PluginManifest::locate(repo.dir()) {
        Ok(dir) => Ok(Some(
            PluginManifest::load(&dir.join(forkkeep_core::manifest::MANIFEST_FILE))?
                .strict_version()?,
        )),
        Err(Error::Manifest(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Synchronize upstream into `autoupdate` and open or refresh the pull
/// request. `repo` is a checkout of the fork with `origin` pointing at it.
///
/// Returns `true` when new changes were pushed.
pub async fn sync(manager: &ForkManager, repo: &GitRepo, settings: &TaskSettings) -> Result<bool> {
    manager.check_license().await?;
    let upstream_manifest = manager.parent_manifest().await?;
    let upstream_raw = upstream_manifest.version()?.to_string();
    let upstream = upstream_manifest.strict_version()?;

    let repo = repo.clone().with_secret(manager.client().token());
    repo.set_remote_url(ORIGIN_REMOTE, &manager.push_url(&settings.owner.login))
        .await?;
    if repo
        .add_remote(UPSTREAM_REMOTE, &manager.parent().clone_url)
        .await
        .is_err()
    {
        repo.set_remote_url(UPSTREAM_REMOTE, &manager.parent().clone_url)
            .await?;
    }

    repo.configure_user(&settings.bot.login, &settings.bot.email)
        .await?;
    repo.checkout_tracking_or_create(ORIGIN_REMOTE, BASE_BRANCH)
        .await?;

    let initial = match local_version(&repo)? {
        Some(local) if upstream <= local => {
            info!(upstream = %upstream, local = %local, "No new version to sync");
            return Ok(false);
        }
        Some(local) => {
            info!(upstream = %upstream, local = %local, "New upstream version");
            false
        }
        None => {
            info!("No local manifest, treating as initial sync");
            true
        }
    };

    if manager.autoupdate_pr().await?.is_none() {
        info!("No open pull request, dropping stale {} branch", AUTOUPDATE_BRANCH);
        manager
            .remove_fork_ref(&format!("heads/{}", AUTOUPDATE_BRANCH), true)
            .await?;
        // The remote-tracking ref may still exist in this checkout.
        repo.run_unchecked(&[
            "branch",
            "-r",
            "-D",
            &format!("{}/{}", ORIGIN_REMOTE, AUTOUPDATE_BRANCH),
        ])
        .await?;
    }
    repo.checkout_tracking_or_create(ORIGIN_REMOTE, AUTOUPDATE_BRANCH)
        .await?;
    repo.fetch(UPSTREAM_REMOTE).await?;

    let release_branch = manager.release_branch().await?;
    info!(branch = %release_branch, "Merging upstream release branch");
    repo.merge_theirs(&format!("{}/{}", UPSTREAM_REMOTE, release_branch), initial)
        .await?;

    restore_reserved_paths(&repo).await?;

    match manager.parent_config().await? {
        Some(config) if config.has_dependencies_dir() => {
            info!(dir = %config.dependencies_dir, "Unstaging upstream dependencies directory");
            repo.reset_path(&config.dependencies_dir).await?;
        }
        _ => info!("No dependencies_dir in upstream config"),
    }

    if !repo.has_staged_changes().await? {
        info!("No changes found");
        return Ok(false);
    }
    repo.commit("Merge upstream").await?;
    repo.push(ORIGIN_REMOTE, AUTOUPDATE_BRANCH).await?;

    manager.create_or_update_pr(&upstream_raw).await?;
    if let Err(e) = manager.assign_review().await {
        warn!(error = %e, "Could not request review");
    }
    Ok(true)
}

/// Reset every reserved path to its state on `origin/master`: upstream
/// edits are dropped and upstream additions removed.
async fn restore_reserved_paths(repo: &GitRepo) -> Result<()> {
    let base = format!("{}/{}", ORIGIN_REMOTE, BASE_BRANCH);
    for path in RESERVED_PATHS {
        repo.run_unchecked(&["rm", "-r", "-q", "--ignore-unmatch", "-f", "--", path])
            .await?;
        let full = repo.dir().join(path);
        if full.is_dir() {
            std::fs::remove_dir_all(&full)?;
        } else if full.exists() {
            std::fs::remove_file(&full)?;
        }
        if let Err(e) = repo.checkout_path(&base, path).await {
            warn!(path = %path, error = %e, "Cannot restore reserved path from {}", base);
        }
    }
    Ok(())
}
