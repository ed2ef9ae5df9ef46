//! Point `current_version.json` at the latest release.

use crate::fork::{BASE_BRANCH, ForkManager};
use crate::{ORIGIN_REMOTE, TaskSettings};
use forkkeep_core::manifest::{
    MANIFEST_FILE, PluginManifest, RELEASE_FILE, ReleaseFile, ReleaseFileAsset,
};
use forkkeep_core::{Error, Result};
use forkkeep_git::GitRepo;
use tracing::info;

pub const RELEASE_FILE_COMMIT_MESSAGE: &str = "Updated current_version.json";

/// Write the release file for the latest release, commit it and push to
/// `master`. The release tag must match the local manifest version.
pub async fn update_release_file(
    manager: &ForkManager,
    repo: &GitRepo,
    settings: &TaskSettings,
) -> Result<ReleaseFile> {
    let release = manager.latest_release().await?;
    let manifest_dir = PluginManifest::locate(repo.dir())?;
    let manifest = PluginManifest::load(&manifest_dir.join(MANIFEST_FILE))?;
    let local = manifest.version()?;
    if release.tag_name != local {
        return Err(Error::Other(format!(
            "remote tag '{}' does not match with the local one '{}'",
            release.tag_name, local
        )));
    }

    let file = ReleaseFile {
        tag_name: release.tag_name.clone(),
        assets: release
            .assets
            .iter()
            .map(|a| ReleaseFileAsset {
                browser_download_url: a.browser_download_url.clone(),
                name: a.name.clone(),
            })
            .collect(),
    };
    file.save(&repo.dir().join(RELEASE_FILE))?;
    info!(tag = %file.tag_name, assets = file.assets.len(), "Wrote {}", RELEASE_FILE);

    let repo = repo.clone().with_secret(manager.client().token());
    repo.configure_user(&settings.bot.login, &settings.bot.email)
        .await?;
    repo.set_remote_url(ORIGIN_REMOTE, &manager.push_url(&settings.owner.login))
        .await?;
    repo.add(RELEASE_FILE).await?;
    repo.commit(RELEASE_FILE_COMMIT_MESSAGE).await?;
    repo.push_head_to(ORIGIN_REMOTE, BASE_BRANCH).await?;
    Ok(file)
}
