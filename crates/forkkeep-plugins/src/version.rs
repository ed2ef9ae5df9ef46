use crate::{Action, ActionInput, ActionOutput};
use async_trait::async_trait;
use forkkeep_core::Result;
use forkkeep_core::manifest::{MANIFEST_FILE, PluginManifest};
use tracing::info;

/// `version-bump`: increment the version in the `manifest.json` found
/// under `path`. Sets output `version`.
pub struct VersionBumpAction;

#[async_trait]
impl Action for VersionBumpAction {
    fn name(&self) -> &str {
        "version-bump"
    }

    async fn execute(&self, input: &ActionInput) -> Result<ActionOutput> {
        let dir = PluginManifest::locate(&input.path())?;
        let path = dir.join(MANIFEST_FILE);
        let mut manifest = PluginManifest::load(&path)?;

        let current = manifest.strict_version()?;
        let next = current.bump()?;
        manifest.set_version(&next);
        manifest.save(&path)?;

        info!(from = %current, to = %next, manifest = %path.display(), "Bumped version");
        Ok(ActionOutput::empty().with("version", next.to_string()))
    }
}
