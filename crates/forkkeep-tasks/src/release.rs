//! Zip built assets and publish them as a GitHub release.

use crate::fork::ForkManager;
use forkkeep_core::manifest::{MANIFEST_FILE, PluginManifest};
use forkkeep_core::{Error, Result};
use forkkeep_github::Release;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zip::write::FileOptions;

/// Archive names; a build directory entry whose name starts with one of
/// these (case insensitive) is packed into `<name>.zip`.
pub const ASSET_PLATFORMS: &[&str] = &["windows", "macos"];

fn zip_dir(src: &Path, archive: &Path) -> Result<()> {
    let file = File::create(archive)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut stack = vec![src.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .collect();
        entries.sort();
        for path in entries {
            let name = path
                .strip_prefix(src)
                .map_err(|e| Error::Internal(e.to_string()))?
                .to_string_lossy()
                .replace('\\', "/");
            if path.is_dir() {
                zip.add_directory(format!("{}/", name), options)
                    .map_err(zip_error)?;
                stack.push(path);
            } else {
                zip.start_file(name, options).map_err(zip_error)?;
                let mut buf = Vec::new();
                File::open(&path)?.read_to_end(&mut buf)?;
                zip.write_all(&buf)?;
            }
        }
    }
    zip.finish().map_err(zip_error)?;
    Ok(())
}

fn zip_error(err: zip::result::ZipError) -> Error {
    Error::Other(format!("zip error: {}", err))
}

/// Zip every platform directory of `build_dir` into an `assets` directory
/// next to it. The assets directory is recreated on each call.
pub fn package_assets(build_dir: &Path) -> Result<Vec<PathBuf>> {
    let build_dir = std::path::absolute(build_dir)?;
    let mut entries: Vec<String> = std::fs::read_dir(&build_dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    if entries.is_empty() {
        return Err(Error::Other(format!(
            "No assets found in {}",
            build_dir.display()
        )));
    }
    entries.sort();

    let assets_dir = build_dir
        .parent()
        .unwrap_or(Path::new("."))
        .join("assets");
    if assets_dir.exists() {
        std::fs::remove_dir_all(&assets_dir)?;
    }
    std::fs::create_dir_all(&assets_dir)?;

    let mut archives = Vec::new();
    for platform in ASSET_PLATFORMS {
        match entries
            .iter()
            .find(|name| name.to_lowercase().starts_with(platform))
        {
            Some(dir) => {
                let archive = assets_dir.join(format!("{}.zip", platform));
                info!(src = %dir, archive = %archive.display(), "Zipping asset");
                zip_dir(&build_dir.join(dir), &archive)?;
                archives.push(archive);
            }
            None => warn!(platform = %platform, "No asset for platform"),
        }
    }
    if archives.is_empty() {
        return Err(Error::Other(format!(
            "No windows or macos assets in {}",
            build_dir.display()
        )));
    }
    Ok(archives)
}

/// Package `build_dir` and release it under the local manifest version.
pub async fn release(manager: &ForkManager, repo_root: &Path, build_dir: &Path) -> Result<Release> {
    let archives = package_assets(build_dir)?;
    let manifest_dir = PluginManifest::locate(repo_root)?;
    let manifest = PluginManifest::load(&manifest_dir.join(MANIFEST_FILE))?;
    let tag = manifest.version()?;

    info!(tag = %tag, assets = archives.len(), "Creating release");
    manager.release(tag, &archives).await
}
