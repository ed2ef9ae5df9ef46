//! Assemble a distributable copy of an integration.

use crate::fork::BASE_BRANCH;
use forkkeep_core::manifest::{FogConfig, MANIFEST_FILE, PluginManifest, RELEASE_FILE};
use forkkeep_core::{Error, Result};
use glob::Pattern;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::process::Command;
use tracing::{debug, info};

const REQUIREMENTS: &str = "requirements/app.txt";
const REQUIREMENTS_FALLBACK: &str = "requirements.txt";

/// File name patterns never copied into the build.
const IGNORED: &[&str] = &[RELEASE_FILE, ".*", "test_*.py", "*_test.py", "*.pyc"];

/// Platform a build bundles dependencies for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Macos,
}

impl Platform {
    /// Platform of the running machine, when builds are supported there.
    pub fn host() -> Option<Self> {
        if cfg!(target_os = "windows") {
            Some(Self::Windows)
        } else if cfg!(target_os = "macos") {
            Some(Self::Macos)
        } else {
            None
        }
    }

    /// Value for pip's `--platform`.
    pub fn pip_tag(self) -> &'static str {
        match self {
            Self::Windows => "win32",
            Self::Macos => "macosx_10_13_x86_64",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Windows => write!(f, "windows"),
            Self::Macos => write!(f, "macos"),
        }
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "windows" | "win32" => Ok(Self::Windows),
            "macos" | "darwin" => Ok(Self::Macos),
            other => Err(Error::Config(format!(
                "Unsupported platform '{}', expected windows or macos",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Root of the fork checkout.
    pub repo_root: PathBuf,
    pub output: PathBuf,
    /// `owner/name` used in the manifest `update_url`.
    pub repo_name: String,
    pub platform: Platform,
    pub install_command: String,
}

/// URL the integration polls for new releases.
pub fn update_url(repo_name: &str) -> String {
    format!(
        "https://raw.githubusercontent.com/{}/{}/{}",
        repo_name, BASE_BRANCH, RELEASE_FILE
    )
}

fn requirements_path(repo_root: &Path) -> Result<PathBuf> {
    [REQUIREMENTS, REQUIREMENTS_FALLBACK]
        .iter()
        .map(|p| repo_root.join(p))
        .find(|p| p.is_file())
        .ok_or_else(|| {
            Error::Config(format!(
                "No requirements file found in {}",
                repo_root.display()
            ))
        })
}

fn ignore_patterns() -> Result<Vec<Pattern>> {
    IGNORED
        .iter()
        .map(|p| Pattern::new(p).map_err(|e| Error::Internal(format!("pattern {}: {}", p, e))))
        .collect()
}

fn copy_tree(src: &Path, dest: &Path, ignored: &[Pattern]) -> Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if ignored.iter().any(|p| p.matches(&name_str)) {
            debug!(path = %entry.path().display(), "Skipping");
            continue;
        }
        let target = dest.join(&name);
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target, ignored)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn remove_matching(pattern: &str, dirs: bool) -> Result<usize> {
    let paths = glob::glob(pattern)
        .map_err(|e| Error::Internal(format!("pattern {}: {}", pattern, e)))?
        .filter_map(|entry| entry.ok());
    let mut removed = 0;
    for path in paths {
        if dirs && path.is_dir() {
            std::fs::remove_dir_all(&path)?;
            removed += 1;
        } else if !dirs && path.is_file() {
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Fill the `{requirements}`, `{target}` and `{platform}` placeholders of
/// an install command template.
pub fn render_install_command(
    template: &str,
    requirements: &Path,
    target: &Path,
    platform: Platform,
) -> String {
    template
        .replace("{requirements}", &requirements.to_string_lossy())
        .replace("{target}", &target.to_string_lossy())
        .replace("{platform}", platform.pip_tag())
}

async fn install_dependencies(command: &str) -> Result<()> {
    info!(command = %command, "Installing dependencies");

    let output = Command::new("sh").arg("-c").arg(&command).output().await?;
    if !output.status.success() {
        return Err(Error::StepFailed {
            step: "install dependencies".into(),
            exit_code: output.status.code().unwrap_or(-1),
        });
    }
    Ok(())
}

/// Absolute output path with symlinks in its existing parent resolved.
fn resolve_output(output: &Path) -> Result<PathBuf> {
    let output = std::path::absolute(output)?;
    match (output.parent(), output.file_name()) {
        (Some(parent), Some(name)) if parent.exists() => Ok(parent.canonicalize()?.join(name)),
        _ => Ok(output),
    }
}

/// Build the integration into `options.output` and return the path of the
/// written manifest.
pub async fn build(options: &BuildOptions) -> Result<PathBuf> {
    let repo_root = options.repo_root.canonicalize()?;
    let src = PluginManifest::locate(&repo_root)?;
    let output = resolve_output(&options.output)?;
    if output.starts_with(&src) {
        return Err(Error::Config(format!(
            "Output {} cannot be inside the source directory {}",
            output.display(),
            src.display()
        )));
    }
    let requirements = requirements_path(&repo_root)?;
    let config = FogConfig::load_or_default(&repo_root)?;

    if output.exists() {
        std::fs::remove_dir_all(&output)?;
    }
    info!(src = %src.display(), output = %output.display(), "Copying integration code");
    copy_tree(&src, &output, &ignore_patterns()?)?;

    let target = output.join(&config.dependencies_dir);
    let command = render_install_command(
        &options.install_command,
        &requirements,
        &target,
        options.platform,
    );
    install_dependencies(&command).await?;

    let dist_info = remove_matching(&format!("{}/*.dist-info", target.to_string_lossy()), true)?;
    let tests = remove_matching(&format!("{}/**/test_*.py", output.to_string_lossy()), false)?;
    info!(dist_info, tests, "Cleaned up build output");

    let mut manifest = PluginManifest::load(&src.join(MANIFEST_FILE))?;
    manifest.set_update_url(update_url(&options.repo_name));
    let manifest_path = output.join(MANIFEST_FILE);
    manifest.save(&manifest_path)?;
    Ok(manifest_path)
}
