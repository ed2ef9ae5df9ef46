//! JSON files kept in integration repositories.
//!
//! - `manifest.json`: the integration's own manifest (version, platform, ...)
//! - `.fog_config.json`: per-repository packaging options
//! - `current_version.json`: release pointer consumed by the update check
//! - `config.json`: list of forks kept in sync

use crate::error::{Error, Result};
use crate::version::StrictVersion;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const FOG_CONFIG_FILE: &str = ".fog_config.json";
pub const RELEASE_FILE: &str = "current_version.json";
pub const SYNC_CONFIG_FILE: &str = "config.json";

/// `manifest.json`. Unknown fields are preserved on write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginManifest(Map<String, Value>);

impl PluginManifest {
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::Manifest(format!(
                "manifest must be a JSON object, got {}",
                other
            ))),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::from_value(serde_json::from_slice(bytes)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_slice(&std::fs::read(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(&self.0)?)?;
        Ok(())
    }

    fn string_field(&self, key: &str) -> Result<&str> {
        self.0
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Manifest(format!("manifest has no '{}' string", key)))
    }

    pub fn version(&self) -> Result<&str> {
        self.string_field("version")
    }

    pub fn strict_version(&self) -> Result<StrictVersion> {
        self.version()?.parse()
    }

    pub fn set_version(&mut self, version: &StrictVersion) {
        self.0
            .insert("version".into(), Value::String(version.to_string()));
    }

    pub fn platform(&self) -> Result<&str> {
        self.string_field("platform")
    }

    pub fn set_update_url(&mut self, url: impl Into<String>) {
        self.0.insert("update_url".into(), Value::String(url.into()));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Find the directory holding `manifest.json`, searching `root`
    /// breadth-first with entries visited in name order.
    pub fn locate(root: &Path) -> Result<PathBuf> {
        let mut queue = VecDeque::from([root.to_path_buf()]);
        while let Some(dir) = queue.pop_front() {
            if dir.join(MANIFEST_FILE).is_file() {
                return Ok(dir);
            }
            let mut children: Vec<PathBuf> = std::fs::read_dir(&dir)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n != ".git")
                })
                .collect();
            children.sort();
            queue.extend(children);
        }
        Err(Error::Manifest(format!(
            "no {} found under {}",
            MANIFEST_FILE,
            root.display()
        )))
    }
}

/// `.fog_config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FogConfig {
    #[serde(default = "default_dependencies_dir")]
    pub dependencies_dir: String,
}

fn default_dependencies_dir() -> String {
    ".".to_string()
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            dependencies_dir: default_dependencies_dir(),
        }
    }
}

impl FogConfig {
    /// Load from `dir`, falling back to defaults when the file is absent.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        match std::fs::read(dir.join(FOG_CONFIG_FILE)) {
            Ok(bytes) => Self::from_slice(&bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Whether dependencies live in their own subdirectory.
    pub fn has_dependencies_dir(&self) -> bool {
        let trimmed = self.dependencies_dir.trim_end_matches('/');
        !trimmed.is_empty() && trimmed != "."
    }
}

/// `current_version.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseFile {
    pub tag_name: String,
    pub assets: Vec<ReleaseFileAsset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseFileAsset {
    pub browser_download_url: String,
    pub name: String,
}

impl ReleaseFile {
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// `config.json` listing the forks kept in sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub forks_to_sync: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SyncConfig {
    pub fn load(path: &Path) -> Result<Self> {
        Ok(serde_json::from_slice(&std::fs::read(path)?)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Add a fork; returns false if it was already listed.
    pub fn add(&mut self, fork: &str) -> bool {
        if self.forks_to_sync.iter().any(|f| f == fork) {
            return false;
        }
        self.forks_to_sync.push(fork.to_string());
        true
    }
}
