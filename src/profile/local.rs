//! Profiles assembled from user supplied files.
//!
//! The user hands over a registry document, optionally a `profile.json` asset
//! override document, and any number of `.glb` assets. A successful build
//! replaces the current local profile and notifies subscribers; a failed one
//! leaves everything as it was.

use super::asset::{build_profile, AssetProfileDocument};
use super::registry::RegistryProfile;
use super::{Layout, Profile, ProfileError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

const ASSET_OVERRIDE_FILE: &str = "profile.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Asset,
    AssetOverrides,
    Registry,
    Ignored,
}

impl FileKind {
    pub fn classify(file_name: &str) -> Self {
        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".glb") {
            FileKind::Asset
        } else if file_name == ASSET_OVERRIDE_FILE {
            FileKind::AssetOverrides
        } else if lower.ends_with(".json") {
            FileKind::Registry
        } else {
            FileKind::Ignored
        }
    }
}

/// A user supplied file. Asset bytes are not needed to build a profile, only
/// the path they can be loaded from later.
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub name: String,
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

/// Profile and asset map handed to the resolver.
#[derive(Debug, Clone)]
pub struct LocalSnapshot {
    pub profile: Arc<Profile>,
    pub assets: BTreeMap<String, PathBuf>,
}

impl LocalSnapshot {
    /// Maps a layout's asset path onto a supplied file, falling back to the bare name.
    pub fn asset_for(&self, layout: &Layout) -> Option<PathBuf> {
        let name = layout.asset_path.as_deref()?;
        Some(
            self.assets
                .get(name)
                .cloned()
                .unwrap_or_else(|| PathBuf::from(name)),
        )
    }
}

#[derive(Debug)]
pub struct LocalProfile {
    current: Option<LocalSnapshot>,
    changed: watch::Sender<Option<Arc<Profile>>>,
}

impl Default for LocalProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalProfile {
    pub fn new() -> Self {
        let (changed, _) = watch::channel(None);
        Self {
            current: None,
            changed,
        }
    }

    /// Receives the new profile every time a local build succeeds.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Profile>>> {
        self.changed.subscribe()
    }

    pub fn profile(&self) -> Option<&Arc<Profile>> {
        self.current.as_ref().map(|snapshot| &snapshot.profile)
    }

    pub fn snapshot(&self) -> Option<LocalSnapshot> {
        self.current.clone()
    }

    /// Reads every regular file of `dir`.
    pub async fn read_directory(dir: &Path) -> Result<Vec<LocalFile>, ProfileError> {
        let io = |e: std::io::Error| ProfileError::Io {
            path: dir.display().to_string(),
            message: e.to_string(),
        };
        let mut entries = tokio::fs::read_dir(dir).await.map_err(io)?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io)? {
            if entry.file_type().await.map_err(io)?.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Self::read_files(&paths).await
    }

    pub async fn read_files(paths: &[PathBuf]) -> Result<Vec<LocalFile>, ProfileError> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let contents = match FileKind::classify(&name) {
                FileKind::Asset | FileKind::Ignored => Vec::new(),
                FileKind::AssetOverrides | FileKind::Registry => {
                    tokio::fs::read(path).await.map_err(|e| ProfileError::Io {
                        path: path.display().to_string(),
                        message: e.to_string(),
                    })?
                }
            };
            files.push(LocalFile {
                name,
                path: path.clone(),
                contents,
            });
        }
        Ok(files)
    }

    /// Builds a profile from `files` and makes it current.
    pub fn load_files(&mut self, files: &[LocalFile]) -> Result<Arc<Profile>, ProfileError> {
        let mut assets = BTreeMap::new();
        let mut registry_file = None;
        let mut override_file = None;

        for file in files {
            match FileKind::classify(&file.name) {
                FileKind::Asset => {
                    assets.insert(file.name.clone(), file.path.clone());
                }
                FileKind::AssetOverrides => override_file = Some(file),
                FileKind::Registry => registry_file = Some(file),
                FileKind::Ignored => debug!("Ignoring local file {}", file.name),
            }
        }

        let registry_file = registry_file.ok_or(ProfileError::NoRegistryProfile)?;
        let registry = RegistryProfile::from_json(&registry_file.contents).inspect_err(|e| {
            warn!("Registry file {} rejected: {}", registry_file.name, e);
        })?;

        let asset = match override_file {
            Some(file) => AssetProfileDocument::from_json(&file.contents).inspect_err(|e| {
                warn!("Asset override file {} rejected: {}", file.name, e);
            })?,
            None => AssetProfileDocument::empty(&registry.profile_id),
        };

        let profile = Arc::new(build_profile(&registry, &asset)?);
        info!(
            "Loaded local profile {} with {} assets",
            profile.profile_id,
            assets.len()
        );

        self.current = Some(LocalSnapshot {
            profile: profile.clone(),
            assets,
        });
        self.changed.send_replace(Some(profile.clone()));
        Ok(profile)
    }
}
