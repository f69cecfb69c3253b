//! Chooses between the local profile and the remote registry for an input source.

use super::local::LocalSnapshot;
use super::{Handedness, HandednessQuery, Profile, ProfileError, ProfileRepository};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Where a controller's 3D asset is loaded from.
#[derive(Debug, Clone)]
pub enum AssetSource {
    Remote {
        repository: ProfileRepository,
        path: String,
    },
    Local(PathBuf),
}

impl AssetSource {
    pub async fn load_bytes(&self) -> Result<Vec<u8>, ProfileError> {
        match self {
            AssetSource::Remote { repository, path } => repository.fetch_bytes(path).await,
            AssetSource::Local(path) => tokio::fs::read(path).await.map_err(|e| ProfileError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }
}

impl fmt::Display for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetSource::Remote { repository, path } => write!(f, "{}/{}", repository, path),
            AssetSource::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub profile: Arc<Profile>,
    pub asset: Option<AssetSource>,
}

/// Snapshot of everything needed to resolve a profile off the render loop.
#[derive(Debug, Clone)]
pub struct ProfileResolver {
    repository: ProfileRepository,
    known_ids: BTreeSet<String>,
    local: Option<LocalSnapshot>,
}

impl ProfileResolver {
    pub fn new(
        repository: ProfileRepository,
        known_ids: BTreeSet<String>,
        local: Option<LocalSnapshot>,
    ) -> Self {
        Self {
            repository,
            known_ids,
            local,
        }
    }

    /// The local profile wins only when the first known id in `profiles` is its id.
    pub fn uses_local(&self, profiles: &[String]) -> bool {
        let Some(local) = &self.local else {
            return false;
        };
        profiles
            .iter()
            .find(|id| self.known_ids.contains(*id))
            .is_some_and(|id| *id == local.profile.profile_id)
    }

    pub async fn resolve(
        &self,
        profiles: &[String],
        handedness: Handedness,
    ) -> Result<ResolvedSource, ProfileError> {
        if let Some(local) = self.local.as_ref().filter(|_| self.uses_local(profiles)) {
            let layout = local.profile.layout(handedness).ok_or_else(|| {
                ProfileError::MissingHandedness {
                    handedness: handedness.to_string(),
                    profile_id: local.profile.profile_id.clone(),
                }
            })?;
            info!("Using local profile {}", local.profile.profile_id);
            return Ok(ResolvedSource {
                profile: local.profile.clone(),
                asset: local.asset_for(layout).map(AssetSource::Local),
            });
        }

        debug!("Resolving {:?} ({}) from {}", profiles, handedness, self.repository);
        let resolved = self
            .repository
            .fetch_profile(profiles, HandednessQuery::Exact(handedness), None, true)
            .await?;
        Ok(ResolvedSource {
            profile: Arc::new(resolved.profile),
            asset: resolved.asset_path.map(|path| AssetSource::Remote {
                repository: self.repository.clone(),
                path,
            }),
        })
    }
}
