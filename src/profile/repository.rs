//! Read access to a published profile distribution.
//!
//! The distribution is a tree with `profilesList.json` at its root and one
//! `<id>/profile.json` plus assets per profile. It is served either from a
//! local directory or from an HTTP base URL.

use super::{HandednessQuery, Profile, ProfileError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

pub const PROFILES_LIST_FILE: &str = "profilesList.json";
const PROFILE_FILE: &str = "profile.json";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileListEntry {
    pub path: String,
    #[serde(default)]
    pub deprecated: bool,
}

/// Contents of `profilesList.json`, keyed by profile id.
pub type ProfilesList = BTreeMap<String, ProfileListEntry>;

/// A fetched profile and, when requested, the asset path of the chosen layout
/// relative to the repository root.
#[derive(Debug, Clone)]
pub struct ResolvedProfile {
    pub profile: Profile,
    pub asset_path: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ProfileRepository {
    Directory(PathBuf),
    Http {
        client: reqwest::Client,
        base_url: String,
    },
}

impl ProfileRepository {
    /// `http://` and `https://` sources are remote; anything else is a directory.
    pub fn from_source(source: &str) -> Result<Self, ProfileError> {
        if source.starts_with("http://") || source.starts_with("https://") {
            let client = reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .map_err(|e| ProfileError::Network {
                    url: source.to_string(),
                    message: e.to_string(),
                })?;
            Ok(ProfileRepository::Http {
                client,
                base_url: source.trim_end_matches('/').to_string(),
            })
        } else {
            Ok(ProfileRepository::Directory(PathBuf::from(source)))
        }
    }

    /// Reads a file below the repository root.
    pub async fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>, ProfileError> {
        match self {
            ProfileRepository::Directory(root) => {
                let full = root.join(path);
                debug!("Reading {}", full.display());
                tokio::fs::read(&full).await.map_err(|e| ProfileError::Io {
                    path: full.display().to_string(),
                    message: e.to_string(),
                })
            }
            ProfileRepository::Http { client, base_url } => {
                let url = format!("{}/{}", base_url, path);
                debug!("GET {}", url);
                let network = |e: reqwest::Error| ProfileError::Network {
                    url: url.clone(),
                    message: e.to_string(),
                };
                let response = client
                    .get(&url)
                    .send()
                    .await
                    .map_err(network)?
                    .error_for_status()
                    .map_err(network)?;
                let bytes = response.bytes().await.map_err(network)?;
                Ok(bytes.to_vec())
            }
        }
    }

    pub async fn fetch_profiles_list(&self) -> Result<ProfilesList, ProfileError> {
        let bytes = self.fetch_bytes(PROFILES_LIST_FILE).await?;
        let list: ProfilesList =
            serde_json::from_slice(&bytes).map_err(|e| ProfileError::Schema(e.to_string()))?;
        info!("Loaded profiles list with {} entries from {}", list.len(), self);
        Ok(list)
    }

    /// Fetches the first profile of `profiles` the repository knows about.
    ///
    /// Falls back to `default_profile` when none match. With `want_asset_path`
    /// the layout for `handedness` must exist (the first layout for `Any`).
    pub async fn fetch_profile(
        &self,
        profiles: &[String],
        handedness: HandednessQuery,
        default_profile: Option<&str>,
        want_asset_path: bool,
    ) -> Result<ResolvedProfile, ProfileError> {
        let list = self.fetch_profiles_list().await?;

        let matched = profiles
            .iter()
            .find_map(|id| list.get(id).map(|entry| (id.as_str(), entry)));
        let (profile_id, entry) = match (matched, default_profile) {
            (Some(found), _) => found,
            (None, None) => {
                return Err(ProfileError::NoMatch(
                    "No matching profile name found".to_string(),
                ))
            }
            (None, Some(default)) => match list.get(default) {
                Some(entry) => (default, entry),
                None => {
                    return Err(ProfileError::NoMatch(format!(
                        "No matching profile name found and default profile \"{}\" missing.",
                        default
                    )))
                }
            },
        };

        debug!("Fetching profile {} from {}", profile_id, entry.path);
        let profile = Profile::from_json(&self.fetch_bytes(&entry.path).await?)?;

        let mut asset_path = None;
        if want_asset_path {
            let layout = match handedness {
                HandednessQuery::Any => profile.layouts.values().next(),
                HandednessQuery::Exact(hand) => profile.layout(hand),
            }
            .ok_or_else(|| ProfileError::MissingHandedness {
                handedness: handedness.to_string(),
                profile_id: profile_id.to_string(),
            })?;
            asset_path = layout
                .asset_path
                .as_ref()
                .map(|asset| sibling_path(&entry.path, asset));
        }

        Ok(ResolvedProfile {
            profile,
            asset_path,
        })
    }
}

/// Replaces the trailing `profile.json` of a profile path with `asset`.
fn sibling_path(profile_path: &str, asset: &str) -> String {
    match profile_path.strip_suffix(PROFILE_FILE) {
        Some(dir) => format!("{}{}", dir, asset),
        None => profile_path.replacen(PROFILE_FILE, asset, 1),
    }
}

impl fmt::Display for ProfileRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileRepository::Directory(root) => write!(f, "{}", root.display()),
            ProfileRepository::Http { base_url, .. } => f.write_str(base_url),
        }
    }
}
