//! Viewer configuration, stored as TOML in the user's config directory.

use crate::input::hardware::HardwareSettings;
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CONFIG_DIR: &str = "motionviewer";
const CONFIG_FILE: &str = "viewer_config.toml";
const STATE_FILE: &str = "viewer_state.toml";

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    /// Directory or `http(s)://` base URL of the profile distribution.
    pub profiles_source: String,
    pub backgrounds_dir: PathBuf,
    pub default_background: String,
    pub state_file: PathBuf,
    /// Local profile files read on start, without changing the stored selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_profile_dir: Option<PathBuf>,
    pub frame_interval_ms: u64,
    pub hardware: HardwareSettings,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            profiles_source: "./profiles".to_string(),
            backgrounds_dir: PathBuf::from("./backgrounds"),
            default_background: "georgentor".to_string(),
            state_file: config_dir().join(STATE_FILE),
            local_profile_dir: None,
            frame_interval_ms: 16,
            hardware: HardwareSettings::default(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
}

impl ViewerConfig {
    pub fn default_path() -> PathBuf {
        config_dir().join(CONFIG_FILE)
    }

    /// Writes the default configuration when `path` does not exist yet.
    pub async fn ensure_default_config(path: &Path) -> Result<()> {
        if tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check for config file: {}", e))?
        {
            return Ok(());
        }

        info!("Creating default configuration at {}", path.display());
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }
        let content = toml::to_string_pretty(&ViewerConfig::default())
            .map_err(|e| eyre!("Failed to serialize default config: {}", e))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write default config: {}", e))?;
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
        let config: ViewerConfig =
            toml::from_str(&content).map_err(|e| eyre!("Failed to parse config file: {}", e))?;
        debug!("Loaded config: {:?}", config);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_config_is_written_once() {
        let path = std::env::temp_dir()
            .join(format!("motionviewer-config-{}", std::process::id()))
            .join(CONFIG_FILE);

        ViewerConfig::ensure_default_config(&path).await.unwrap();
        let loaded = ViewerConfig::load(&path).await.unwrap();
        assert_eq!(loaded, ViewerConfig::default());

        tokio::fs::write(&path, "frame_interval_ms = 33\n")
            .await
            .unwrap();
        ViewerConfig::ensure_default_config(&path).await.unwrap();
        let edited = ViewerConfig::load(&path).await.unwrap();
        assert_eq!(edited.frame_interval_ms, 33);
        assert_eq!(edited.default_background, "georgentor");
    }
}
