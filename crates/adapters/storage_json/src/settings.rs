//! Hub settings document.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use omnihub_domain::error::OmniHubError;

use crate::file::{read_json, write_json};

/// User-facing hub preferences.
///
/// Unknown keys are kept in `extra` so a save never drops them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HubSettings {
    pub hub_name: String,
    pub room: String,
    pub network_ssid: String,
    /// Setup code shown when adding the hub to an accessory controller.
    #[serde(rename = "homekitCode")]
    pub accessory_code: String,
    pub auto_update: bool,
    pub remote_access: bool,
    pub default_scene: String,
    /// Days of camera footage to keep.
    pub camera_retention: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            hub_name: "OmniHub".to_string(),
            room: "Home".to_string(),
            network_ssid: "OmniHub Mesh".to_string(),
            accessory_code: "111-11-111".to_string(),
            auto_update: true,
            remote_access: false,
            default_scene: "evening".to_string(),
            camera_retention: 7,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the settings, writing the defaults first when the file is missing.
    ///
    /// # Errors
    ///
    /// Returns [`OmniHubError::Storage`] when the file cannot be read, parsed
    /// or seeded.
    pub async fn load(&self) -> Result<HubSettings, OmniHubError> {
        if let Some(settings) = read_json(&self.path).await? {
            return Ok(settings);
        }
        let settings = HubSettings::default();
        write_json(&self.path, &settings).await?;
        tracing::info!(path = %self.path.display(), "seeded default settings");
        Ok(settings)
    }

    /// Replace the whole settings document.
    ///
    /// # Errors
    ///
    /// Returns [`OmniHubError::Storage`] when the file cannot be written.
    pub async fn save(&self, settings: &HubSettings) -> Result<(), OmniHubError> {
        write_json(&self.path, settings).await?;
        Ok(())
    }
}
