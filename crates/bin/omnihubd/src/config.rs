//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `omnihub.toml` in the working directory unless another path is
//! given. Every field has a sensible default so the file is optional.
//! Environment variables take precedence over file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use omnihub_adapter_ble::BleConfig;
use omnihub_adapter_storage_json::{DisplaySeed, StoragePaths};
use omnihub_app::services::device_service::DeviceSettings;
use omnihub_app::services::hub::HubOptions;
use omnihub_app::services::pairing::PairingSettings;
use omnihub_domain::address::BtAddress;
use serde::Deserialize;

/// Default config file name.
pub const DEFAULT_CONFIG_FILE: &str = "omnihub.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// State file locations.
    pub storage: StorageConfig,
    /// Preconfigured display used when no device file exists.
    pub seed: SeedConfig,
    /// Host Bluetooth timeouts and pairing agent.
    pub bluetooth: BluetoothConfig,
    /// BLE adapter timing.
    pub ble: BleConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Where the JSON state files live.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding every state file unless overridden below.
    pub state_dir: PathBuf,
    pub devices_file: Option<PathBuf>,
    pub settings_file: Option<PathBuf>,
    pub update_history_file: Option<PathBuf>,
    pub accessories_file: Option<PathBuf>,
    pub ip_lights_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Bluetooth address of the seed display, in any accepted form.
    pub display_address: Option<String>,
    /// Legacy power characteristic of the seed display.
    pub display_power_char: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    pub scan_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub pair_timeout_secs: u64,
    /// Pairing agent IO capability (`NoInputNoOutput`, `DisplayYesNo`, ...).
    pub agent_capability: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `path` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path.as_ref())?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("OMNIHUB_DEVICE_STORE") {
            self.storage.devices_file = Some(val.into());
        }
        if let Some(val) = var("OMNIHUB_SETTINGS_STORE") {
            self.storage.settings_file = Some(val.into());
        }
        if let Some(val) = var("OMNIHUB_UPDATE_STORE") {
            self.storage.update_history_file = Some(val.into());
        }
        if let Some(val) = var("OMNIHUB_HOMEKIT_STORE") {
            self.storage.accessories_file = Some(val.into());
        }
        if let Some(val) = var("OMNIHUB_IP_LIGHTS_STORE") {
            self.storage.ip_lights_file = Some(val.into());
        }
        if let Some(val) = var("OMNIHUB_DISPLAY_BT_ADDR") {
            self.seed.display_address = Some(val);
        }
        if let Some(val) = var("OMNIHUB_DISPLAY_POWER_CHAR") {
            self.seed.display_power_char = Some(val);
        }
        if let Some(val) = var("OMNIHUB_SCAN_TIMEOUT") {
            if let Ok(secs) = val.trim().parse() {
                self.bluetooth.scan_timeout_secs = secs;
            }
        }
        if let Some(val) = var("OMNIHUB_BLUEZ_AGENT_CAP") {
            self.bluetooth.agent_capability = val;
        }
        if let Some(val) = var("OMNIHUB_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let timeouts = [
            ("scan_timeout_secs", self.bluetooth.scan_timeout_secs),
            ("connect_timeout_secs", self.bluetooth.connect_timeout_secs),
            ("pair_timeout_secs", self.bluetooth.pair_timeout_secs),
        ];
        for (name, secs) in timeouts {
            if secs == 0 {
                return Err(ConfigError::Validation(format!("{name} must be non-zero")));
            }
        }
        if self.bluetooth.agent_capability.trim().is_empty() {
            return Err(ConfigError::Validation(
                "agent_capability must not be empty".to_string(),
            ));
        }
        self.display_seed()?;
        Ok(())
    }

    /// State file paths with per-file overrides applied.
    #[must_use]
    pub fn storage_paths(&self) -> StoragePaths {
        let mut paths = StoragePaths::in_dir(&self.storage.state_dir);
        let overrides = [
            (&mut paths.devices, &self.storage.devices_file),
            (&mut paths.settings, &self.storage.settings_file),
            (&mut paths.update_history, &self.storage.update_history_file),
            (&mut paths.accessories, &self.storage.accessories_file),
            (&mut paths.ip_lights, &self.storage.ip_lights_file),
        ];
        for (path, configured) in overrides {
            if let Some(configured) = configured {
                path.clone_from(configured);
            }
        }
        paths
    }

    /// The seed display, when an address is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when the address does not parse.
    pub fn display_seed(&self) -> Result<Option<DisplaySeed>, ConfigError> {
        let Some(raw) = self
            .seed
            .display_address
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
        else {
            return Ok(None);
        };
        let address = BtAddress::parse(raw)
            .map_err(|err| ConfigError::Validation(format!("seed display address: {err}")))?;
        let power_attribute = self
            .seed
            .display_power_char
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(str::to_string);
        Ok(Some(DisplaySeed {
            address,
            power_attribute,
        }))
    }

    /// Service timeouts derived from the `[bluetooth]` section.
    #[must_use]
    pub fn hub_options(&self) -> HubOptions {
        HubOptions {
            devices: DeviceSettings {
                scan_timeout: Duration::from_secs(self.bluetooth.scan_timeout_secs),
                connect_timeout: Duration::from_secs(self.bluetooth.connect_timeout_secs),
            },
            pairing: PairingSettings {
                pair_timeout: Duration::from_secs(self.bluetooth.pair_timeout_secs),
                agent_capability: self.bluetooth.agent_capability.trim().to_string(),
            },
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("state"),
            devices_file: None,
            settings_file: None,
            update_history_file: None,
            accessories_file: None,
            ip_lights_file: None,
        }
    }
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            scan_timeout_secs: 12,
            connect_timeout_secs: 10,
            pair_timeout_secs: 15,
            agent_capability: "NoInputNoOutput".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "omnihubd=info,omnihub=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.storage.state_dir, PathBuf::from("state"));
        assert_eq!(config.bluetooth.scan_timeout_secs, 12);
        assert_eq!(config.bluetooth.connect_timeout_secs, 10);
        assert_eq!(config.bluetooth.pair_timeout_secs, 15);
        assert_eq!(config.bluetooth.agent_capability, "NoInputNoOutput");
        assert!(config.seed.display_address.is_none());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.bluetooth.scan_timeout_secs, 12);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [storage]
            state_dir = '/var/lib/omnihub'
            devices_file = '/tmp/devices.json'

            [seed]
            display_address = 'aa-bb-cc-dd-ee-ff'
            display_power_char = 'FF01'

            [bluetooth]
            scan_timeout_secs = 30
            connect_timeout_secs = 4
            pair_timeout_secs = 25
            agent_capability = 'DisplayYesNo'

            [ble]
            lookup_scan_secs = 2

            [logging]
            filter = 'debug'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.storage.state_dir, PathBuf::from("/var/lib/omnihub"));
        assert_eq!(config.bluetooth.scan_timeout_secs, 30);
        assert_eq!(config.bluetooth.agent_capability, "DisplayYesNo");
        assert_eq!(config.ble.lookup_scan_secs, 2);
        assert_eq!(config.logging.filter, "debug");

        let paths = config.storage_paths();
        assert_eq!(paths.devices, PathBuf::from("/tmp/devices.json"));
        assert_eq!(paths.settings, PathBuf::from("/var/lib/omnihub/settings.json"));
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file(Path::new("nonexistent.toml")).unwrap();
        assert_eq!(config.bluetooth.pair_timeout_secs, 15);
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("omnihub.toml");
        std::fs::write(&path, "invalid {{{").unwrap();

        assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn should_derive_state_files_from_state_dir() {
        let config = Config::default();
        let paths = config.storage_paths();
        assert_eq!(paths.devices, PathBuf::from("state/devices.json"));
        assert_eq!(paths.update_history, PathBuf::from("state/update-history.json"));
        assert_eq!(paths.accessories, PathBuf::from("state/homekit.json"));
        assert_eq!(paths.ip_lights, PathBuf::from("state/ip-lights.json"));
    }

    #[test]
    fn should_apply_environment_overrides() {
        let mut config = Config::default();
        config.apply_overrides(env(&[
            ("OMNIHUB_DEVICE_STORE", "/data/devices.json"),
            ("OMNIHUB_HOMEKIT_STORE", "/data/hk.json"),
            ("OMNIHUB_IP_LIGHTS_STORE", "/data/lights.json"),
            ("OMNIHUB_DISPLAY_BT_ADDR", "dev_AA_BB_CC_DD_EE_FF"),
            ("OMNIHUB_SCAN_TIMEOUT", "20"),
            ("OMNIHUB_BLUEZ_AGENT_CAP", "DisplayYesNo"),
        ]));

        let paths = config.storage_paths();
        assert_eq!(paths.devices, PathBuf::from("/data/devices.json"));
        assert_eq!(paths.accessories, PathBuf::from("/data/hk.json"));
        assert_eq!(paths.ip_lights, PathBuf::from("/data/lights.json"));
        assert_eq!(config.bluetooth.scan_timeout_secs, 20);
        assert_eq!(config.bluetooth.agent_capability, "DisplayYesNo");
        let seed = config.display_seed().unwrap().unwrap();
        assert_eq!(seed.address.as_str(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn should_ignore_unparseable_scan_timeout_override() {
        let mut config = Config::default();
        config.apply_overrides(env(&[("OMNIHUB_SCAN_TIMEOUT", "soon")]));
        assert_eq!(config.bluetooth.scan_timeout_secs, 12);
    }

    #[test]
    fn should_prefer_rust_log_over_omnihub_log() {
        let mut config = Config::default();
        config.apply_overrides(env(&[("OMNIHUB_LOG", "debug"), ("RUST_LOG", "trace")]));
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn should_reject_zero_timeout() {
        let mut config = Config::default();
        config.bluetooth.pair_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: pair_timeout_secs must be non-zero"
        );
    }

    #[test]
    fn should_reject_malformed_seed_address() {
        let mut config = Config::default();
        config.seed.display_address = Some("AA:BB".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_skip_seed_when_address_blank() {
        let mut config = Config::default();
        config.seed.display_address = Some("  ".to_string());
        assert!(config.display_seed().unwrap().is_none());
    }

    #[test]
    fn should_map_bluetooth_section_to_hub_options() {
        let config = Config::default();
        let options = config.hub_options();
        assert_eq!(options.devices.scan_timeout, Duration::from_secs(12));
        assert_eq!(options.pairing.pair_timeout, Duration::from_secs(15));
        assert_eq!(options.pairing.agent_capability, "NoInputNoOutput");
    }
}
