//! Locations of the state files.

use std::path::{Path, PathBuf};

/// One file per independently loaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    pub devices: PathBuf,
    pub settings: PathBuf,
    pub update_history: PathBuf,
    pub accessories: PathBuf,
    pub ip_lights: PathBuf,
}

impl StoragePaths {
    /// The default file names inside `state_dir`.
    #[must_use]
    pub fn in_dir(state_dir: impl AsRef<Path>) -> Self {
        let state_dir = state_dir.as_ref();
        Self {
            devices: state_dir.join("devices.json"),
            settings: state_dir.join("settings.json"),
            update_history: state_dir.join("update-history.json"),
            accessories: state_dir.join("homekit.json"),
            ip_lights: state_dir.join("ip-lights.json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_derive_file_names_from_state_dir() {
        let paths = StoragePaths::in_dir("/var/lib/omnihub");
        assert_eq!(paths.devices, Path::new("/var/lib/omnihub/devices.json"));
        assert_eq!(paths.settings, Path::new("/var/lib/omnihub/settings.json"));
        assert_eq!(
            paths.update_history,
            Path::new("/var/lib/omnihub/update-history.json")
        );
        assert_eq!(paths.accessories, Path::new("/var/lib/omnihub/homekit.json"));
        assert_eq!(paths.ip_lights, Path::new("/var/lib/omnihub/ip-lights.json"));
    }
}
