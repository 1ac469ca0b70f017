//! BLE adapter configuration.

use std::time::Duration;

use serde::Deserialize;

/// Timing knobs for the BLE adapter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    /// Time allowed to find and connect to a peripheral before a write, in
    /// seconds.
    pub write_connect_timeout_secs: u16,
    /// How long to scan for a peripheral the host adapter has not seen yet,
    /// in seconds.
    pub lookup_scan_secs: u16,
}

impl BleConfig {
    #[must_use]
    pub fn write_connect_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.write_connect_timeout_secs))
    }

    #[must_use]
    pub fn lookup_scan(&self) -> Duration {
        Duration::from_secs(u64::from(self.lookup_scan_secs))
    }
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            write_connect_timeout_secs: 10,
            lookup_scan_secs: 5,
        }
    }
}
