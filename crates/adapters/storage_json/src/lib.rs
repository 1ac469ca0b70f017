//! # omnihub-adapter-storage-json
//!
//! JSON file persistence for the hub state directory.
//!
//! ## Responsibilities
//! - Implement [`DeviceStore`](omnihub_app::ports::DeviceStore) over a
//!   versioned `devices.json` envelope, falling back to seeds when the file
//!   is missing or corrupt
//! - Load and save the hub settings document and the update history
//! - Read the accessory cache as an
//!   [`AccessoryBridge`](omnihub_app::ports::AccessoryBridge) source
//!
//! Every write goes to a sibling temporary file first and is committed with a
//! rename, so readers never observe a half-written document.
//!
//! ## Dependency rule
//! Depends on `omnihub-app` (for port traits) and `omnihub-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod accessories;
mod devices;
mod error;
mod file;
mod paths;
mod settings;
mod updates;

pub use accessories::{CachedAccessory, JsonAccessoryCache};
pub use devices::{DisplaySeed, JsonDeviceStore, SEED_DEVICE_ID, STATE_VERSION};
pub use error::StoreError;
pub use paths::StoragePaths;
pub use settings::{HubSettings, SettingsStore};
pub use updates::{UpdateEntry, UpdateHistoryStore};
