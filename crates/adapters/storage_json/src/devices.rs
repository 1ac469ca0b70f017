//! JSON implementation of [`DeviceStore`].

use std::future::Future;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use omnihub_app::ports::DeviceStore;
use omnihub_domain::address::BtAddress;
use omnihub_domain::device::{Device, DeviceView, Protocol};
use omnihub_domain::error::OmniHubError;
use omnihub_domain::time::{Timestamp, now};

use crate::file::{read_json, write_json};

/// Version written to, and required in, the devices envelope.
pub const STATE_VERSION: u32 = 1;
/// Id of the preconfigured display created from [`DisplaySeed`].
pub const SEED_DEVICE_ID: &str = "display-living-tv";

const SEED_NAME: &str = "Living Room Display";
const SEED_ROOM: &str = "Living room";
const SEED_INTEGRATION: &str = "scene";

/// Externally supplied display used as the seed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySeed {
    pub address: BtAddress,
    /// Legacy power characteristic, when known.
    pub power_attribute: Option<String>,
}

#[derive(Serialize)]
struct Envelope<'a> {
    version: u32,
    devices: &'a [DeviceView],
    saved_at: Timestamp,
}

#[derive(Deserialize)]
struct StoredEnvelope {
    version: u32,
    devices: Vec<DeviceView>,
}

/// File-backed device registry store.
#[derive(Debug, Clone)]
pub struct JsonDeviceStore {
    path: PathBuf,
    seed: Option<DisplaySeed>,
}

impl JsonDeviceStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seed: None,
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: Option<DisplaySeed>) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn seeds(&self) -> Result<Vec<Device>, OmniHubError> {
        let Some(seed) = &self.seed else {
            return Ok(Vec::new());
        };
        let mut device = Device::builder()
            .id(SEED_DEVICE_ID)
            .name(SEED_NAME)
            .room(SEED_ROOM)
            .protocol(Protocol::Bluetooth)
            .integration(SEED_INTEGRATION)
            .address(seed.address.as_str())
            .build()?;
        if let Some(attribute) = &seed.power_attribute {
            device
                .metadata
                .set_power_attribute(Some(attribute.to_ascii_lowercase()));
        }
        Ok(vec![device])
    }

    async fn write(&self, devices: Vec<Device>) -> Result<(), OmniHubError> {
        let views: Vec<DeviceView> = devices.into_iter().map(DeviceView::from).collect();
        let envelope = Envelope {
            version: STATE_VERSION,
            devices: &views,
            saved_at: now(),
        };
        write_json(&self.path, &envelope).await?;
        tracing::debug!(path = %self.path.display(), count = views.len(), "device store written");
        Ok(())
    }
}

impl DeviceStore for JsonDeviceStore {
    fn load(&self) -> impl Future<Output = Result<Vec<Device>, OmniHubError>> + Send {
        async move {
            match read_json::<StoredEnvelope>(&self.path).await {
                Ok(Some(stored)) if stored.version == STATE_VERSION => {
                    Ok(stored.devices.into_iter().map(Device::from).collect())
                }
                Ok(Some(stored)) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        version = stored.version,
                        "unsupported device store version, using seed devices"
                    );
                    self.seeds()
                }
                Ok(None) => {
                    let seeds = self.seeds()?;
                    if !seeds.is_empty() {
                        if let Err(err) = self.write(seeds.clone()).await {
                            tracing::warn!(error = %err, "failed to write seed devices");
                        }
                    }
                    Ok(seeds)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "unreadable device store, using seed devices");
                    self.seeds()
                }
            }
        }
    }

    fn persist(&self, devices: Vec<Device>) -> impl Future<Output = Result<(), OmniHubError>> + Send {
        self.write(devices)
    }
}
