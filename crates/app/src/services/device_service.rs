//! Device service — registry-level use-cases (listing, scanning, reachability,
//! power toggling, media control, metadata edits, statistics).

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use omnihub_domain::address::BtAddress;
use omnihub_domain::capability::MediaAction;
use omnihub_domain::command::{CommandAction, CommandSpec, Transport};
use omnihub_domain::device::{Device, DeviceView, Protocol, UNASSIGNED_ROOM};
use omnihub_domain::error::{OmniHubError, TransportError, UnsupportedError, ValidationError};
use omnihub_domain::id::DeviceId;
use omnihub_domain::time::now;
use serde::Serialize;
use serde_json::Value;

use crate::ports::{
    AccessoryBridge, AccessoryInfo, DeviceStore, HostBluetooth, IpLightInfo, IpLights,
    ScannedDevice, WirelessStack,
};
use crate::services::host_tool::parse_device_listing;
use crate::services::registry::DeviceRegistry;

/// Device type of accessories imported from the bridge.
pub const ACCESSORY_KIND: &str = "Accessory";
/// Integration tag of accessories imported from the bridge.
pub const ACCESSORY_INTEGRATION: &str = "homekit";
/// Id prefix of lights imported from the IP light catalog.
pub const IP_LIGHT_PREFIX: &str = "light-";
/// Integration tag of lights imported from the IP light catalog.
pub const IP_LIGHT_INTEGRATION: &str = "ip-light";
const IP_LIGHT_KIND: &str = "Light";

/// Timeouts used by scan and reachability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSettings {
    pub scan_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            scan_timeout: Duration::from_secs(12),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Registry totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeviceStats {
    pub total: usize,
    pub online: usize,
    /// Devices reachable through the accessory bridge.
    pub homekit: usize,
    /// Devices controlled over infrared.
    pub legacy: usize,
}

pub struct DeviceService<S, W, H, B, L> {
    registry: Arc<DeviceRegistry<S>>,
    wireless: Arc<W>,
    host: Arc<H>,
    bridge: B,
    lights: L,
    settings: DeviceSettings,
}

impl<S, W, H, B, L> DeviceService<S, W, H, B, L>
where
    S: DeviceStore,
    W: WirelessStack,
    H: HostBluetooth,
    B: AccessoryBridge,
    L: IpLights,
{
    pub fn new(
        registry: Arc<DeviceRegistry<S>>,
        wireless: Arc<W>,
        host: Arc<H>,
        bridge: B,
        lights: L,
        settings: DeviceSettings,
    ) -> Self {
        Self {
            registry,
            wireless,
            host,
            bridge,
            lights,
            settings,
        }
    }

    /// All devices with derived pairing flags, after an accessory and light
    /// refresh.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the refreshed registry cannot be persisted.
    pub async fn list_devices(&self) -> Result<Vec<DeviceView>, OmniHubError> {
        self.refresh_accessories().await?;
        self.refresh_lights().await?;
        Ok(self
            .registry
            .list()
            .await
            .into_iter()
            .map(DeviceView::from)
            .collect())
    }

    /// Look up a device by id.
    ///
    /// # Errors
    ///
    /// Returns [`OmniHubError::NotFound`] when no device with `id` exists.
    pub async fn get_device(&self, id: &str) -> Result<Device, OmniHubError> {
        self.registry.get(id).await
    }

    /// Discover nearby devices and merge them into the registry.
    ///
    /// Returns only the devices that were not known before.
    ///
    /// # Errors
    ///
    /// Returns the wireless scan error or a storage error. Classic listing
    /// and accessory failures only shrink the result.
    #[tracing::instrument(skip(self))]
    pub async fn scan(&self) -> Result<Vec<Device>, OmniHubError> {
        let mut found = self.wireless.scan(self.settings.scan_timeout).await?;
        merge_classic(&mut found, self.classic_listing().await);
        let accessories = self.accessories().await;
        tracing::debug!(
            found = found.len(),
            accessories = accessories.len(),
            "scan finished"
        );

        self.registry
            .mutate(|devices| {
                let mut discovered = merge_scanned(devices, found)?;
                discovered.extend(merge_accessories(devices, accessories)?);
                Ok(discovered)
            })
            .await
    }

    /// Check reachability and record the result.
    ///
    /// # Errors
    ///
    /// Returns [`OmniHubError::NotFound`] for unknown ids and
    /// [`OmniHubError::Unsupported`] when the device has no pingable
    /// protocol.
    #[tracing::instrument(skip(self))]
    pub async fn ping(&self, id: &str) -> Result<bool, OmniHubError> {
        let device = self.registry.get(id).await?;
        let reachable = if let (true, Some(address)) = (
            device.has_protocol(&Protocol::Bluetooth),
            device.address.as_deref(),
        ) {
            self.wireless
                .connect(address, self.settings.connect_timeout)
                .await
                .unwrap_or_else(|err| {
                    tracing::debug!(error = %err, "ping failed");
                    false
                })
        } else if device.has_protocol(&Protocol::Accessory) {
            let bridge = device
                .metadata
                .bridge
                .as_ref()
                .ok_or(UnsupportedError::MissingBridgeMetadata)?;
            self.bridge.ping(bridge).await?
        } else if device.has_protocol(&Protocol::IpLight) {
            self.lights.ping(device.require_address()?).await?
        } else {
            return Err(UnsupportedError::NoProtocolFor { operation: "ping" }.into());
        };

        let tracks_power =
            device.has_protocol(&Protocol::Accessory) || device.has_protocol(&Protocol::IpLight);
        self.registry
            .update(id, |device| {
                if tracks_power {
                    device.metadata.is_on = Some(reachable);
                }
                device.last_seen = Some(now());
                device.set_online(reachable);
                Ok(reachable)
            })
            .await
    }

    /// Open and drop a wireless connection to the device.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingAddress`] for devices without an
    /// address, and wireless transport errors.
    #[tracing::instrument(skip(self))]
    pub async fn connect(&self, id: &str) -> Result<bool, OmniHubError> {
        let device = self.registry.get(id).await?;
        let address = device.require_address()?;
        let connected = self
            .wireless
            .connect(address, self.settings.connect_timeout)
            .await?;
        self.registry
            .update(id, |device| {
                device.last_seen = Some(now());
                device.set_online(connected);
                Ok(connected)
            })
            .await
    }

    /// Flip the device's power state.
    ///
    /// Wireless devices use their `power_on`/`power_off`/`power_toggle`
    /// commands, or the legacy power attribute when none exist. Accessories go
    /// through the bridge.
    ///
    /// # Errors
    ///
    /// Returns [`OmniHubError::Unsupported`] when no power mapping exists for
    /// the device, and transport errors from the write.
    #[tracing::instrument(skip(self))]
    pub async fn toggle(&self, id: &str) -> Result<Device, OmniHubError> {
        let device = self.registry.get(id).await?;

        let is_on = if device.has_protocol(&Protocol::Bluetooth) {
            self.toggle_wireless(&device).await?
        } else if device.has_protocol(&Protocol::Accessory) {
            let bridge = device
                .metadata
                .bridge
                .as_ref()
                .ok_or(UnsupportedError::MissingBridgeMetadata)?;
            self.bridge.toggle(bridge, None).await?
        } else if device.has_protocol(&Protocol::IpLight) {
            let target = !device.metadata.is_on.unwrap_or(false);
            self.lights
                .set_power(device.require_address()?, target)
                .await?
        } else {
            return Err(UnsupportedError::NoProtocolFor {
                operation: "toggle",
            }
            .into());
        };

        self.registry
            .update(id, |device| {
                let at = now();
                device.metadata.is_on = Some(is_on);
                device.metadata.last_toggle = Some(at);
                device.last_seen = Some(at);
                device.set_online(is_on);
                Ok(device.clone())
            })
            .await
    }

    async fn toggle_wireless(&self, device: &Device) -> Result<bool, OmniHubError> {
        let address = device.require_address()?;
        let target = !device.is_online();
        let commands = device.metadata.commands(Transport::ShortRangeWireless);
        let find = |id: &str| {
            commands
                .iter()
                .find(|spec| spec.id.eq_ignore_ascii_case(id))
        };

        if let Some(spec) = find("power_on").filter(|_| target) {
            self.write(address, spec).await?;
            return Ok(true);
        }
        if let Some(spec) = find("power_off").filter(|_| !target) {
            self.write(address, spec).await?;
            return Ok(false);
        }
        if let Some(spec) = find("power_toggle") {
            self.write(address, spec).await?;
            return Ok(!device.metadata.is_on.unwrap_or(device.is_online()));
        }
        if let Some(attribute) = device.metadata.power_attribute() {
            self.wireless
                .write_attribute(address, attribute, &[u8::from(target)], true)
                .await?;
            return Ok(target);
        }
        Err(UnsupportedError::MissingPowerCommand.into())
    }

    async fn write(&self, address: &str, spec: &CommandSpec) -> Result<(), OmniHubError> {
        let CommandAction::Attribute {
            characteristic,
            with_response,
        } = &spec.action
        else {
            return Err(UnsupportedError::MissingPowerCommand.into());
        };
        self.wireless
            .write_attribute(address, characteristic, &spec.payload.bytes(), *with_response)
            .await
    }

    /// Send a play/pause/next/previous control to a classic media device.
    ///
    /// Only devices whose discovered profiles include AVRCP accept media
    /// controls.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedError::MediaUnsupported`] when the device lacks
    /// the profile, [`ValidationError::MissingAddress`] for devices without an
    /// address, and [`TransportError::Failed`] when the host rejects the
    /// control.
    #[tracing::instrument(skip(self))]
    pub async fn media(&self, id: &str, action: MediaAction) -> Result<Device, OmniHubError> {
        let device = self.registry.get(id).await?;
        if !device.capabilities.media.allows(action) {
            return Err(UnsupportedError::MediaUnsupported {
                device: device.id.to_string(),
                action: action.as_str(),
            }
            .into());
        }
        let address = device.require_address()?;

        let output = self.host.media_control(address, action).await?;
        let combined = output.combined_lowercase();
        if !output.success || combined.contains("failed") || combined.contains("no default player")
        {
            return Err(TransportError::Failed {
                operation: "media control",
                detail: output.detail(),
            }
            .into());
        }
        tracing::info!(%action, "media control sent");

        self.registry
            .update(id, |device| {
                device.last_seen = Some(now());
                device.set_online(true);
                Ok(device.clone())
            })
            .await
    }

    /// Merge a JSON object patch into the device metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidMetadata`] for non-objects and the
    /// field errors of [`DeviceMetadata::apply_patch`](omnihub_domain::binding::DeviceMetadata::apply_patch).
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_metadata(&self, id: &str, patch: &Value) -> Result<Device, OmniHubError> {
        let patch = patch.as_object().ok_or(ValidationError::InvalidMetadata)?;
        self.registry
            .update(id, |device| {
                device.metadata.apply_patch(patch)?;
                Ok(device.clone())
            })
            .await
    }

    /// Registry totals, after an accessory refresh.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the refreshed registry cannot be persisted.
    pub async fn stats(&self) -> Result<DeviceStats, OmniHubError> {
        self.refresh_accessories().await?;
        let devices = self.registry.list().await;
        Ok(DeviceStats {
            total: devices.len(),
            online: devices.iter().filter(|d| d.is_online()).count(),
            homekit: devices
                .iter()
                .filter(|d| d.has_protocol(&Protocol::Accessory))
                .count(),
            legacy: devices.iter().filter(|d| d.has_protocol(&Protocol::Ir)).count(),
        })
    }

    /// Pull the bridge's accessories into the registry.
    ///
    /// Returns the newly added devices. A failing bridge yields an empty
    /// list and leaves the registry untouched.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the merged registry cannot be persisted.
    pub async fn refresh_accessories(&self) -> Result<Vec<Device>, OmniHubError> {
        let accessories = self.accessories().await;
        if accessories.is_empty() {
            return Ok(Vec::new());
        }
        self.registry
            .mutate(|devices| merge_accessories(devices, accessories))
            .await
    }

    /// Pull the IP light catalog into the registry.
    ///
    /// Returns the newly added devices. A failing catalog yields an empty
    /// list and leaves the registry untouched.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the merged registry cannot be persisted.
    pub async fn refresh_lights(&self) -> Result<Vec<Device>, OmniHubError> {
        let lights = match self.lights.list_lights().await {
            Ok(lights) => lights,
            Err(err) => {
                tracing::warn!(error = %err, "ip light listing failed");
                return Ok(Vec::new());
            }
        };
        if lights.is_empty() {
            return Ok(Vec::new());
        }
        self.registry
            .mutate(|devices| merge_lights(devices, lights))
            .await
    }

    async fn accessories(&self) -> Vec<AccessoryInfo> {
        self.bridge.list_accessories().await.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "accessory listing failed");
            Vec::new()
        })
    }

    async fn classic_listing(&self) -> Vec<ScannedDevice> {
        let mut listed = Vec::new();
        for action in ["devices", "paired-devices"] {
            match self.host.run_tool(vec![action.to_string()]).await {
                Ok(output) if output.success => {
                    listed.extend(parse_device_listing(&output.stdout).into_iter().map(
                        |entry| ScannedDevice {
                            address: entry.address,
                            name: entry.name,
                            rssi: None,
                        },
                    ));
                }
                Ok(output) => tracing::debug!(action, detail = %output.detail(), "classic listing failed"),
                Err(err) => tracing::debug!(action, error = %err, "classic listing failed"),
            }
        }
        listed
    }
}

/// Fold classic listing entries into wireless scan results.
///
/// Wireless entries win; classic names fill blank wireless names.
fn merge_classic(found: &mut Vec<ScannedDevice>, classic: Vec<ScannedDevice>) {
    for entry in classic {
        match found
            .iter_mut()
            .find(|seen| same_address(&seen.address, &entry.address))
        {
            Some(seen) => {
                if seen.name.as_deref().is_none_or(str::is_empty) {
                    seen.name = entry.name;
                }
            }
            None => found.push(entry),
        }
    }
}

fn same_address(left: &str, right: &str) -> bool {
    match (BtAddress::parse(left), BtAddress::parse(right)) {
        (Ok(left), Ok(right)) => left == right,
        _ => left.eq_ignore_ascii_case(right),
    }
}

fn merge_scanned(
    devices: &mut BTreeMap<DeviceId, Device>,
    found: Vec<ScannedDevice>,
) -> Result<Vec<Device>, OmniHubError> {
    let at = now();
    let mut by_address: HashMap<String, DeviceId> = devices
        .values()
        .filter_map(|device| Some((device.address.clone()?, device.id.clone())))
        .collect();
    let mut discovered = Vec::new();

    for entry in found {
        let Ok(address) = BtAddress::parse(&entry.address) else {
            tracing::debug!(address = %entry.address, "skipping unparsable scan result");
            continue;
        };
        let id = DeviceId::new(address.slug());
        let known = by_address
            .get(address.as_str())
            .cloned()
            .or_else(|| devices.contains_key(&id).then(|| id.clone()));

        if let Some(device) = known.as_ref().and_then(|known| devices.get_mut(known)) {
            device.address = Some(address.to_string());
            device.metadata.rssi = entry.rssi;
            device.metadata.last_scan = Some(at);
            continue;
        }

        let name = entry
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| address.to_string());
        let mut device = Device::builder()
            .id(id.clone())
            .name(name)
            .protocol(Protocol::Bluetooth)
            .address(address.to_string())
            .last_seen(at)
            .build()?;
        device.metadata.rssi = entry.rssi;
        device.metadata.last_scan = Some(at);
        by_address.insert(address.to_string(), id.clone());
        devices.insert(id, device.clone());
        discovered.push(device);
    }
    Ok(discovered)
}

fn merge_lights(
    devices: &mut BTreeMap<DeviceId, Device>,
    lights: Vec<IpLightInfo>,
) -> Result<Vec<Device>, OmniHubError> {
    let mut discovered = Vec::new();
    for light in lights {
        let id = DeviceId::new(format!("{IP_LIGHT_PREFIX}{}", light.identifier));
        let name = Some(light.name)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| light.identifier.clone());
        let kind = light
            .kind
            .filter(|kind| !kind.trim().is_empty())
            .unwrap_or_else(|| IP_LIGHT_KIND.to_string());

        let is_new = !devices.contains_key(&id);
        let device = match devices.entry(id.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(
                Device::builder()
                    .id(id)
                    .name(name.clone())
                    .kind(kind)
                    .build()?,
            ),
        };
        device.name = name;
        device.address = Some(light.address).filter(|address| !address.trim().is_empty());
        device.add_protocol(Protocol::IpLight);
        device.add_integration(IP_LIGHT_INTEGRATION);
        if is_new {
            discovered.push(device.clone());
        }
    }
    Ok(discovered)
}

fn merge_accessories(
    devices: &mut BTreeMap<DeviceId, Device>,
    accessories: Vec<AccessoryInfo>,
) -> Result<Vec<Device>, OmniHubError> {
    let at = now();
    let mut discovered = Vec::new();
    for accessory in accessories {
        let id = DeviceId::new(accessory.identifier.clone());
        let name = Some(accessory.name)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| accessory.identifier.clone());
        let room = accessory
            .room
            .filter(|room| !room.trim().is_empty())
            .unwrap_or_else(|| UNASSIGNED_ROOM.to_string());

        let is_new = !devices.contains_key(&id);
        let device = match devices.entry(id.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(
                Device::builder()
                    .id(id)
                    .name(name.clone())
                    .kind(ACCESSORY_KIND)
                    .build()?,
            ),
        };
        device.name = name;
        device.room = room;
        device.add_protocol(Protocol::Accessory);
        device.add_integration(ACCESSORY_INTEGRATION);
        device.metadata.bridge = Some(accessory.bridge);
        device.metadata.is_on = accessory.is_on;
        device.set_online(accessory.is_on.unwrap_or(false));
        device.last_seen = Some(at);
        if is_new {
            discovered.push(device.clone());
        }
    }
    Ok(discovered)
}
