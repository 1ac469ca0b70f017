//! Device — the central entity of the hub.
//!
//! A device is a physical thing the hub can reach over one or more
//! [`Protocol`]s. Transport-specific state lives in
//! [`DeviceMetadata`](crate::binding::DeviceMetadata); derived discovery
//! results live in [`Capabilities`].

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::binding::DeviceMetadata;
use crate::capability::Capabilities;
use crate::command::Transport;
use crate::error::{OmniHubError, ValidationError};
use crate::id::DeviceId;
use crate::time::Timestamp;

/// Room assigned to devices nobody placed yet.
pub const UNASSIGNED_ROOM: &str = "Unassigned";
/// Type assigned to discovered devices.
pub const DEFAULT_KIND: &str = "Display";
const UNKNOWN_FIRMWARE: &str = "Unknown";

/// A reachability tag.
///
/// Known tags have dedicated variants; anything else round-trips through
/// [`Protocol::Other`]. Ordering follows the string form so persisted sets
/// come out sorted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Protocol {
    /// Bluetooth, both BLE and classic.
    Bluetooth,
    SessionRemote,
    /// Devices surfaced by the accessory bridge.
    Accessory,
    IpLight,
    /// Legacy infrared.
    Ir,
    Other(String),
}

impl Protocol {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Bluetooth => "bluetooth",
            Self::SessionRemote => "session-remote",
            Self::Accessory => "homekit",
            Self::IpLight => "ip-light",
            Self::Ir => "ir",
            Self::Other(tag) => tag.as_str(),
        }
    }
}

impl From<String> for Protocol {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "bluetooth" | "ble" | "short-range-wireless" => Self::Bluetooth,
            "session-remote" | "session" | "samsung" | "smartview" => Self::SessionRemote,
            "homekit" | "accessory" => Self::Accessory,
            "ip-light" | "tapo" => Self::IpLight,
            "ir" => Self::Ir,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<&str> for Protocol {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Protocol> for String {
    fn from(value: Protocol) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialOrd for Protocol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Protocol {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

/// Reachability of a device. Always one of these two values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Online,
    #[default]
    Offline,
}

impl DeviceStatus {
    #[must_use]
    pub fn from_online(online: bool) -> Self {
        if online { Self::Online } else { Self::Offline }
    }
}

fn unknown_firmware() -> String {
    UNKNOWN_FIRMWARE.to_string()
}

/// A controllable physical device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub room: String,
    #[serde(default)]
    pub protocols: BTreeSet<Protocol>,
    #[serde(default)]
    pub integrations: BTreeSet<String>,
    #[serde(default)]
    pub status: DeviceStatus,
    #[serde(default)]
    pub last_seen: Option<Timestamp>,
    #[serde(default = "unknown_firmware")]
    pub firmware: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub metadata: DeviceMetadata,
    #[serde(default)]
    pub capabilities: Capabilities,
}

impl Device {
    /// Create a builder for constructing a [`Device`].
    #[must_use]
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`OmniHubError::Validation`] when `name` is empty.
    pub fn validate(&self) -> Result<(), OmniHubError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }

    #[must_use]
    pub fn has_protocol(&self, protocol: &Protocol) -> bool {
        self.protocols.contains(protocol)
    }

    /// Add a protocol. Protocols are never removed.
    pub fn add_protocol(&mut self, protocol: Protocol) {
        self.protocols.insert(protocol);
    }

    pub fn add_integration(&mut self, integration: impl Into<String>) {
        self.integrations.insert(integration.into());
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.status == DeviceStatus::Online
    }

    pub fn set_online(&mut self, online: bool) {
        self.status = DeviceStatus::from_online(online);
    }

    /// The transport-level address.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingAddress`] when none is set.
    pub fn require_address(&self) -> Result<&str, ValidationError> {
        self.address
            .as_deref()
            .filter(|address| !address.is_empty())
            .ok_or(ValidationError::MissingAddress)
    }

    /// Whether commands over `transport` are accepted for this device.
    #[must_use]
    pub fn supports(&self, transport: Transport) -> bool {
        match transport {
            Transport::ShortRangeWireless | Transport::SerialChannel => {
                self.has_protocol(&Protocol::Bluetooth)
            }
            Transport::SessionRemote => {
                self.has_protocol(&Protocol::SessionRemote) || self.metadata.session().is_some()
            }
        }
    }

    /// Serializable view with the derived `paired`/`trusted` flags.
    #[must_use]
    pub fn view(&self) -> DeviceView {
        DeviceView::from(self.clone())
    }
}

/// A device plus flags derived from its pairing state.
///
/// This is the persisted and displayed shape. On load the flags are ignored
/// and recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceView {
    #[serde(flatten)]
    pub device: Device,
    #[serde(default)]
    pub paired: bool,
    #[serde(default)]
    pub trusted: bool,
}

impl From<Device> for DeviceView {
    fn from(device: Device) -> Self {
        Self {
            paired: device.metadata.is_paired(),
            trusted: device.metadata.is_trusted(),
            device,
        }
    }
}

impl From<DeviceView> for Device {
    fn from(view: DeviceView) -> Self {
        view.device
    }
}

/// Step-by-step builder for [`Device`].
#[derive(Debug, Default)]
pub struct DeviceBuilder {
    id: Option<DeviceId>,
    name: Option<String>,
    kind: Option<String>,
    room: Option<String>,
    protocols: BTreeSet<Protocol>,
    integrations: BTreeSet<String>,
    address: Option<String>,
    last_seen: Option<Timestamp>,
    metadata: DeviceMetadata,
}

impl DeviceBuilder {
    #[must_use]
    pub fn id(mut self, id: impl Into<DeviceId>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    #[must_use]
    pub fn room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    #[must_use]
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocols.insert(protocol);
        self
    }

    #[must_use]
    pub fn integration(mut self, integration: impl Into<String>) -> Self {
        self.integrations.insert(integration.into());
        self
    }

    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    #[must_use]
    pub fn last_seen(mut self, last_seen: Timestamp) -> Self {
        self.last_seen = Some(last_seen);
        self
    }

    #[must_use]
    pub fn metadata(mut self, metadata: DeviceMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Consume the builder, validate, and return a [`Device`].
    ///
    /// Missing type and room default to `Display` and `Unassigned`; a missing
    /// id is derived from the name.
    ///
    /// # Errors
    ///
    /// Returns [`OmniHubError::Validation`] if `name` is missing or empty.
    pub fn build(self) -> Result<Device, OmniHubError> {
        let name = self.name.unwrap_or_default();
        let device = Device {
            id: self
                .id
                .unwrap_or_else(|| DeviceId::new(name.to_ascii_lowercase().replace(' ', "-"))),
            name,
            kind: self.kind.unwrap_or_else(|| DEFAULT_KIND.to_string()),
            room: self.room.unwrap_or_else(|| UNASSIGNED_ROOM.to_string()),
            protocols: self.protocols,
            integrations: self.integrations,
            status: DeviceStatus::Offline,
            last_seen: self.last_seen,
            firmware: unknown_firmware(),
            address: self.address,
            metadata: self.metadata,
            capabilities: Capabilities::default(),
        };
        device.validate()?;
        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::binding::PairingState;

    fn display() -> Device {
        Device::builder()
            .id("display-living-tv")
            .name("LG OLED Gallery")
            .room("Living room")
            .protocol(Protocol::Bluetooth)
            .integration("scene")
            .address("AA:BB:CC:DD:EE:FF")
            .build()
            .unwrap()
    }

    #[test]
    fn should_build_device_with_defaults() {
        let device = Device::builder().id("x").name("Lamp").build().unwrap();
        assert_eq!(device.kind, DEFAULT_KIND);
        assert_eq!(device.room, UNASSIGNED_ROOM);
        assert_eq!(device.status, DeviceStatus::Offline);
        assert_eq!(device.firmware, "Unknown");
        assert!(device.address.is_none());
    }

    #[test]
    fn should_return_validation_error_when_name_is_empty() {
        let result = Device::builder().id("x").build();
        assert!(matches!(
            result,
            Err(OmniHubError::Validation(ValidationError::EmptyName))
        ));
    }

    #[test]
    fn should_only_grow_protocol_set() {
        let mut device = display();
        device.add_protocol(Protocol::from("ble"));
        device.add_protocol(Protocol::SessionRemote);
        assert_eq!(device.protocols.len(), 2);
        assert!(device.has_protocol(&Protocol::Bluetooth));
    }

    #[test]
    fn should_serialize_sorted_protocols_and_omit_missing_address() {
        let mut device = Device::builder()
            .id("tv")
            .name("TV")
            .protocol(Protocol::SessionRemote)
            .protocol(Protocol::Bluetooth)
            .protocol(Protocol::from("zigbee"))
            .build()
            .unwrap();
        device.add_integration("scene");

        let value = serde_json::to_value(device.view()).unwrap();
        assert_eq!(value["protocols"], json!(["bluetooth", "session-remote", "zigbee"]));
        assert_eq!(value["type"], "Display");
        assert!(value.get("address").is_none());
        assert_eq!(value["paired"], false);
    }

    #[test]
    fn should_derive_paired_and_trusted_flags_in_view() {
        let mut device = display();
        device.metadata.pairing = Some(PairingState {
            paired: true,
            trusted: true,
            ..PairingState::default()
        });

        let view = device.view();
        assert!(view.paired);
        assert!(view.trusted);
    }

    #[test]
    fn should_ignore_stale_flags_when_loading_view() {
        let mut value = serde_json::to_value(display().view()).unwrap();
        value["paired"] = json!(true);

        let device: Device = serde_json::from_value(value).unwrap();
        assert!(!device.view().paired);
    }

    #[test]
    fn should_require_address_for_transport_operations() {
        let device = Device::builder().id("x").name("Lamp").build().unwrap();
        assert_eq!(device.require_address(), Err(ValidationError::MissingAddress));
        assert_eq!(display().require_address(), Ok("AA:BB:CC:DD:EE:FF"));
    }

    #[test]
    fn should_accept_session_commands_when_session_metadata_present() {
        let mut device = display();
        assert!(!device.supports(Transport::SessionRemote));
        device.metadata.session_mut();
        assert!(device.supports(Transport::SessionRemote));
        assert!(device.supports(Transport::ShortRangeWireless));
    }
}
