//! Capability summaries derived from classic Bluetooth service discovery.
//!
//! [`parse_sdp_browse`] turns the text dump of `sdptool browse <addr>` into a
//! [`ClassicSummary`]: profile flags, a channel lookup table and the raw
//! per-service records. Parsing is line-oriented and section-scoped, and
//! missing sections simply yield empty collections.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Suffix shared by every 16-bit UUID expanded onto the Bluetooth base UUID.
const BASE_UUID_SUFFIX: &str = "-0000-1000-8000-00805f9b34fb";

/// Classic profiles recognised in service class id lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    AvrcpController,
    AvrcpTarget,
    AudioSink,
    AudioSource,
    HandsfreeGateway,
    HeadsetGateway,
    Hid,
}

impl Profile {
    fn from_class_uuid(uuid: &str) -> Option<Self> {
        match uuid {
            "0x110e" | "0x110f" => Some(Self::AvrcpController),
            "0x110c" => Some(Self::AvrcpTarget),
            "0x110b" => Some(Self::AudioSink),
            "0x110a" => Some(Self::AudioSource),
            "0x111f" => Some(Self::HandsfreeGateway),
            "0x1112" => Some(Self::HeadsetGateway),
            "0x1124" => Some(Self::Hid),
            _ => None,
        }
    }
}

/// A `"Label" (0xNNNN)` entry from a class id or protocol descriptor list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassId {
    pub label: String,
    pub uuid: String,
}

/// One `Service RecHandle` block of the browse output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default)]
    pub class_ids: Vec<ClassId>,
    /// 128-bit vendor UUIDs, lowercase.
    #[serde(default)]
    pub uuids: Vec<String>,
    #[serde(default)]
    pub protocols: Vec<ClassId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<u8>,
    #[serde(default)]
    pub psm: Vec<u16>,
}

/// Structured result of classic service discovery for one device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassicSummary {
    #[serde(default)]
    pub profiles: BTreeSet<Profile>,
    /// Lowercase UUID or service name → RFCOMM channel.
    #[serde(default)]
    pub channels: BTreeMap<String, u8>,
    /// Well-known L2CAP PSMs by protocol name.
    #[serde(default)]
    pub l2cap_psm: BTreeMap<String, u16>,
    #[serde(default)]
    pub services: Vec<ServiceRecord>,
}

impl ClassicSummary {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Resolve a service UUID or name to an RFCOMM channel.
    ///
    /// The lookup table is consulted first (exact, case-insensitive, with
    /// base-UUID expansions folded to their short form). Otherwise services
    /// are scanned in order: substring match on name or provider, exact match
    /// on class id label or UUID, exact match on any listed UUID. The first
    /// service with a channel wins. `None` means unresolved.
    #[must_use]
    pub fn resolve_channel(&self, identifier: &str) -> Option<u8> {
        let needle = identifier.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return None;
        }

        let short = short_uuid(&needle);
        if let Some(channel) = self
            .channels
            .get(&needle)
            .or_else(|| short.as_ref().and_then(|s| self.channels.get(s)))
        {
            return Some(*channel);
        }

        self.services.iter().find_map(|service| {
            let channel = service.channel?;
            let text_match = |value: &Option<String>| {
                value
                    .as_deref()
                    .is_some_and(|text| text.to_ascii_lowercase().contains(&needle))
            };
            let class_match = service.class_ids.iter().any(|class| {
                let uuid = class.uuid.to_ascii_lowercase();
                class.label.eq_ignore_ascii_case(&needle)
                    || uuid == needle
                    || short.as_deref() == Some(uuid.as_str())
            });
            let uuid_match = service.uuids.iter().any(|uuid| uuid == &needle);
            (text_match(&service.name) || text_match(&service.provider) || class_match || uuid_match)
                .then_some(channel)
        })
    }
}

/// Higher-level media flags derived from classic profiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaCapabilities {
    pub play_pause: bool,
    pub volume: bool,
    pub audio_sink: bool,
    pub audio_source: bool,
    pub hands_free: bool,
    pub hid: bool,
}

impl MediaCapabilities {
    #[must_use]
    pub fn from_profiles(profiles: &BTreeSet<Profile>) -> Self {
        let remote_control = profiles.contains(&Profile::AvrcpTarget)
            || profiles.contains(&Profile::AvrcpController);
        Self {
            play_pause: remote_control,
            volume: remote_control || profiles.contains(&Profile::AudioSink),
            audio_sink: profiles.contains(&Profile::AudioSink),
            audio_source: profiles.contains(&Profile::AudioSource),
            hands_free: profiles.contains(&Profile::HandsfreeGateway)
                || profiles.contains(&Profile::HeadsetGateway),
            hid: profiles.contains(&Profile::Hid),
        }
    }

    /// Whether the device advertised the remote-control profile `action` needs.
    #[must_use]
    pub fn allows(&self, action: MediaAction) -> bool {
        match action {
            MediaAction::Play | MediaAction::Pause | MediaAction::Next | MediaAction::Previous => {
                self.play_pause
            }
        }
    }
}

/// A transport control sent over AVRCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaAction {
    Play,
    Pause,
    Next,
    Previous,
}

impl MediaAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Next => "next",
            Self::Previous => "previous",
        }
    }
}

impl fmt::Display for MediaAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaAction {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "play" => Ok(Self::Play),
            "pause" => Ok(Self::Pause),
            "next" => Ok(Self::Next),
            "previous" | "prev" => Ok(Self::Previous),
            _ => Err(ValidationError::InvalidField {
                field: "media_action",
                value: raw.to_string(),
            }),
        }
    }
}

/// Derived discovery results cached on a device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classic: Option<ClassicSummary>,
    #[serde(default)]
    pub media: MediaCapabilities,
}

impl Capabilities {
    /// Replace the classic summary and recompute media flags.
    pub fn set_classic(&mut self, summary: ClassicSummary) {
        self.media = MediaCapabilities::from_profiles(&summary.profiles);
        self.classic = Some(summary);
    }

    /// Resolve a channel through the cached classic summary, if any.
    #[must_use]
    pub fn resolve_channel(&self, identifier: &str) -> Option<u8> {
        self.classic.as_ref()?.resolve_channel(identifier)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Header {
    Handle,
    Name,
    Provider,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Class,
    Protocol,
}

/// Parse `sdptool browse` output.
///
/// Blank or unrecognised input produces an empty summary.
#[must_use]
pub fn parse_sdp_browse(text: &str) -> ClassicSummary {
    let services = parse_services(text);

    let mut summary = ClassicSummary::default();
    for service in &services {
        for class in &service.class_ids {
            if let Some(profile) = Profile::from_class_uuid(&class.uuid.to_ascii_lowercase()) {
                summary.profiles.insert(profile);
            }
        }

        if let Some(channel) = service.channel {
            for uuid in &service.uuids {
                summary.channels.entry(uuid.clone()).or_insert(channel);
            }
            if let Some(primary) = service.class_ids.first() {
                let uuid = primary.uuid.to_ascii_lowercase();
                if !uuid.is_empty() {
                    summary.channels.entry(uuid).or_insert(channel);
                }
            }
            if let Some(name) = &service.name {
                summary
                    .channels
                    .entry(name.to_ascii_lowercase())
                    .or_insert(channel);
            }
        }

        for psm in &service.psm {
            let label = match psm {
                23 => "avctp",
                25 => "avdtp",
                17 => "hidcontrol",
                19 => "hidinterrupt",
                _ => continue,
            };
            summary.l2cap_psm.entry(label.to_string()).or_insert(*psm);
        }
    }
    summary.services = services;
    summary
}

/// Header lines (`Service Name`, `Service Provider`) precede the
/// `Service RecHandle` line of their own record, so a record boundary is the
/// first header line seen after the previous record got its handle.
fn parse_services(text: &str) -> Vec<ServiceRecord> {
    let mut services = Vec::new();
    let mut current: Option<ServiceRecord> = None;
    let mut section: Option<Section> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let header = if line.starts_with("Service RecHandle") {
            Some(Header::Handle)
        } else if line.starts_with("Service Name:") {
            Some(Header::Name)
        } else if line.starts_with("Service Provider:") {
            Some(Header::Provider)
        } else {
            None
        };

        if let Some(header) = header {
            let starts_new = current.as_ref().is_none_or(|service| {
                service.handle.is_some()
                    || (header == Header::Name && service.name.is_some())
                    || (header == Header::Provider && service.provider.is_some())
            });
            if starts_new {
                services.extend(current.take());
                section = None;
            }
            let service = current.get_or_insert_with(ServiceRecord::default);
            let value = after_colon(line);
            match header {
                Header::Handle => service.handle = value,
                Header::Name => service.name = value,
                Header::Provider => service.provider = value,
            }
            continue;
        }

        // Lines before the first record header are not attributed to any service.
        let Some(service) = current.as_mut() else {
            continue;
        };

        if line.starts_with("Service Class ID List") {
            section = Some(Section::Class);
        } else if line.starts_with("Protocol Descriptor List") {
            section = Some(Section::Protocol);
        } else if line.starts_with("Profile Descriptor List") {
            section = None;
        } else if section == Some(Section::Class) {
            if let Some(class) = parse_labelled_uuid(line) {
                service.class_ids.push(class);
            } else if let Some(uuid) = parse_uuid128(line) {
                service.uuids.push(uuid);
            }
        } else if section == Some(Section::Protocol) {
            if let Some((_, value)) = line.split_once("Channel:") {
                if let Ok(channel) = value.trim().parse() {
                    service.channel = Some(channel);
                }
            } else if let Some((_, value)) = line.split_once("PSM:") {
                if let Ok(psm) = value.trim().parse() {
                    service.psm.push(psm);
                }
            } else if let Some(protocol) = parse_labelled_uuid(line) {
                service.protocols.push(protocol);
            }
        }
    }
    services.extend(current);
    services
}

fn after_colon(line: &str) -> Option<String> {
    let (_, value) = line.split_once(':')?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// `"Audio Sink" (0x110b)` → label `Audio Sink`, uuid `0x110b`.
fn parse_labelled_uuid(line: &str) -> Option<ClassId> {
    let open = line.rfind("(0x")?;
    let close = open + line[open..].find(')')?;
    let uuid = &line[open + 1..close];
    if uuid.len() <= 2 || !uuid[2..].chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let label = line[..open].trim().trim_matches('"').trim();
    if label.is_empty() {
        return None;
    }
    Some(ClassId {
        label: label.to_string(),
        uuid: uuid.to_ascii_lowercase(),
    })
}

fn parse_uuid128(line: &str) -> Option<String> {
    let (_, rest) = line.split_once("UUID 128:")?;
    let uuid: String = rest
        .trim()
        .chars()
        .take_while(|ch| ch.is_ascii_hexdigit() || *ch == '-')
        .collect();
    (!uuid.is_empty()).then(|| uuid.to_ascii_lowercase())
}

/// Fold `0000xxxx-0000-1000-8000-00805f9b34fb` to `0xxxxx`.
fn short_uuid(uuid: &str) -> Option<String> {
    let head = uuid.strip_suffix(BASE_UUID_SUFFIX)?;
    let short = head.strip_prefix("0000")?;
    (short.len() == 4).then(|| format!("0x{short}"))
}
