//! Transport bindings and typed device metadata.
//!
//! Each transport a device is reachable over gets one [`TransportBinding`]
//! carrying only that transport's state and command table. Everything else a
//! device remembers (pairing flags, power state, the last command audit
//! entry, bridge identifiers) lives in typed fields of [`DeviceMetadata`];
//! user-supplied keys nobody interprets go to `extra`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::command::{self, CommandSpec, Transport, normalize_command_list};
use crate::error::ValidationError;
use crate::session::SessionRecord;
use crate::time::Timestamp;

/// Per-transport state of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportBinding {
    /// GATT characteristics on a BLE peripheral.
    Attribute {
        /// Legacy power characteristic written with `0x01`/`0x00` on toggle.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        power_attribute: Option<String>,
        #[serde(default)]
        commands: Vec<CommandSpec>,
    },
    /// RFCOMM channels on a classic peripheral.
    Serial {
        #[serde(default)]
        commands: Vec<CommandSpec>,
    },
    /// Key commands for a token-authenticated remote session.
    ///
    /// The session credentials live in [`DeviceMetadata::session`].
    Session {
        #[serde(default)]
        commands: Vec<CommandSpec>,
    },
}

impl TransportBinding {
    fn empty(transport: Transport) -> Self {
        match transport {
            Transport::ShortRangeWireless => Self::Attribute {
                power_attribute: None,
                commands: Vec::new(),
            },
            Transport::SerialChannel => Self::Serial {
                commands: Vec::new(),
            },
            Transport::SessionRemote => Self::Session {
                commands: Vec::new(),
            },
        }
    }

    #[must_use]
    pub fn transport(&self) -> Transport {
        match self {
            Self::Attribute { .. } => Transport::ShortRangeWireless,
            Self::Serial { .. } => Transport::SerialChannel,
            Self::Session { .. } => Transport::SessionRemote,
        }
    }

    #[must_use]
    pub fn commands(&self) -> &[CommandSpec] {
        match self {
            Self::Attribute { commands, .. }
            | Self::Serial { commands }
            | Self::Session { commands } => commands,
        }
    }

    fn commands_mut(&mut self) -> &mut Vec<CommandSpec> {
        match self {
            Self::Attribute { commands, .. }
            | Self::Serial { commands }
            | Self::Session { commands } => commands,
        }
    }
}

/// Pairing and trust flags established by the pairing workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingState {
    pub paired: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paired_at: Option<Timestamp>,
    pub trusted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted_at: Option<Timestamp>,
    /// Agent capability used for host-level pairing, if it happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

/// Identifiers of a device exposed through the accessory bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeRef {
    pub pairing_id: String,
    pub aid: u64,
    pub iid: u64,
}

/// Audit entry for the most recent command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastCommand {
    pub id: String,
    pub at: Timestamp,
    pub transport: Transport,
    pub response_len: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_hex: Option<String>,
    /// Structured response of a session-remote exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<Value>,
}

/// Typed per-device state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceMetadata {
    #[serde(default)]
    pub bindings: Vec<TransportBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairing: Option<PairingState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_on: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scan: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_toggle: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_command: Option<LastCommand>,
    /// Logical action → command id aliases (e.g. `"vol_up" → "cmd_vol_plus"`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub commands_map: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge: Option<BridgeRef>,
    /// Credentials of the session-remote peer, one per device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionRecord>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl DeviceMetadata {
    #[must_use]
    pub fn binding(&self, transport: Transport) -> Option<&TransportBinding> {
        self.bindings
            .iter()
            .find(|binding| binding.transport() == transport)
    }

    /// The binding for `transport`, created empty when missing.
    pub fn binding_mut(&mut self, transport: Transport) -> &mut TransportBinding {
        let index = match self
            .bindings
            .iter()
            .position(|binding| binding.transport() == transport)
        {
            Some(index) => index,
            None => {
                self.bindings.push(TransportBinding::empty(transport));
                self.bindings.len() - 1
            }
        };
        &mut self.bindings[index]
    }

    /// Commands stored for one transport.
    #[must_use]
    pub fn commands(&self, transport: Transport) -> &[CommandSpec] {
        match self.binding(transport) {
            Some(binding) => binding.commands(),
            None => &[],
        }
    }

    /// Merge normalized commands into the binding of their own transport.
    ///
    /// Existing commands with the same id are replaced.
    pub fn merge_commands(&mut self, specs: impl IntoIterator<Item = CommandSpec>) {
        for spec in specs {
            if spec.transport() == Transport::SessionRemote {
                self.session_mut();
            }
            let binding = self.binding_mut(spec.transport());
            command::upsert(binding.commands_mut(), spec);
        }
    }

    /// Look a command up by id across all bindings.
    ///
    /// An entry in `commands_map` takes precedence when its target exists.
    #[must_use]
    pub fn find_command(&self, id: &str) -> Option<&CommandSpec> {
        let by_id = |wanted: &str| {
            self.bindings
                .iter()
                .flat_map(TransportBinding::commands)
                .find(|spec| spec.id == wanted)
        };
        self.commands_map
            .get(id)
            .map(|target| target.trim())
            .filter(|target| !target.is_empty())
            .and_then(by_id)
            .or_else(|| by_id(id))
    }

    #[must_use]
    pub fn session(&self) -> Option<&SessionRecord> {
        self.session.as_ref()
    }

    /// The session record, created with a fresh client id when missing.
    pub fn session_mut(&mut self) -> &mut SessionRecord {
        self.session.get_or_insert_with(SessionRecord::new)
    }

    #[must_use]
    pub fn power_attribute(&self) -> Option<&str> {
        match self.binding(Transport::ShortRangeWireless)? {
            TransportBinding::Attribute {
                power_attribute, ..
            } => power_attribute.as_deref(),
            _ => None,
        }
    }

    pub fn set_power_attribute(&mut self, value: Option<String>) {
        if let TransportBinding::Attribute {
            power_attribute, ..
        } = self.binding_mut(Transport::ShortRangeWireless)
        {
            *power_attribute = value;
        }
    }

    #[must_use]
    pub fn is_paired(&self) -> bool {
        self.pairing.as_ref().is_some_and(|state| state.paired)
    }

    #[must_use]
    pub fn is_trusted(&self) -> bool {
        self.pairing.as_ref().is_some_and(|state| state.trusted)
    }

    /// Apply a user-supplied metadata patch.
    ///
    /// Recognised keys update typed state: `commands_map` (object of
    /// strings), `power_attribute` (string or null), `session` (object with
    /// `name` and/or `client_id`) and `commands` (list of raw command
    /// descriptions, invalid entries dropped). Every other key is merged into
    /// `extra`. The patch is validated as a whole before anything changes.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidField`] when a recognised key has the
    /// wrong shape.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> Result<(), ValidationError> {
        let commands_map = patch
            .get("commands_map")
            .map(parse_commands_map)
            .transpose()?;
        let power_attribute = match patch.get("power_attribute") {
            None => None,
            Some(Value::Null) => Some(None),
            Some(Value::String(text)) => Some(
                Some(text.trim().to_ascii_lowercase()).filter(|value| !value.is_empty()),
            ),
            Some(other) => return Err(invalid("power_attribute", other)),
        };
        let session = patch.get("session").map(parse_session_patch).transpose()?;
        let commands = patch.get("commands").map(normalize_command_list);

        if let Some(map) = commands_map {
            self.commands_map = map;
        }
        if let Some(value) = power_attribute {
            self.set_power_attribute(value);
        }
        if let Some((name, client_id)) = session {
            let record = self.session_mut();
            if let Some(name) = name {
                record.name = name;
            }
            if let Some(client_id) = client_id {
                record.client_id = client_id;
            }
        }
        if let Some(commands) = commands {
            self.merge_commands(commands);
        }

        for (key, value) in patch {
            if !matches!(
                key.as_str(),
                "commands_map" | "power_attribute" | "session" | "commands"
            ) {
                self.extra.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }
}

fn invalid(field: &'static str, value: &Value) -> ValidationError {
    ValidationError::InvalidField {
        field,
        value: value.to_string(),
    }
}

fn parse_commands_map(value: &Value) -> Result<BTreeMap<String, String>, ValidationError> {
    let object = value
        .as_object()
        .ok_or_else(|| invalid("commands_map", value))?;
    object
        .iter()
        .filter_map(|(action, target)| match target {
            Value::String(id) if id.trim().is_empty() => None,
            Value::String(id) => Some(Ok((action.clone(), id.trim().to_string()))),
            Value::Null => None,
            other => Some(Err(invalid("commands_map", other))),
        })
        .collect()
}

fn parse_session_patch(
    value: &Value,
) -> Result<(Option<String>, Option<String>), ValidationError> {
    let object = value.as_object().ok_or_else(|| invalid("session", value))?;
    let field = |key: &str| -> Result<Option<String>, ValidationError> {
        match object.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) if !text.trim().is_empty() => {
                Ok(Some(text.trim().to_string()))
            }
            Some(other) => Err(invalid("session", other)),
        }
    };
    Ok((field("name")?, field("client_id")?))
}
