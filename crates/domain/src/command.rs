//! Command specifications and their normalizer.
//!
//! A raw command description arrives as an untyped JSON object (from a pairing
//! payload, a metadata patch or an inline command request). [`CommandSpec::normalize`]
//! validates it and produces a transport-tagged record whose variant carries
//! only the fields that transport understands. A spec that fails validation is
//! never constructed, so a stored [`CommandSpec`] is always executable.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Highest RFCOMM channel number.
pub const MAX_SERIAL_CHANNEL: u8 = 30;

const MAX_RESPONSE_BYTES: f64 = 65_536.0;
const MAX_SECONDS: f64 = 60.0;
const MAX_REPEAT: f64 = 100.0;
const DEFAULT_RESPONSE_TIMEOUT: f64 = 1.0;
const DEFAULT_CONNECT_TIMEOUT: f64 = 5.0;

/// The transport a command travels over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Transport {
    /// Attribute writes over Bluetooth Low Energy (GATT).
    #[serde(rename = "ble")]
    ShortRangeWireless,
    /// Byte exchange over a classic Bluetooth RFCOMM channel.
    #[serde(rename = "rfcomm")]
    SerialChannel,
    /// Key presses over a token-authenticated TV remote session.
    #[serde(rename = "session")]
    SessionRemote,
}

impl Transport {
    /// Stable tag used in persisted state and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ShortRangeWireless => "ble",
            Self::SerialChannel => "rfcomm",
            Self::SessionRemote => "session",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ble" | "gatt" | "bluetooth" | "short-range-wireless" => Ok(Self::ShortRangeWireless),
            "rfcomm" | "classic" | "serial" | "serial-channel" => Ok(Self::SerialChannel),
            "session" | "session-remote" | "samsung" | "smartview" => Ok(Self::SessionRemote),
            other => Err(ValidationError::UnknownTransport(other.to_string())),
        }
    }
}

/// Bytes sent with a command.
///
/// Hex payloads are stored in canonical lowercase form after decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    #[default]
    Empty,
    Hex(String),
    Ascii(String),
}

impl Payload {
    /// Decode a user-supplied hex string.
    ///
    /// `0x` markers and the separators ` -:,` plus newlines and tabs are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OddHexPayload`] for an odd digit count and
    /// [`ValidationError::InvalidHexPayload`] for non-hex characters.
    pub fn from_hex(raw: &str) -> Result<Self, ValidationError> {
        let bytes = decode_hex(raw)?;
        if bytes.is_empty() {
            return Ok(Self::Empty);
        }
        Ok(Self::Hex(hex::encode(bytes)))
    }

    /// The raw bytes to put on the wire.
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        match self {
            Self::Empty => Vec::new(),
            // Stored hex is canonical, so decoding cannot fail.
            Self::Hex(value) => hex::decode(value).unwrap_or_default(),
            Self::Ascii(value) => value.as_bytes().to_vec(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

fn decode_hex(raw: &str) -> Result<Vec<u8>, ValidationError> {
    let cleaned: String = raw
        .replace("0x", "")
        .replace("0X", "")
        .chars()
        .filter(|ch| !matches!(ch, ' ' | '-' | ':' | ',' | '\n' | '\t'))
        .collect();
    if cleaned.len() % 2 != 0 {
        return Err(ValidationError::OddHexPayload);
    }
    hex::decode(&cleaned).map_err(|_| ValidationError::InvalidHexPayload)
}

/// Transport-specific part of a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "transport")]
pub enum CommandAction {
    /// Write to a GATT characteristic.
    #[serde(rename = "ble")]
    Attribute {
        characteristic: String,
        #[serde(default)]
        with_response: bool,
    },
    /// Exchange bytes over an RFCOMM channel.
    #[serde(rename = "rfcomm")]
    Serial {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        channel: Option<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        service_uuid: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        service_name: Option<String>,
        #[serde(default)]
        response_bytes: usize,
        /// Seconds.
        response_timeout: f64,
        /// Seconds.
        connect_timeout: f64,
        /// Settle time before sending, in seconds.
        #[serde(default)]
        wait: f64,
    },
    /// Press a key on a remote session.
    #[serde(rename = "session")]
    Remote {
        key: String,
        verb: String,
        option: String,
        repeat: u32,
        /// Seconds between repeats.
        #[serde(default)]
        repeat_delay: f64,
    },
}

impl CommandAction {
    #[must_use]
    pub fn transport(&self) -> Transport {
        match self {
            Self::Attribute { .. } => Transport::ShortRangeWireless,
            Self::Serial { .. } => Transport::SerialChannel,
            Self::Remote { .. } => Transport::SessionRemote,
        }
    }
}

/// A validated, executable command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Payload::is_empty")]
    pub payload: Payload,
    #[serde(flatten)]
    pub action: CommandAction,
}

impl CommandSpec {
    #[must_use]
    pub fn transport(&self) -> Transport {
        self.action.transport()
    }

    /// Validate and canonicalize a raw command description.
    ///
    /// The transport defaults to BLE. Only the fields of the selected
    /// transport are validated. Numeric fields accept JSON numbers or numeric
    /// strings and are range-checked, never clamped.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first missing or malformed
    /// field.
    pub fn normalize(raw: &Map<String, Value>) -> Result<Self, ValidationError> {
        let id = string_field(raw, "id").ok_or(ValidationError::MissingCommandId)?;

        let transport = match string_field(raw, "transport") {
            Some(value) => value.parse()?,
            None => Transport::ShortRangeWireless,
        };

        let action = match transport {
            Transport::ShortRangeWireless => normalize_attribute(raw)?,
            Transport::SerialChannel => normalize_serial(raw)?,
            Transport::SessionRemote => normalize_remote(raw)?,
        };

        let payload = normalize_payload(raw)?;
        let label = string_field(raw, "label").unwrap_or_else(|| default_label(&id));

        Ok(Self {
            id,
            label,
            payload,
            action,
        })
    }

    /// Normalize a value that should be a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NotAnObject`] for non-objects, otherwise as
    /// [`CommandSpec::normalize`].
    pub fn normalize_value(raw: &Value) -> Result<Self, ValidationError> {
        raw.as_object()
            .ok_or(ValidationError::NotAnObject)
            .and_then(Self::normalize)
    }
}

/// Normalize a list of raw descriptions, dropping invalid entries.
///
/// Duplicate ids resolve last-write-wins while keeping the position of the
/// first occurrence. Anything other than an array yields an empty list.
#[must_use]
pub fn normalize_command_list(raw: &Value) -> Vec<CommandSpec> {
    let Some(entries) = raw.as_array() else {
        return Vec::new();
    };
    let mut result: Vec<CommandSpec> = Vec::new();
    for spec in entries.iter().filter_map(|entry| CommandSpec::normalize_value(entry).ok()) {
        upsert(&mut result, spec);
    }
    result
}

/// Insert `spec`, replacing an existing command with the same id in place.
pub fn upsert(commands: &mut Vec<CommandSpec>, spec: CommandSpec) {
    match commands.iter_mut().find(|existing| existing.id == spec.id) {
        Some(existing) => *existing = spec,
        None => commands.push(spec),
    }
}

/// Execution-time bounds for a serial exchange.
///
/// The stored values are not clamped; floors and ceilings are applied here
/// when the command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialOptions {
    pub connect_timeout: Duration,
    pub response_bytes: usize,
    pub response_timeout: Duration,
    pub wait: Duration,
}

impl SerialOptions {
    #[must_use]
    pub fn from_seconds(
        connect_timeout: f64,
        response_bytes: usize,
        response_timeout: f64,
        wait: f64,
    ) -> Self {
        Self {
            connect_timeout: Duration::from_secs_f64(connect_timeout.max(0.2)),
            response_bytes,
            response_timeout: Duration::from_secs_f64(response_timeout.max(0.1)),
            wait: Duration::from_secs_f64(wait.clamp(0.0, 2.0)),
        }
    }
}

fn normalize_attribute(raw: &Map<String, Value>) -> Result<CommandAction, ValidationError> {
    let characteristic = string_field(raw, "characteristic")
        .or_else(|| string_field(raw, "attribute"))
        .ok_or(ValidationError::MissingAttribute)?
        .to_ascii_lowercase();
    let with_response = bool_field(raw, "with_response")?.unwrap_or(false);
    Ok(CommandAction::Attribute {
        characteristic,
        with_response,
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn normalize_serial(raw: &Map<String, Value>) -> Result<CommandAction, ValidationError> {
    let channel = integer_field(raw, "channel", 1.0, f64::from(MAX_SERIAL_CHANNEL))?
        .map(|value| value as u8);
    let service_uuid = string_field(raw, "service_uuid").map(|value| value.to_ascii_lowercase());
    let service_name = string_field(raw, "service_name");
    if channel.is_none() && service_uuid.is_none() && service_name.is_none() {
        return Err(ValidationError::MissingChannelTarget);
    }

    let response_bytes = integer_field(raw, "response_bytes", 0.0, MAX_RESPONSE_BYTES)?
        .map_or(0, |value| value as usize);
    let response_timeout = seconds_field(raw, "response_timeout")?.unwrap_or(DEFAULT_RESPONSE_TIMEOUT);
    let connect_timeout = seconds_field(raw, "connect_timeout")?.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
    let wait = seconds_field(raw, "wait")?.unwrap_or(0.0);

    Ok(CommandAction::Serial {
        channel,
        service_uuid,
        service_name,
        response_bytes,
        response_timeout,
        connect_timeout,
        wait,
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn normalize_remote(raw: &Map<String, Value>) -> Result<CommandAction, ValidationError> {
    let key = string_field(raw, "key")
        .ok_or(ValidationError::MissingKey)?
        .to_ascii_uppercase();
    let verb = string_field(raw, "command")
        .or_else(|| string_field(raw, "cmd"))
        .unwrap_or_else(|| "Click".to_string());
    let option = match raw.get("option") {
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(Value::String(text)) if !text.trim().is_empty() => text.trim().to_string(),
        Some(Value::Null | Value::String(_)) | None => "false".to_string(),
        Some(other) => {
            return Err(ValidationError::InvalidField {
                field: "option",
                value: other.to_string(),
            });
        }
    };

    let repeat = match number_field(raw, "repeat")? {
        None => 1,
        Some(value) => {
            if value.fract() != 0.0 {
                return Err(ValidationError::InvalidField {
                    field: "repeat",
                    value: value.to_string(),
                });
            }
            if value < 1.0 {
                return Err(ValidationError::NonPositiveRepeat(value as i64));
            }
            if value > MAX_REPEAT {
                return Err(ValidationError::OutOfRange {
                    field: "repeat",
                    value: value.to_string(),
                });
            }
            value as u32
        }
    };
    let repeat_delay = seconds_field(raw, "repeat_delay")?.unwrap_or(0.0);

    Ok(CommandAction::Remote {
        key,
        verb,
        option,
        repeat,
        repeat_delay,
    })
}

fn normalize_payload(raw: &Map<String, Value>) -> Result<Payload, ValidationError> {
    if let Some(hex) = string_field(raw, "payload_hex") {
        return Payload::from_hex(&hex);
    }
    match raw.get("payload_ascii") {
        None | Some(Value::Null) => Ok(Payload::Empty),
        Some(Value::String(text)) if text.is_empty() => Ok(Payload::Empty),
        Some(Value::String(text)) => Ok(Payload::Ascii(text.clone())),
        Some(_) => Err(ValidationError::InvalidAsciiPayload),
    }
}

fn default_label(id: &str) -> String {
    id.replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Non-empty trimmed string; numbers are stringified.
fn string_field(raw: &Map<String, Value>, key: &str) -> Option<String> {
    match raw.get(key)? {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn bool_field(raw: &Map<String, Value>, key: &'static str) -> Result<Option<bool>, ValidationError> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" | "" => Ok(Some(false)),
            _ => Err(ValidationError::InvalidField {
                field: key,
                value: text.clone(),
            }),
        },
        Some(Value::Number(number)) => Ok(Some(number.as_f64().is_some_and(|n| n != 0.0))),
        Some(other) => Err(ValidationError::InvalidField {
            field: key,
            value: other.to_string(),
        }),
    }
}

fn number_field(raw: &Map<String, Value>, key: &'static str) -> Result<Option<f64>, ValidationError> {
    let invalid = |value: String| ValidationError::InvalidField { field: key, value };
    let number = match raw.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(number)) => number.as_f64().ok_or_else(|| invalid(number.to_string()))?,
        Some(Value::String(text)) if text.trim().is_empty() => return Ok(None),
        Some(Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(text.clone()))?,
        Some(other) => return Err(invalid(other.to_string())),
    };
    if !number.is_finite() {
        return Err(invalid(number.to_string()));
    }
    Ok(Some(number))
}

fn integer_field(
    raw: &Map<String, Value>,
    key: &'static str,
    min: f64,
    max: f64,
) -> Result<Option<f64>, ValidationError> {
    let Some(value) = number_field(raw, key)? else {
        return Ok(None);
    };
    if value.fract() != 0.0 {
        return Err(ValidationError::InvalidField {
            field: key,
            value: value.to_string(),
        });
    }
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: key,
            value: value.to_string(),
        });
    }
    Ok(Some(value))
}

fn seconds_field(raw: &Map<String, Value>, key: &'static str) -> Result<Option<f64>, ValidationError> {
    let Some(value) = number_field(raw, key)? else {
        return Ok(None);
    };
    if !(0.0..=MAX_SECONDS).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: key,
            value: value.to_string(),
        });
    }
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn normalize(value: Value) -> Result<CommandSpec, ValidationError> {
        CommandSpec::normalize_value(&value)
    }

    #[test]
    fn should_default_to_ble_transport_and_title_case_label() {
        let spec = normalize(json!({
            "id": "power_on",
            "characteristic": "0000FF01-0000-1000-8000-00805F9B34FB",
            "payload_hex": "01",
        }))
        .unwrap();

        assert_eq!(spec.transport(), Transport::ShortRangeWireless);
        assert_eq!(spec.label, "Power On");
        assert_eq!(spec.payload, Payload::Hex("01".to_string()));
        assert_eq!(
            spec.action,
            CommandAction::Attribute {
                characteristic: "0000ff01-0000-1000-8000-00805f9b34fb".to_string(),
                with_response: false,
            }
        );
    }

    #[test]
    fn should_reject_when_id_is_missing_or_blank() {
        assert_eq!(
            normalize(json!({"characteristic": "ff01"})),
            Err(ValidationError::MissingCommandId)
        );
        assert_eq!(
            normalize(json!({"id": "  ", "characteristic": "ff01"})),
            Err(ValidationError::MissingCommandId)
        );
    }

    #[test]
    fn should_reject_unknown_transport() {
        assert!(matches!(
            normalize(json!({"id": "x", "transport": "zigbee"})),
            Err(ValidationError::UnknownTransport(_))
        ));
    }

    #[test]
    fn should_reject_when_transport_required_field_is_missing() {
        assert_eq!(
            normalize(json!({"id": "x", "transport": "ble"})),
            Err(ValidationError::MissingAttribute)
        );
        assert_eq!(
            normalize(json!({"id": "x", "transport": "rfcomm"})),
            Err(ValidationError::MissingChannelTarget)
        );
        assert_eq!(
            normalize(json!({"id": "x", "transport": "samsung", "key": "  "})),
            Err(ValidationError::MissingKey)
        );
    }

    #[test]
    fn should_validate_only_fields_of_selected_transport() {
        // `channel` is out of range but irrelevant to a BLE command.
        let spec = normalize(json!({"id": "x", "characteristic": "ff01", "channel": 99})).unwrap();
        assert_eq!(spec.transport(), Transport::ShortRangeWireless);
    }

    #[test]
    fn should_reject_odd_length_hex_payload() {
        assert_eq!(
            normalize(json!({"id": "x", "characteristic": "ff01", "payload_hex": "0x123"})),
            Err(ValidationError::OddHexPayload)
        );
    }

    #[test]
    fn should_reject_non_hex_payload() {
        assert_eq!(
            normalize(json!({"id": "x", "characteristic": "ff01", "payload_hex": "zz"})),
            Err(ValidationError::InvalidHexPayload)
        );
    }

    #[test]
    fn should_strip_separators_and_prefix_from_hex_payload() {
        let spec = normalize(json!({
            "id": "x",
            "characteristic": "ff01",
            "payload_hex": "0xAA 0xBB-cc:dd,\n01",
        }))
        .unwrap();
        assert_eq!(spec.payload.bytes(), vec![0xaa, 0xbb, 0xcc, 0xdd, 0x01]);
    }

    #[test]
    fn should_prefer_hex_over_ascii_payload() {
        let spec = normalize(json!({
            "id": "x",
            "characteristic": "ff01",
            "payload_hex": "41",
            "payload_ascii": "ignored",
        }))
        .unwrap();
        assert_eq!(spec.payload.bytes(), b"A");
    }

    #[test]
    fn should_accept_ascii_payload_when_hex_absent() {
        let spec = normalize(json!({"id": "x", "characteristic": "ff01", "payload_ascii": "PWR"}))
            .unwrap();
        assert_eq!(spec.payload, Payload::Ascii("PWR".to_string()));
    }

    #[test]
    fn should_reject_non_string_ascii_payload() {
        assert_eq!(
            normalize(json!({"id": "x", "characteristic": "ff01", "payload_ascii": 7})),
            Err(ValidationError::InvalidAsciiPayload)
        );
    }

    #[test]
    fn should_allow_empty_payload() {
        let spec = normalize(json!({"id": "read", "characteristic": "ff01"})).unwrap();
        assert!(spec.payload.is_empty());
        assert!(spec.payload.bytes().is_empty());
    }

    #[test]
    fn should_normalize_serial_command_with_numeric_strings() {
        let spec = normalize(json!({
            "id": "status",
            "transport": "classic",
            "channel": "3",
            "response_bytes": 16,
            "response_timeout": "2.5",
            "wait": 0.5,
        }))
        .unwrap();

        assert_eq!(
            spec.action,
            CommandAction::Serial {
                channel: Some(3),
                service_uuid: None,
                service_name: None,
                response_bytes: 16,
                response_timeout: 2.5,
                connect_timeout: 5.0,
                wait: 0.5,
            }
        );
    }

    #[test]
    fn should_reject_channel_out_of_range() {
        for channel in [json!(0), json!(31), json!("abc"), json!(2.5)] {
            let result = normalize(json!({"id": "x", "transport": "rfcomm", "channel": channel}));
            assert!(result.is_err(), "channel {channel}");
        }
    }

    #[test]
    fn should_accept_serial_command_addressed_by_service_uuid() {
        let spec = normalize(json!({
            "id": "x",
            "transport": "rfcomm",
            "service_uuid": "0000110B-0000-1000-8000-00805F9B34FB",
        }))
        .unwrap();
        match spec.action {
            CommandAction::Serial {
                channel,
                service_uuid,
                ..
            } => {
                assert_eq!(channel, None);
                assert_eq!(
                    service_uuid.as_deref(),
                    Some("0000110b-0000-1000-8000-00805f9b34fb")
                );
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn should_uppercase_remote_key_and_apply_defaults() {
        let spec = normalize(json!({"id": "mute", "transport": "session", "key": "key_mute"})).unwrap();
        assert_eq!(
            spec.action,
            CommandAction::Remote {
                key: "KEY_MUTE".to_string(),
                verb: "Click".to_string(),
                option: "false".to_string(),
                repeat: 1,
                repeat_delay: 0.0,
            }
        );
    }

    #[test]
    fn should_reject_non_positive_repeat_for_remote() {
        for repeat in [0, -2] {
            let result = normalize(json!({
                "id": "vol",
                "transport": "session",
                "key": "KEY_VOLUP",
                "repeat": repeat,
            }));
            assert_eq!(result, Err(ValidationError::NonPositiveRepeat(repeat)));
        }
    }

    #[test]
    fn should_reject_negative_timeouts() {
        let result = normalize(json!({
            "id": "x",
            "transport": "rfcomm",
            "channel": 1,
            "response_timeout": -1,
        }));
        assert!(matches!(result, Err(ValidationError::OutOfRange { field: "response_timeout", .. })));
    }

    #[test]
    fn should_resolve_duplicate_ids_last_write_wins() {
        let list = normalize_command_list(&json!([
            {"id": "a", "characteristic": "ff01", "payload_hex": "01"},
            {"id": "b", "characteristic": "ff02"},
            "not an object",
            {"id": "bad", "transport": "ble"},
            {"id": "a", "characteristic": "ff01", "payload_hex": "02"},
        ]));

        let ids: Vec<&str> = list.iter().map(|spec| spec.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(list[0].payload.bytes(), vec![0x02]);
    }

    #[test]
    fn should_return_empty_list_when_commands_is_not_an_array() {
        assert!(normalize_command_list(&json!({"id": "a"})).is_empty());
    }

    #[test]
    fn should_roundtrip_spec_through_serde_with_transport_tag() {
        let spec = normalize(json!({"id": "power_on", "characteristic": "ff01", "payload_hex": "01"}))
            .unwrap();
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["transport"], "ble");
        let parsed: CommandSpec = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, spec);
    }

    #[test]
    fn should_apply_execution_floors_to_serial_options() {
        let options = SerialOptions::from_seconds(0.0, 4, 0.0, 10.0);
        assert_eq!(options.connect_timeout, Duration::from_millis(200));
        assert_eq!(options.response_timeout, Duration::from_millis(100));
        assert_eq!(options.wait, Duration::from_secs(2));
    }
}
