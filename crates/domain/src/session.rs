//! Session-remote protocol model.
//!
//! A session remote is a TV-style remote control channel: a persistent JSON
//! websocket to a fixed IP endpoint, authenticated by a token the device
//! issues on first approval. This module holds the persisted
//! [`SessionRecord`], the frame builders and the inbound frame inspection
//! (token extraction, error detection). Socket handling lives in adapters.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Display name announced to the device when none is configured.
pub const DEFAULT_REMOTE_NAME: &str = "OmniHub Remote";

const APP_ID: &str = "omnihub";
const APP_USER: &str = "OmniHub";
const REMOTE_TYPE: &str = "SendRemoteKey";

/// Per-device session state persisted in device metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Stable client identifier presented on every connect.
    pub client_id: String,
    /// Last token issued by the device, sticky until an auth failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_address: Option<String>,
    pub name: String,
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self {
            client_id: uuid::Uuid::new_v4().to_string(),
            token: None,
            last_address: None,
            name: DEFAULT_REMOTE_NAME.to_string(),
        }
    }
}

impl SessionRecord {
    /// A fresh record with a generated client id and the default name.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the outcome of an exchange into the record.
    ///
    /// An authorization failure clears the token; otherwise a newly issued
    /// token replaces the stored one.
    pub fn absorb(&mut self, host: &str, exchange: &RemoteExchange) {
        self.last_address = Some(host.to_string());
        if exchange.error.as_deref().is_some_and(is_unauthorized) {
            self.token = None;
        } else if let Some(token) = &exchange.token {
            self.token = Some(token.clone());
        }
    }

    /// The connection parameters for `host`.
    #[must_use]
    pub fn endpoint(&self, host: &str) -> SessionEndpoint {
        SessionEndpoint {
            host: host.to_string(),
            client_id: self.client_id.clone(),
            name: self.name.clone(),
            token: self.token.clone(),
        }
    }
}

/// Everything a connector needs to open a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEndpoint {
    pub host: String,
    pub client_id: String,
    pub name: String,
    pub token: Option<String>,
}

impl SessionEndpoint {
    /// The display name as the device expects it: base64 of the UTF-8 bytes.
    #[must_use]
    pub fn encoded_name(&self) -> String {
        encode_name(&self.name)
    }
}

/// A key press request with its repeat policy.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyPress {
    pub key: String,
    pub verb: String,
    pub option: String,
    pub repeat: u32,
    /// Seconds between repeats.
    pub repeat_delay: f64,
}

#[must_use]
pub fn encode_name(name: &str) -> String {
    STANDARD.encode(name.as_bytes())
}

/// `ms.channel.connect` handshake frame.
#[must_use]
pub fn connect_frame(endpoint: &SessionEndpoint) -> String {
    let mut params = json!({
        "client_id": endpoint.client_id,
        "name": endpoint.encoded_name(),
        "appId": APP_ID,
        "user": APP_USER,
        "type": "remote",
    });
    if let (Some(token), Some(map)) = (&endpoint.token, params.as_object_mut()) {
        map.insert("token".to_string(), Value::String(token.clone()));
    }
    json!({"method": "ms.channel.connect", "params": params}).to_string()
}

/// `ms.remote.control` key frame.
#[must_use]
pub fn key_frame(press: &KeyPress) -> String {
    json!({
        "method": "ms.remote.control",
        "params": {
            "Cmd": press.verb,
            "DataOfCmd": press.key,
            "Option": press.option,
            "TypeOfRemote": REMOTE_TYPE,
        },
    })
    .to_string()
}

/// `ms.channel.disconnect` frame sent before closing.
#[must_use]
pub fn disconnect_frame(client_id: &str) -> String {
    json!({"method": "ms.channel.disconnect", "params": {"client_id": client_id}}).to_string()
}

/// Parse an inbound text frame; only JSON objects are kept.
#[must_use]
pub fn parse_frame(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str::<Value>(trimmed)
        .ok()
        .filter(Value::is_object)
}

fn token_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Find an issued token in a batch of frames.
///
/// Checks, per frame in order: top-level `token`, `data.token`, then the
/// `data.clients[].attributes` client id some devices echo instead.
#[must_use]
pub fn extract_token(messages: &[Value]) -> Option<String> {
    messages.iter().find_map(|message| {
        if let Some(token) = token_value(message.get("token")) {
            return Some(token);
        }
        let data = message.get("data")?;
        if let Some(token) = token_value(data.get("token")) {
            return Some(token);
        }
        data.get("clients")?
            .as_array()?
            .iter()
            .filter_map(|client| client.get("attributes"))
            .find_map(|attributes| {
                token_value(attributes.get("client_id"))
                    .or_else(|| token_value(attributes.get("clientId")))
            })
    })
}

const ERROR_MARKERS: [&str; 3] = ["unauthorized", "forbidden", "denied"];

fn mentions_auth_failure(text: &str) -> bool {
    let lowered = text.to_ascii_lowercase();
    ERROR_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// First authorization-style error message in a batch of frames.
#[must_use]
pub fn first_error(messages: &[Value]) -> Option<String> {
    messages.iter().find_map(|message| {
        let data = message.get("data")?;
        let text = data
            .get("message")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .or_else(|| {
                data.get("status_message")
                    .and_then(Value::as_str)
                    .filter(|text| !text.is_empty())
            })?;
        let code = match data.get("code") {
            Some(Value::String(code)) => code.clone(),
            Some(Value::Number(code)) => code.to_string(),
            _ => String::new(),
        };
        (mentions_auth_failure(&code) || mentions_auth_failure(text)).then(|| text.to_string())
    })
}

/// Whether an error message reports an authorization failure.
#[must_use]
pub fn is_unauthorized(error: &str) -> bool {
    error.to_ascii_lowercase().contains("unauthorized")
}

/// Outcome of one session-remote exchange.
///
/// Failures are reported in `error` rather than raised.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteExchange {
    pub token: Option<String>,
    pub messages: Vec<Value>,
    pub error: Option<String>,
}

impl RemoteExchange {
    /// JSON bytes returned as the command response.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(token: Option<&str>) -> SessionEndpoint {
        SessionEndpoint {
            host: "192.168.1.20".to_string(),
            client_id: "client-1".to_string(),
            name: "OmniHub Remote".to_string(),
            token: token.map(str::to_string),
        }
    }

    #[test]
    fn should_generate_client_id_and_default_name() {
        let a = SessionRecord::new();
        let b = SessionRecord::new();
        assert_ne!(a.client_id, b.client_id);
        assert_eq!(a.name, DEFAULT_REMOTE_NAME);
        assert!(a.token.is_none());
    }

    #[test]
    fn should_keep_token_until_authorization_failure() {
        let mut record = SessionRecord::new();
        record.absorb(
            "10.0.0.5",
            &RemoteExchange {
                token: Some("abc".to_string()),
                ..RemoteExchange::default()
            },
        );
        assert_eq!(record.token.as_deref(), Some("abc"));
        assert_eq!(record.last_address.as_deref(), Some("10.0.0.5"));

        record.absorb("10.0.0.5", &RemoteExchange::default());
        assert_eq!(record.token.as_deref(), Some("abc"));

        record.absorb(
            "10.0.0.5",
            &RemoteExchange {
                error: Some("Unauthorized".to_string()),
                ..RemoteExchange::default()
            },
        );
        assert!(record.token.is_none());
    }

    #[test]
    fn should_build_connect_frame_with_base64_name() {
        let frame: Value = serde_json::from_str(&connect_frame(&endpoint(None))).unwrap();
        assert_eq!(frame["method"], "ms.channel.connect");
        assert_eq!(frame["params"]["client_id"], "client-1");
        assert_eq!(frame["params"]["name"], "T21uaUh1YiBSZW1vdGU=");
        assert_eq!(frame["params"]["type"], "remote");
        assert!(frame["params"].get("token").is_none());
    }

    #[test]
    fn should_include_token_in_connect_frame_when_known() {
        let frame: Value = serde_json::from_str(&connect_frame(&endpoint(Some("42")))).unwrap();
        assert_eq!(frame["params"]["token"], "42");
    }

    #[test]
    fn should_build_key_frame() {
        let press = KeyPress {
            key: "KEY_POWER".to_string(),
            verb: "Click".to_string(),
            option: "false".to_string(),
            repeat: 1,
            repeat_delay: 0.0,
        };
        let frame: Value = serde_json::from_str(&key_frame(&press)).unwrap();
        assert_eq!(frame["method"], "ms.remote.control");
        assert_eq!(frame["params"]["DataOfCmd"], "KEY_POWER");
        assert_eq!(frame["params"]["Cmd"], "Click");
        assert_eq!(frame["params"]["TypeOfRemote"], "SendRemoteKey");
    }

    #[test]
    fn should_ignore_non_object_frames() {
        assert!(parse_frame("").is_none());
        assert!(parse_frame("not json").is_none());
        assert!(parse_frame("[1, 2]").is_none());
        assert!(parse_frame(r#"{"event": "ms.channel.ready"}"#).is_some());
    }

    #[test]
    fn should_extract_token_in_priority_order() {
        let top = vec![json!({"token": "top", "data": {"token": "nested"}})];
        assert_eq!(extract_token(&top).as_deref(), Some("top"));

        let nested = vec![json!({"data": {"token": 12345}})];
        assert_eq!(extract_token(&nested).as_deref(), Some("12345"));

        let clients = vec![json!({
            "event": "ms.channel.connect",
            "data": {"clients": [{"attributes": {"name": "x"}}, {"attributes": {"clientId": "echo"}}]},
        })];
        assert_eq!(extract_token(&clients).as_deref(), Some("echo"));

        assert_eq!(extract_token(&[json!({"event": "ready"})]), None);
    }

    #[test]
    fn should_detect_unauthorized_error_from_message_or_code() {
        let by_message = vec![json!({"event": "ms.channel.unauthorized", "data": {"message": "Unauthorized"}})];
        assert_eq!(first_error(&by_message).as_deref(), Some("Unauthorized"));

        let by_code = vec![json!({"data": {"status_message": "rejected", "code": "ACCESS_DENIED"}})];
        assert_eq!(first_error(&by_code).as_deref(), Some("rejected"));

        let harmless = vec![json!({"data": {"message": "connected"}})];
        assert_eq!(first_error(&harmless), None);
    }

    #[test]
    fn should_serialize_exchange_as_json_bytes() {
        let exchange = RemoteExchange {
            token: Some("t".to_string()),
            messages: vec![json!({"event": "ok"})],
            error: None,
        };
        let parsed: Value = serde_json::from_slice(&exchange.to_bytes()).unwrap();
        assert_eq!(parsed["token"], "t");
        assert_eq!(parsed["messages"][0]["event"], "ok");
        assert!(parsed["error"].is_null());
    }
}
