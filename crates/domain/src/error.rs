//! Common error types used across the workspace.
//!
//! Each failure class has its own typed error that converts into
//! [`OmniHubError`] via `#[from]`. Adapters define their own error enums and
//! convert into [`OmniHubError`] at the port boundary.

use crate::command::Transport;

/// Top-level error returned by every domain and application operation.
#[derive(Debug, thiserror::Error)]
pub enum OmniHubError {
    /// Bad or missing input, always reported before any transport I/O.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Lookup miss for a device, command, or job.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// The request does not fit the device (transport/protocol mismatch).
    #[error("unsupported operation: {0}")]
    Unsupported(#[from] UnsupportedError),

    /// I/O failure while talking to a device or the host stack.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The multi-step pairing workflow failed.
    #[error("{0}")]
    Pairing(#[from] PairingError),

    /// Persistence failure.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Input validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("bluetooth address required")]
    EmptyAddress,

    #[error("bluetooth address must be 12 hex characters (e.g. AA:BB:CC:DD:EE:FF), got {input:?}")]
    InvalidAddress { input: String },

    #[error("device missing address")]
    MissingAddress,

    #[error("command id missing")]
    MissingCommandId,

    #[error("command description must be an object")]
    NotAnObject,

    #[error("unknown transport {0:?}")]
    UnknownTransport(String),

    #[error("characteristic missing for command")]
    MissingAttribute,

    #[error("serial command requires a channel, service uuid, or service name")]
    MissingChannelTarget,

    #[error("channel missing")]
    ChannelMissing,

    #[error("remote key code missing")]
    MissingKey,

    #[error("field {field} is not a valid value: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("field {field} out of range: {value}")]
    OutOfRange { field: &'static str, value: String },

    #[error("repeat must be at least 1, got {0}")]
    NonPositiveRepeat(i64),

    #[error("hex payload must have an even number of characters")]
    OddHexPayload,

    #[error("invalid hex payload")]
    InvalidHexPayload,

    #[error("payload_ascii must be a string")]
    InvalidAsciiPayload,

    #[error("device name must not be empty")]
    EmptyName,

    #[error("metadata patch must be an object")]
    InvalidMetadata,

    #[error("pairing payload must be an object")]
    InvalidPairingPayload,
}

/// A requested entity does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} not found: {id}")]
pub struct NotFoundError {
    /// Kind of thing that was looked up (e.g. `"Device"`, `"Command"`).
    pub entity: &'static str,
    /// Identifier that missed.
    pub id: String,
}

/// The operation is not available for this device.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnsupportedError {
    #[error("device {device} does not support {transport} commands")]
    TransportMismatch { device: String, transport: Transport },

    #[error("unsupported protocol for {operation} operation")]
    NoProtocolFor { operation: &'static str },

    #[error("bluetooth device missing power command mapping")]
    MissingPowerCommand,

    #[error("accessory device missing pairing metadata")]
    MissingBridgeMetadata,

    #[error("ip light {address} has no local power client")]
    LightPowerUnavailable { address: String },

    #[error("device {device} does not support {action} media control")]
    MediaUnsupported { device: String, action: &'static str },
}

/// Failures while talking to a device or the host stack.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The underlying link dropped mid-operation.
    #[error("transport closed: {detail}")]
    Closed { detail: String },

    /// The operation did not complete within its timeout.
    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    /// A required host tool is not installed.
    #[error("{tool} not found")]
    ToolMissing { tool: &'static str },

    /// Any other I/O failure.
    #[error("{operation} failed: {detail}")]
    Failed {
        operation: &'static str,
        detail: String,
    },
}

/// Step of the pairing workflow that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingStep {
    Agent,
    Pair,
    Trust,
}

impl std::fmt::Display for PairingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Agent => f.write_str("agent registration"),
            Self::Pair => f.write_str("pair"),
            Self::Trust => f.write_str("trust"),
        }
    }
}

/// A pairing workflow failure with the failing step attached.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("pairing failed during {step}: {detail}")]
pub struct PairingError {
    pub step: PairingStep,
    pub detail: String,
}

impl OmniHubError {
    /// Wrap any storage-layer error.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Box::new(err))
    }
}
