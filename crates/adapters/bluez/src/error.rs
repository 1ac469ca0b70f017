//! BlueZ adapter error types.

use std::io::ErrorKind;

use omnihub_domain::error::{OmniHubError, TransportError, ValidationError};

/// Errors specific to the BlueZ adapter.
#[derive(Debug, thiserror::Error)]
pub enum BluezError {
    /// The executable is not installed.
    #[error("{tool} not found")]
    ToolMissing { tool: &'static str },

    /// The process could not be started or awaited.
    #[error("failed to run {tool}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The process did not exit in time and was killed.
    #[error("{tool} timed out")]
    Timeout { tool: &'static str },

    /// The pairing agent capability is not one this adapter can serve.
    #[error("unsupported agent capability {0:?}")]
    UnsupportedCapability(String),

    #[error("invalid bluetooth address {0:?}")]
    InvalidAddress(String),

    #[error("RFCOMM connect timed out")]
    ConnectTimeout,

    /// Socket I/O on an RFCOMM stream failed.
    #[error("RFCOMM I/O error")]
    Io(#[source] std::io::Error),

    /// A BlueZ D-Bus call failed.
    #[error("BlueZ error")]
    Bluer(#[from] bluer::Error),
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::NotConnected
            | ErrorKind::UnexpectedEof
    )
}

impl From<BluezError> for OmniHubError {
    fn from(err: BluezError) -> Self {
        let transport = match err {
            BluezError::ToolMissing { tool } => TransportError::ToolMissing { tool },
            BluezError::Timeout { tool } => TransportError::Timeout { operation: tool },
            BluezError::ConnectTimeout => TransportError::Timeout {
                operation: "rfcomm connect",
            },
            BluezError::InvalidAddress(input) => {
                return ValidationError::InvalidAddress { input }.into();
            }
            BluezError::Io(source) if is_disconnect(source.kind()) => TransportError::Closed {
                detail: source.to_string(),
            },
            BluezError::Io(source) => TransportError::Failed {
                operation: "rfcomm",
                detail: source.to_string(),
            },
            BluezError::Spawn { tool, source } => TransportError::Failed {
                operation: tool,
                detail: source.to_string(),
            },
            BluezError::Bluer(source) => TransportError::Failed {
                operation: "bluez",
                detail: source.to_string(),
            },
            other @ BluezError::UnsupportedCapability(_) => TransportError::Failed {
                operation: "agent registration",
                detail: other.to_string(),
            },
        };
        transport.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_missing_tool_to_tool_missing() {
        let err: OmniHubError = BluezError::ToolMissing { tool: "sdptool" }.into();
        assert!(matches!(
            err,
            OmniHubError::Transport(TransportError::ToolMissing { tool: "sdptool" })
        ));
    }

    #[test]
    fn should_convert_reset_to_closed_transport() {
        let err: OmniHubError =
            BluezError::Io(std::io::Error::new(ErrorKind::ConnectionReset, "reset")).into();
        assert!(matches!(
            err,
            OmniHubError::Transport(TransportError::Closed { .. })
        ));
    }

    #[test]
    fn should_convert_other_io_to_failed_transport() {
        let err: OmniHubError =
            BluezError::Io(std::io::Error::new(ErrorKind::PermissionDenied, "denied")).into();
        assert_eq!(err.to_string(), "transport error: rfcomm failed: denied");
    }

    #[test]
    fn should_convert_timeout_with_tool_name() {
        let err: OmniHubError = BluezError::Timeout { tool: "bluetoothctl" }.into();
        assert_eq!(err.to_string(), "transport error: bluetoothctl timed out");
    }
}
