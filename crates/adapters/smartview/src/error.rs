//! Session-remote adapter error types.

use omnihub_domain::error::{OmniHubError, TransportError};
use tokio_tungstenite::tungstenite;

#[derive(Debug, thiserror::Error)]
pub enum SmartViewError {
    #[error("invalid session endpoint")]
    InvalidUrl(#[from] url::ParseError),

    #[error("TLS configuration error")]
    Tls(#[from] rustls::Error),

    #[error("websocket error")]
    WebSocket(#[from] tungstenite::Error),

    #[error("session connect timed out")]
    ConnectTimeout,
}

impl SmartViewError {
    fn is_closed(&self) -> bool {
        matches!(
            self,
            Self::WebSocket(
                tungstenite::Error::ConnectionClosed
                    | tungstenite::Error::AlreadyClosed
                    | tungstenite::Error::Io(_)
                    | tungstenite::Error::Protocol(
                        tungstenite::error::ProtocolError::ResetWithoutClosingHandshake
                    )
            )
        )
    }
}

impl From<SmartViewError> for OmniHubError {
    fn from(err: SmartViewError) -> Self {
        let detail = match &err {
            SmartViewError::WebSocket(source) => source.to_string(),
            other => other.to_string(),
        };
        let transport = if err.is_closed() {
            TransportError::Closed { detail }
        } else if matches!(err, SmartViewError::ConnectTimeout) {
            TransportError::Timeout {
                operation: "session connect",
            }
        } else {
            TransportError::Failed {
                operation: "session",
                detail,
            }
        };
        transport.into()
    }
}
