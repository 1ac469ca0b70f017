//! # omnihub-adapter-smartview
//!
//! Session-remote adapter — implements
//! [`SessionConnector`](omnihub_app::ports::SessionConnector) over secure
//! websockets.
//!
//! TVs serve the remote-control channel with self-signed certificates, so the
//! TLS client accepts any certificate while still checking handshake
//! signatures. The session layer above owns reuse, the handshake and the token.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `omnihub-app` and `omnihub-domain`.

mod connector;
mod error;
mod tls;

pub use connector::{DEFAULT_PORT, SmartViewConnector, SmartViewSession, endpoint_url};
pub use error::SmartViewError;
