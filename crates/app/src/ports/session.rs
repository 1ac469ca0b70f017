//! Session-remote port — persistent websocket sessions to TVs.

use std::future::Future;
use std::time::Duration;

use omnihub_domain::error::OmniHubError;
use omnihub_domain::session::SessionEndpoint;

/// Opens sessions. One connector serves every device.
pub trait SessionConnector: Send + Sync {
    type Session: RemoteSession;

    fn connect(
        &self,
        endpoint: &SessionEndpoint,
    ) -> impl Future<Output = Result<Self::Session, OmniHubError>> + Send;
}

/// An open session carrying JSON text frames.
pub trait RemoteSession: Send + 'static {
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<(), OmniHubError>> + Send;

    /// Next text frame, or `None` when nothing arrives within `idle` or the
    /// peer closed the session.
    fn recv_text(
        &mut self,
        idle: Duration,
    ) -> impl Future<Output = Result<Option<String>, OmniHubError>> + Send;

    fn is_alive(&self) -> bool;

    /// Best-effort close.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
