//! Websocket sessions to a TV's remote-control channel.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt as _, StreamExt as _};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};
use url::Url;

use omnihub_app::ports::{RemoteSession, SessionConnector};
use omnihub_domain::error::OmniHubError;
use omnihub_domain::session::SessionEndpoint;

use crate::error::SmartViewError;
use crate::tls::insecure_client_config;

/// TLS port of the remote-control channel.
pub const DEFAULT_PORT: u16 = 8002;
const CHANNEL_PATH: &str = "/api/v2/channels/samsung.remote.control";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// The channel URL for `endpoint`, with the base64 display name, client id
/// and, when known, the token as query parameters.
///
/// # Errors
///
/// Returns [`SmartViewError::InvalidUrl`] when the host is not a valid URL
/// host.
pub fn endpoint_url(endpoint: &SessionEndpoint, port: u16) -> Result<Url, SmartViewError> {
    let mut url = Url::parse(&format!("wss://{}:{port}{CHANNEL_PATH}", endpoint.host))?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("name", &endpoint.encoded_name())
            .append_pair("client_id", &endpoint.client_id);
        if let Some(token) = &endpoint.token {
            query.append_pair("token", token);
        }
    }
    Ok(url)
}

pub struct SmartViewConnector {
    port: u16,
    tls: Arc<rustls::ClientConfig>,
}

impl SmartViewConnector {
    /// # Errors
    ///
    /// Returns [`SmartViewError::Tls`] when the TLS client cannot be set up.
    pub fn new() -> Result<Self, SmartViewError> {
        Self::with_port(DEFAULT_PORT)
    }

    /// # Errors
    ///
    /// Returns [`SmartViewError::Tls`] when the TLS client cannot be set up.
    pub fn with_port(port: u16) -> Result<Self, SmartViewError> {
        Ok(Self {
            port,
            tls: Arc::new(insecure_client_config()?),
        })
    }

    async fn open(&self, url: Url) -> Result<SmartViewSession, SmartViewError> {
        let connect = tokio_tungstenite::connect_async_tls_with_config(
            url.as_str(),
            None,
            true,
            Some(Connector::Rustls(self.tls.clone())),
        );
        let (stream, _response) = tokio::time::timeout(CONNECT_TIMEOUT, connect)
            .await
            .map_err(|_| SmartViewError::ConnectTimeout)??;
        Ok(SmartViewSession::new(stream))
    }
}

impl SessionConnector for SmartViewConnector {
    type Session = SmartViewSession;

    fn connect(
        &self,
        endpoint: &SessionEndpoint,
    ) -> impl Future<Output = Result<Self::Session, OmniHubError>> + Send {
        let url = endpoint_url(endpoint, self.port);
        let host = endpoint.host.clone();
        async move {
            let session = self.open(url?).await?;
            tracing::debug!(%host, "session connected");
            Ok(session)
        }
    }
}

/// One open websocket.
pub struct SmartViewSession<S = MaybeTlsStream<TcpStream>> {
    stream: WebSocketStream<S>,
    alive: bool,
}

impl<S> SmartViewSession<S> {
    pub fn new(stream: WebSocketStream<S>) -> Self {
        Self {
            stream,
            alive: true,
        }
    }
}

impl<S> RemoteSession for SmartViewSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<(), OmniHubError>> + Send {
        async move {
            if let Err(err) = self.stream.send(Message::Text(text.into())).await {
                self.alive = false;
                return Err(SmartViewError::from(err).into());
            }
            Ok(())
        }
    }

    fn recv_text(
        &mut self,
        idle: Duration,
    ) -> impl Future<Output = Result<Option<String>, OmniHubError>> + Send {
        async move {
            loop {
                let Ok(next) = tokio::time::timeout(idle, self.stream.next()).await else {
                    return Ok(None);
                };
                match next {
                    Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                    Some(Ok(Message::Binary(bytes))) => {
                        if let Ok(text) = String::from_utf8(bytes.to_vec()) {
                            return Ok(Some(text));
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        self.alive = false;
                        return Ok(None);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        self.alive = false;
                        return Err(SmartViewError::from(err).into());
                    }
                }
            }
        }
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn close(&mut self) -> impl Future<Output = ()> + Send {
        async move {
            if self.alive {
                if let Err(err) = self.stream.close(None).await {
                    tracing::debug!(%err, "session close failed");
                }
            }
            self.alive = false;
        }
    }
}
