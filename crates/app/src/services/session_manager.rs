//! Session manager — reuse of session-remote connections per device address.
//!
//! One slot per host address holds the open session, whether its handshake
//! completed, and the sticky token. The slot's async lock serializes every
//! exchange with that device.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use omnihub_domain::error::OmniHubError;
use omnihub_domain::session::{
    KeyPress, RemoteExchange, SessionEndpoint, connect_frame, disconnect_frame, extract_token,
    first_error, is_unauthorized, key_frame, parse_frame,
};
use serde_json::Value;

use crate::ports::{RemoteSession, SessionConnector};

/// Idle time after which draining inbound frames stops.
pub const DRAIN_IDLE: Duration = Duration::from_millis(1500);
/// Maximum frames drained after one outbound burst.
pub const DRAIN_LIMIT: usize = 4;

struct Slot<S> {
    session: Option<S>,
    handshake_done: bool,
    token: Option<String>,
    client_id: String,
}

impl<S: RemoteSession> Slot<S> {
    async fn discard(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
        self.handshake_done = false;
    }
}

type SharedSlot<S> = Arc<tokio::sync::Mutex<Slot<S>>>;

pub struct SessionManager<C: SessionConnector> {
    connector: C,
    slots: Mutex<HashMap<String, SharedSlot<C::Session>>>,
}

impl<C: SessionConnector> SessionManager<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, endpoint: &SessionEndpoint) -> SharedSlot<C::Session> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .entry(endpoint.host.clone())
            .or_insert_with(|| {
                Arc::new(tokio::sync::Mutex::new(Slot {
                    session: None,
                    handshake_done: false,
                    token: None,
                    client_id: endpoint.client_id.clone(),
                }))
            })
            .clone()
    }

    /// Press a key on the device at `endpoint.host`.
    ///
    /// Never fails: connection and protocol errors are reported in
    /// [`RemoteExchange::error`], and the cached session is discarded so the
    /// next call starts clean.
    #[tracing::instrument(skip(self, endpoint, press), fields(host = %endpoint.host, key = %press.key))]
    pub async fn send_key(&self, endpoint: &SessionEndpoint, press: &KeyPress) -> RemoteExchange {
        let slot = self.slot(endpoint);
        let mut slot = slot.lock().await;
        if slot.token.is_none() {
            slot.token.clone_from(&endpoint.token);
        }
        slot.client_id.clone_from(&endpoint.client_id);

        let mut exchange = RemoteExchange::default();
        if let Err(err) = self.run(&mut slot, endpoint, press, &mut exchange).await {
            tracing::warn!(error = %err, "session exchange failed");
            slot.discard().await;
            exchange.error = Some(err.to_string());
        }

        if exchange.error.as_deref().is_some_and(is_unauthorized) {
            tracing::info!("session token rejected, clearing");
            slot.token = None;
            slot.discard().await;
        }
        exchange.token.clone_from(&slot.token);
        exchange
    }

    async fn run(
        &self,
        slot: &mut Slot<C::Session>,
        endpoint: &SessionEndpoint,
        press: &KeyPress,
        exchange: &mut RemoteExchange,
    ) -> Result<(), OmniHubError> {
        let mut session = match slot.session.take() {
            Some(session) if session.is_alive() => session,
            stale => {
                if let Some(mut stale) = stale {
                    stale.close().await;
                }
                slot.handshake_done = false;
                let mut endpoint = endpoint.clone();
                endpoint.token.clone_from(&slot.token);
                tracing::debug!("opening session");
                self.connector.connect(&endpoint).await?
            }
        };

        match drive(&mut session, slot, endpoint, press, exchange).await {
            Ok(()) => {
                slot.session = Some(session);
                Ok(())
            }
            Err(err) => {
                session.close().await;
                slot.handshake_done = false;
                Err(err)
            }
        }
    }

    /// Close every cached session.
    pub async fn shutdown(&self) {
        let slots: Vec<_> = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, slot)| slot)
            .collect();
        for slot in slots {
            let mut slot = slot.lock().await;
            let frame = disconnect_frame(&slot.client_id);
            if let Some(session) = slot.session.as_mut() {
                if let Err(err) = session.send_text(frame).await {
                    tracing::debug!(error = %err, "disconnect frame not delivered");
                }
            }
            slot.discard().await;
        }
    }
}

async fn drive<S: RemoteSession>(
    session: &mut S,
    slot: &mut Slot<S>,
    endpoint: &SessionEndpoint,
    press: &KeyPress,
    exchange: &mut RemoteExchange,
) -> Result<(), OmniHubError> {
    if !slot.handshake_done {
        let mut endpoint = endpoint.clone();
        endpoint.token.clone_from(&slot.token);
        session.send_text(connect_frame(&endpoint)).await?;
        let messages = drain(session).await?;
        if let Some(token) = extract_token(&messages) {
            slot.token = Some(token);
        }
        exchange.error = first_error(&messages);
        exchange.messages.extend(messages);
        if exchange.error.as_deref().is_some_and(is_unauthorized) {
            return Ok(());
        }
        slot.handshake_done = true;
    }

    let total = press.repeat.max(1);
    let frame = key_frame(press);
    for index in 0..total {
        session.send_text(frame.clone()).await?;
        if press.repeat_delay > 0.0 && index + 1 < total {
            tokio::time::sleep(Duration::from_secs_f64(press.repeat_delay)).await;
        }
    }

    let acks = drain(session).await?;
    if let Some(token) = extract_token(&acks) {
        slot.token = Some(token);
    }
    if exchange.error.is_none() {
        exchange.error = first_error(&acks);
    }
    exchange.messages.extend(acks);
    Ok(())
}

async fn drain<S: RemoteSession>(session: &mut S) -> Result<Vec<Value>, OmniHubError> {
    let mut messages = Vec::new();
    for _ in 0..DRAIN_LIMIT {
        match session.recv_text(DRAIN_IDLE).await? {
            Some(text) => messages.extend(parse_frame(&text)),
            None => break,
        }
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fakes::FakeRemote;

    fn endpoint() -> SessionEndpoint {
        SessionEndpoint {
            host: "192.168.1.20".to_string(),
            client_id: "client-1".to_string(),
            name: "OmniHub Remote".to_string(),
            token: None,
        }
    }

    fn press(key: &str) -> KeyPress {
        KeyPress {
            key: key.to_string(),
            verb: "Click".to_string(),
            option: "false".to_string(),
            repeat: 1,
            repeat_delay: 0.0,
        }
    }

    const READY: &str = r#"{"event":"ms.channel.connect","data":{"token":"42"}}"#;
    const DENIED: &str = r#"{"event":"ms.channel.unauthorized","data":{"message":"Unauthorized"}}"#;

    #[tokio::test]
    async fn should_reuse_session_across_sequential_calls() {
        let remote = FakeRemote::default();
        remote.on_handshake(READY);
        let manager = SessionManager::new(remote.clone());

        let first = manager.send_key(&endpoint(), &press("KEY_VOLUP")).await;
        let second = manager.send_key(&endpoint(), &press("KEY_VOLDOWN")).await;

        assert!(first.error.is_none());
        assert!(second.error.is_none());
        assert_eq!(remote.connects().len(), 1);
        assert_eq!(remote.sent_containing("ms.channel.connect"), 1);
        assert_eq!(remote.sent_containing("ms.remote.control"), 2);
    }

    #[tokio::test]
    async fn should_not_send_key_when_handshake_unauthorized() {
        let remote = FakeRemote::default();
        remote.on_handshake(DENIED);
        let manager = SessionManager::new(remote.clone());

        let mut with_token = endpoint();
        with_token.token = Some("stale".to_string());
        let exchange = manager.send_key(&with_token, &press("KEY_POWER")).await;

        assert_eq!(exchange.error.as_deref(), Some("Unauthorized"));
        assert!(exchange.token.is_none());
        assert_eq!(remote.sent_containing("ms.remote.control"), 0);
        assert_eq!(remote.closes(), 1);
    }

    #[tokio::test]
    async fn should_keep_token_sticky_once_issued() {
        let remote = FakeRemote::default();
        remote.on_handshake(READY);
        let manager = SessionManager::new(remote.clone());

        let first = manager.send_key(&endpoint(), &press("KEY_MUTE")).await;
        assert_eq!(first.token.as_deref(), Some("42"));

        remote.fail_next_send();
        let failed = manager.send_key(&endpoint(), &press("KEY_MUTE")).await;
        assert!(failed.error.is_some());

        manager.send_key(&endpoint(), &press("KEY_MUTE")).await;
        let reconnect = remote.connects().pop().unwrap();
        assert_eq!(reconnect.token.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn should_discard_session_and_report_error_when_send_fails() {
        let remote = FakeRemote::default();
        remote.on_handshake(READY);
        let manager = SessionManager::new(remote.clone());

        manager.send_key(&endpoint(), &press("KEY_HOME")).await;
        remote.fail_next_send();
        let exchange = manager.send_key(&endpoint(), &press("KEY_HOME")).await;

        assert!(
            exchange
                .error
                .as_deref()
                .is_some_and(|error| error.contains("connection reset"))
        );

        manager.send_key(&endpoint(), &press("KEY_HOME")).await;
        assert_eq!(remote.connects().len(), 2);
        assert_eq!(remote.sent_containing("ms.channel.connect"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn should_repeat_key_presses_with_delay() {
        let remote = FakeRemote::default();
        let manager = SessionManager::new(remote.clone());
        let mut repeated = press("KEY_VOLUP");
        repeated.repeat = 3;
        repeated.repeat_delay = 0.25;

        let started = tokio::time::Instant::now();
        manager.send_key(&endpoint(), &repeated).await;

        assert_eq!(remote.sent_containing("KEY_VOLUP"), 3);
        assert!(started.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn should_collect_acknowledgements_and_ack_errors() {
        let remote = FakeRemote::default();
        remote.on_key(r#"{"event":"ms.error","data":{"message":"Access denied"}}"#);
        remote.on_key("not json");
        let manager = SessionManager::new(remote.clone());

        let exchange = manager.send_key(&endpoint(), &press("KEY_SOURCE")).await;

        assert_eq!(exchange.messages.len(), 1);
        assert_eq!(exchange.error.as_deref(), Some("Access denied"));
    }

    #[tokio::test]
    async fn should_close_sessions_on_shutdown() {
        let remote = FakeRemote::default();
        let manager = SessionManager::new(remote.clone());
        manager.send_key(&endpoint(), &press("KEY_HOME")).await;

        manager.shutdown().await;

        assert_eq!(remote.sent_containing("ms.channel.disconnect"), 1);
        assert_eq!(remote.closes(), 1);
    }
}
