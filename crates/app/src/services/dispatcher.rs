//! Transport dispatcher — executes one command against one device.
//!
//! Routing is strictly by the command's transport. All validation happens
//! before any I/O.

use std::sync::Arc;

use omnihub_domain::command::{CommandAction, CommandSpec, SerialOptions, Transport};
use omnihub_domain::device::{Device, Protocol};
use omnihub_domain::error::{OmniHubError, UnsupportedError, ValidationError};
use omnihub_domain::session::{KeyPress, RemoteExchange, SessionRecord};

use crate::ports::{SerialChannel, SessionConnector, WirelessStack};
use crate::services::session_manager::SessionManager;

/// What a command execution produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandResponse {
    /// Raw response bytes; empty for attribute writes.
    pub bytes: Vec<u8>,
    /// The structured exchange for session-remote commands.
    pub remote: Option<RemoteExchange>,
    /// Host the session-remote command went to.
    pub remote_host: Option<String>,
}

pub struct TransportDispatcher<W, SC, C: SessionConnector> {
    wireless: Arc<W>,
    serial: SC,
    sessions: Arc<SessionManager<C>>,
}

impl<W, SC, C> TransportDispatcher<W, SC, C>
where
    W: WirelessStack,
    SC: SerialChannel,
    C: SessionConnector,
{
    pub fn new(wireless: Arc<W>, serial: SC, sessions: Arc<SessionManager<C>>) -> Self {
        Self {
            wireless,
            serial,
            sessions,
        }
    }

    pub fn wireless(&self) -> &W {
        &self.wireless
    }

    /// Execute `spec` against `device`.
    ///
    /// # Errors
    ///
    /// Returns [`OmniHubError::Validation`] for a missing address or an
    /// unresolvable channel, [`OmniHubError::Unsupported`] when the device is
    /// not reachable over the command's transport, and transport errors from
    /// the wireless or serial ports. Session-remote failures are reported
    /// inside the response instead.
    #[tracing::instrument(skip(self, device, spec), fields(device_id = %device.id, command = %spec.id, transport = %spec.transport()))]
    pub async fn execute(
        &self,
        device: &Device,
        spec: &CommandSpec,
    ) -> Result<CommandResponse, OmniHubError> {
        match &spec.action {
            CommandAction::Attribute {
                characteristic,
                with_response,
            } => {
                let address = device.require_address()?;
                if !device.has_protocol(&Protocol::Bluetooth) {
                    return Err(mismatch(device, Transport::ShortRangeWireless));
                }
                self.wireless
                    .write_attribute(address, characteristic, &spec.payload.bytes(), *with_response)
                    .await?;
                Ok(CommandResponse::default())
            }
            CommandAction::Serial {
                channel,
                service_uuid,
                service_name,
                response_bytes,
                response_timeout,
                connect_timeout,
                wait,
            } => {
                let address = device.require_address()?;
                let channel = channel
                    .or_else(|| {
                        service_uuid
                            .as_deref()
                            .and_then(|uuid| device.capabilities.resolve_channel(uuid))
                    })
                    .or_else(|| {
                        service_name
                            .as_deref()
                            .and_then(|name| device.capabilities.resolve_channel(name))
                    })
                    .ok_or(ValidationError::ChannelMissing)?;
                let options = SerialOptions::from_seconds(
                    *connect_timeout,
                    *response_bytes,
                    *response_timeout,
                    *wait,
                );
                tracing::debug!(channel, "serial exchange");
                let bytes = self
                    .serial
                    .exchange(address, channel, &spec.payload.bytes(), options)
                    .await?;
                Ok(CommandResponse {
                    bytes,
                    ..CommandResponse::default()
                })
            }
            CommandAction::Remote {
                key,
                verb,
                option,
                repeat,
                repeat_delay,
            } => {
                if !device.supports(Transport::SessionRemote) {
                    return Err(mismatch(device, Transport::SessionRemote));
                }
                let record = device.metadata.session().cloned().unwrap_or_default();
                let host = session_host(device, &record)?;
                let press = KeyPress {
                    key: key.clone(),
                    verb: verb.clone(),
                    option: option.clone(),
                    repeat: *repeat,
                    repeat_delay: *repeat_delay,
                };
                let exchange = self.sessions.send_key(&record.endpoint(&host), &press).await;
                Ok(CommandResponse {
                    bytes: exchange.to_bytes(),
                    remote: Some(exchange),
                    remote_host: Some(host),
                })
            }
        }
    }
}

fn session_host(device: &Device, record: &SessionRecord) -> Result<String, ValidationError> {
    device
        .require_address()
        .map(str::to_string)
        .or_else(|err| record.last_address.clone().ok_or(err))
}

fn mismatch(device: &Device, transport: Transport) -> OmniHubError {
    UnsupportedError::TransportMismatch {
        device: device.id.to_string(),
        transport,
    }
    .into()
}
