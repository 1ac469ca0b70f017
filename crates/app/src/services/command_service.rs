//! Command service — send a stored or inline command and record the outcome.

use std::sync::Arc;

use omnihub_domain::binding::LastCommand;
use omnihub_domain::command::{CommandSpec, Transport};
use omnihub_domain::device::Device;
use omnihub_domain::error::{NotFoundError, OmniHubError};
use omnihub_domain::time::now;
use serde_json::Value;

use crate::ports::{DeviceStore, SerialChannel, SessionConnector, WirelessStack};
use crate::services::dispatcher::{CommandResponse, TransportDispatcher};
use crate::services::registry::DeviceRegistry;

/// Which command to send.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandRef {
    /// A command stored on the device, by id or `commands_map` alias.
    Stored(String),
    /// A raw command description, normalized before use.
    Inline(Value),
}

pub struct CommandService<S, W, SC, C: SessionConnector> {
    registry: Arc<DeviceRegistry<S>>,
    dispatcher: TransportDispatcher<W, SC, C>,
}

impl<S, W, SC, C> CommandService<S, W, SC, C>
where
    S: DeviceStore,
    W: WirelessStack,
    SC: SerialChannel,
    C: SessionConnector,
{
    pub fn new(registry: Arc<DeviceRegistry<S>>, dispatcher: TransportDispatcher<W, SC, C>) -> Self {
        Self {
            registry,
            dispatcher,
        }
    }

    /// Execute a command and record it on the device.
    ///
    /// Updates `last_command`, the session token for session-remote
    /// commands, the power state for `power_on`/`power_off`/`power_toggle`,
    /// and `last_seen`.
    ///
    /// # Errors
    ///
    /// Returns [`OmniHubError::NotFound`] for unknown devices or stored
    /// commands, [`OmniHubError::Validation`] for malformed inline commands,
    /// and anything [`TransportDispatcher::execute`] returns.
    #[tracing::instrument(skip(self, command))]
    pub async fn send_command(&self, id: &str, command: CommandRef) -> Result<Device, OmniHubError> {
        let device = self.registry.get(id).await?;
        let spec = match command {
            CommandRef::Stored(command_id) => device
                .metadata
                .find_command(&command_id)
                .cloned()
                .ok_or(NotFoundError {
                    entity: "Command",
                    id: command_id,
                })?,
            CommandRef::Inline(raw) => CommandSpec::normalize_value(&raw)?,
        };

        // The client id sent on the wire must be the one stored afterwards.
        let device = if spec.transport() == Transport::SessionRemote
            && device.supports(Transport::SessionRemote)
            && device.metadata.session().is_none()
        {
            self.registry
                .update(id, |device| {
                    device.metadata.session_mut();
                    Ok(device.clone())
                })
                .await?
        } else {
            device
        };

        let response = self.dispatcher.execute(&device, &spec).await?;
        tracing::info!(command = %spec.id, bytes = response.bytes.len(), "command sent");

        self.registry
            .update(id, |device| {
                record(device, &spec, &response);
                Ok(device.clone())
            })
            .await
    }
}

fn record(device: &mut Device, spec: &CommandSpec, response: &CommandResponse) {
    let at = now();
    device.metadata.last_command = Some(LastCommand {
        id: spec.id.clone(),
        at,
        transport: spec.transport(),
        response_len: response.bytes.len(),
        response_hex: (response.remote.is_none() && !response.bytes.is_empty())
            .then(|| hex::encode(&response.bytes)),
        remote: response
            .remote
            .as_ref()
            .and_then(|exchange| serde_json::to_value(exchange).ok()),
    });

    let mut delivered = true;
    if let (Some(exchange), Some(host)) = (&response.remote, &response.remote_host) {
        device.metadata.session_mut().absorb(host, exchange);
        delivered = exchange.error.is_none();
    }

    if delivered {
        let is_on = match spec.id.to_ascii_lowercase().as_str() {
            "power_on" => Some(true),
            "power_off" => Some(false),
            "power_toggle" => Some(!device.metadata.is_on.unwrap_or(device.is_online())),
            _ => None,
        };
        if let Some(is_on) = is_on {
            device.metadata.is_on = Some(is_on);
            device.set_online(is_on);
        }
    }
    device.last_seen = Some(at);
}
