//! Pairing orchestrator — pair and trust a device, then record it.
//!
//! The workflow tries a direct connection first and only falls back to
//! host-level pairing (agent, discovery window, pair, trust) when the
//! peripheral refuses it. Capability discovery afterwards is best-effort.

use std::sync::Arc;
use std::time::Duration;

use omnihub_domain::address::BtAddress;
use omnihub_domain::binding::PairingState;
use omnihub_domain::capability::{ClassicSummary, parse_sdp_browse};
use omnihub_domain::command::normalize_command_list;
use omnihub_domain::device::{Device, Protocol};
use omnihub_domain::error::{OmniHubError, PairingError, PairingStep, ValidationError};
use omnihub_domain::id::DeviceId;
use omnihub_domain::time::now;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::ports::{DeviceStore, HostBluetooth, WirelessStack};
use crate::services::host_tool::{
    agent_registered, already_paired, already_trusted, format_tool_error,
};
use crate::services::registry::DeviceRegistry;

/// Integration tag added to every paired device.
pub const PAIRING_INTEGRATION: &str = "scene";

const DIRECT_CONNECT_LIMIT: Duration = Duration::from_secs(5);
const TRUST_TIMEOUT_SECS: u64 = 5;

/// A validated pairing request.
#[derive(Debug, Clone, PartialEq)]
pub struct PairingRequest {
    pub address: BtAddress,
    pub device_id: Option<DeviceId>,
    pub name: Option<String>,
    pub room: Option<String>,
    pub kind: Option<String>,
    /// Raw command descriptions; invalid entries are dropped on merge.
    pub commands: Value,
}

impl PairingRequest {
    /// A request for `address` with everything else defaulted.
    #[must_use]
    pub fn new(address: BtAddress) -> Self {
        Self {
            address,
            device_id: None,
            name: None,
            room: None,
            kind: None,
            commands: Value::Null,
        }
    }

    /// Parse a JSON pairing payload.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPairingPayload`] for non-objects and
    /// the address errors of [`BtAddress::parse`].
    pub fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let object = payload
            .as_object()
            .ok_or(ValidationError::InvalidPairingPayload)?;
        let text = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        let address = BtAddress::parse(&text("address").unwrap_or_default())?;
        Ok(Self {
            address,
            device_id: text("device_id").map(DeviceId::new),
            name: text("name"),
            room: text("room"),
            kind: text("type"),
            commands: object.get("commands").cloned().unwrap_or(Value::Null),
        })
    }
}

/// Timeouts and agent settings for the pairing workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingSettings {
    pub pair_timeout: Duration,
    pub agent_capability: String,
}

impl Default for PairingSettings {
    fn default() -> Self {
        Self {
            pair_timeout: Duration::from_secs(15),
            agent_capability: "NoInputNoOutput".to_string(),
        }
    }
}

pub struct PairingOrchestrator<S, W, H> {
    registry: Arc<DeviceRegistry<S>>,
    wireless: Arc<W>,
    host: Arc<H>,
    settings: PairingSettings,
    agent_ready: Mutex<bool>,
}

impl<S, W, H> PairingOrchestrator<S, W, H>
where
    S: DeviceStore,
    W: WirelessStack,
    H: HostBluetooth,
{
    pub fn new(
        registry: Arc<DeviceRegistry<S>>,
        wireless: Arc<W>,
        host: Arc<H>,
        settings: PairingSettings,
    ) -> Self {
        Self {
            registry,
            wireless,
            host,
            settings,
            agent_ready: Mutex::new(false),
        }
    }

    /// Pair, trust and record the device described by `request`.
    ///
    /// A device that is already paired and trusted skips the host steps;
    /// only its capabilities and command tables are refreshed.
    ///
    /// # Errors
    ///
    /// Returns [`OmniHubError::Pairing`] with the failing step, or a storage
    /// error when the registry cannot be persisted.
    #[tracing::instrument(skip(self, request), fields(address = %request.address))]
    pub async fn pair(&self, request: PairingRequest) -> Result<Device, OmniHubError> {
        let address = request.address.as_str().to_string();
        let device_id = request
            .device_id
            .clone()
            .unwrap_or_else(|| DeviceId::new(format!("ble-{}", request.address.slug())));

        let already = self
            .registry
            .find(device_id.as_str())
            .await
            .is_some_and(|device| device.metadata.is_paired() && device.metadata.is_trusted());

        let pairing = if already {
            tracing::info!(%device_id, "device already paired and trusted");
            None
        } else {
            Some(self.pair_and_trust(&address).await?)
        };

        let classic = self.discover_capabilities(&address).await;
        let commands = normalize_command_list(&request.commands);

        let mut builder = Device::builder()
            .id(device_id.clone())
            .name(request.name.clone().unwrap_or_else(|| address.clone()));
        if let Some(room) = &request.room {
            builder = builder.room(room.clone());
        }
        if let Some(kind) = &request.kind {
            builder = builder.kind(kind.clone());
        }
        let fresh = builder.build()?;

        let device = self
            .registry
            .mutate(|devices| {
                let device = devices.entry(device_id.clone()).or_insert(fresh);
                if let Some(name) = &request.name {
                    device.name.clone_from(name);
                }
                if let Some(room) = &request.room {
                    device.room.clone_from(room);
                }
                if let Some(kind) = &request.kind {
                    device.kind.clone_from(kind);
                }
                device.address = Some(address.clone());
                device.add_protocol(Protocol::Bluetooth);
                device.add_integration(PAIRING_INTEGRATION);
                if let Some(agent) = pairing {
                    let at = now();
                    device.metadata.pairing = Some(PairingState {
                        paired: true,
                        paired_at: Some(at),
                        trusted: true,
                        trusted_at: Some(at),
                        agent,
                    });
                }
                device.metadata.merge_commands(commands);
                if let Some(summary) = classic {
                    device.capabilities.set_classic(summary);
                }
                device.validate()?;
                Ok(device.clone())
            })
            .await?;

        tracing::info!(device_id = %device.id, "device paired");
        Ok(device)
    }

    /// Returns the agent capability when host-level pairing ran.
    async fn pair_and_trust(&self, address: &str) -> Result<Option<String>, OmniHubError> {
        let direct_timeout = DIRECT_CONNECT_LIMIT.min(self.settings.pair_timeout);
        match self.wireless.connect(address, direct_timeout).await {
            Ok(true) => {
                tracing::info!("connected directly, skipping host pairing");
                return Ok(None);
            }
            Ok(false) => tracing::debug!("direct connect refused, falling back to host pairing"),
            Err(err) => {
                tracing::debug!(error = %err, "direct connect failed, falling back to host pairing");
            }
        }

        self.ensure_agent().await?;

        let pair_secs = self.settings.pair_timeout.as_secs();
        let window = pair_secs.clamp(3, 20);
        match self
            .host
            .run_tool(args(&["--timeout", &window.to_string(), "scan", "on"]))
            .await
        {
            Ok(scan) if scan.success => {
                if let Err(err) = self.host.run_tool(args(&["scan", "off"])).await {
                    tracing::debug!(error = %err, "scan off failed");
                }
            }
            Ok(scan) => tracing::warn!("{}", format_tool_error("scan", "on", &scan)),
            Err(err) => tracing::warn!(error = %err, "scan before pairing failed"),
        }

        let pair = self
            .host
            .run_tool(args(&["--timeout", &pair_secs.to_string(), "pair", address]))
            .await
            .map_err(|err| step_error(PairingStep::Pair, err.to_string()))?;
        if !pair.success && !already_paired(&pair) {
            return Err(step_error(
                PairingStep::Pair,
                format_tool_error("pair", address, &pair),
            ));
        }

        let trust = self
            .host
            .run_tool(args(&[
                "--timeout",
                &TRUST_TIMEOUT_SECS.to_string(),
                "trust",
                address,
            ]))
            .await
            .map_err(|err| step_error(PairingStep::Trust, err.to_string()))?;
        if !trust.success && !already_trusted(&trust) {
            return Err(step_error(
                PairingStep::Trust,
                format_tool_error("trust", address, &trust),
            ));
        }

        Ok(Some(self.settings.agent_capability.clone()))
    }

    /// Register a pairing agent once per orchestrator.
    ///
    /// The system bus is tried first, then the tool script.
    async fn ensure_agent(&self) -> Result<(), OmniHubError> {
        let mut ready = self.agent_ready.lock().await;
        if *ready {
            return Ok(());
        }
        let capability = &self.settings.agent_capability;

        match self.host.register_agent(capability).await {
            Ok(()) => {
                tracing::info!(%capability, "pairing agent registered on system bus");
                *ready = true;
                return Ok(());
            }
            Err(err) => {
                tracing::warn!(error = %err, "bus agent registration failed, falling back to tool");
            }
        }

        let output = self
            .host
            .run_agent_script(capability)
            .await
            .map_err(|err| step_error(PairingStep::Agent, err.to_string()))?;
        if !agent_registered(&output) {
            tracing::warn!(
                stdout = %output.stdout.trim(),
                stderr = %output.stderr.trim(),
                "unexpected agent registration output"
            );
            if !output.success {
                return Err(step_error(
                    PairingStep::Agent,
                    format_tool_error("agent", capability, &output),
                ));
            }
        }
        *ready = true;
        Ok(())
    }

    /// Browse and summarize classic services; `None` on any failure.
    async fn discover_capabilities(&self, address: &str) -> Option<ClassicSummary> {
        match self.host.browse_services(address).await {
            Ok(text) => Some(parse_sdp_browse(&text)).filter(|summary| !summary.is_empty()),
            Err(err) => {
                tracing::debug!(error = %err, "capability discovery skipped");
                None
            }
        }
    }
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| (*part).to_string()).collect()
}

fn step_error(step: PairingStep, detail: String) -> OmniHubError {
    PairingError { step, detail }.into()
}
