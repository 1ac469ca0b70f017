//! Hub facade — one entry point wiring the registry, services and jobs.

use std::sync::Arc;

use omnihub_domain::device::Device;
use omnihub_domain::error::OmniHubError;
use omnihub_domain::id::JobId;
use omnihub_domain::pairing_job::PairingJob;

use crate::ports::{
    AccessoryBridge, DeviceStore, HostBluetooth, IpLights, SerialChannel, SessionConnector,
    WirelessStack,
};
use crate::services::command_service::CommandService;
use crate::services::device_service::{DeviceService, DeviceSettings};
use crate::services::dispatcher::TransportDispatcher;
use crate::services::pairing::{PairingOrchestrator, PairingRequest, PairingSettings};
use crate::services::pairing_jobs::PairingJobTracker;
use crate::services::registry::DeviceRegistry;
use crate::services::session_manager::SessionManager;

/// Timeouts for the services the hub builds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubOptions {
    pub devices: DeviceSettings,
    pub pairing: PairingSettings,
}

/// The collaborators a hub is built from.
pub struct HubParts<S, W, H, SC, C, B, L> {
    pub store: S,
    pub wireless: W,
    pub host: H,
    pub serial: SC,
    pub connector: C,
    pub bridge: B,
    pub lights: L,
}

pub struct Hub<S, W, H, SC, C: SessionConnector, B, L> {
    devices: DeviceService<S, W, H, B, L>,
    commands: CommandService<S, W, SC, C>,
    pairing: Arc<PairingOrchestrator<S, W, H>>,
    jobs: PairingJobTracker,
    sessions: Arc<SessionManager<C>>,
}

impl<S, W, H, SC, C, B, L> Hub<S, W, H, SC, C, B, L>
where
    S: DeviceStore + 'static,
    W: WirelessStack + 'static,
    H: HostBluetooth + 'static,
    SC: SerialChannel,
    C: SessionConnector,
    B: AccessoryBridge,
    L: IpLights,
{
    /// Load the registry and build every service around it.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the registry cannot be loaded.
    pub async fn open(
        parts: HubParts<S, W, H, SC, C, B, L>,
        options: HubOptions,
    ) -> Result<Self, OmniHubError> {
        let registry = Arc::new(DeviceRegistry::open(parts.store).await?);
        let wireless = Arc::new(parts.wireless);
        let host = Arc::new(parts.host);
        let sessions = Arc::new(SessionManager::new(parts.connector));

        let dispatcher = TransportDispatcher::new(wireless.clone(), parts.serial, sessions.clone());
        Ok(Self {
            devices: DeviceService::new(
                registry.clone(),
                wireless.clone(),
                host.clone(),
                parts.bridge,
                parts.lights,
                options.devices,
            ),
            commands: CommandService::new(registry.clone(), dispatcher),
            pairing: Arc::new(PairingOrchestrator::new(registry, wireless, host, options.pairing)),
            jobs: PairingJobTracker::new(),
            sessions,
        })
    }

    pub fn devices(&self) -> &DeviceService<S, W, H, B, L> {
        &self.devices
    }

    pub fn commands(&self) -> &CommandService<S, W, SC, C> {
        &self.commands
    }

    /// Pair in the foreground.
    ///
    /// # Errors
    ///
    /// See [`PairingOrchestrator::pair`].
    pub async fn pair(&self, request: PairingRequest) -> Result<Device, OmniHubError> {
        self.pairing.pair(request).await
    }

    /// Start pairing in the background and return the job to poll.
    pub fn pair_async(&self, request: PairingRequest) -> JobId {
        let pairing = self.pairing.clone();
        let job_id = self.jobs.start(async move { pairing.pair(request).await });
        tracing::info!(%job_id, "pairing job started");
        job_id
    }

    /// # Errors
    ///
    /// Returns [`OmniHubError::NotFound`] for unknown job ids.
    pub fn pairing_job(&self, job_id: JobId) -> Result<PairingJob, OmniHubError> {
        self.jobs.status(job_id)
    }

    /// # Errors
    ///
    /// Returns [`OmniHubError::NotFound`] for unknown job ids.
    pub async fn wait_for_job(&self, job_id: JobId) -> Result<PairingJob, OmniHubError> {
        self.jobs.wait(job_id).await
    }

    /// Cancel outstanding pairing jobs and close cached sessions.
    pub async fn shutdown(&self) {
        self.jobs.shutdown();
        self.sessions.shutdown().await;
        tracing::info!("hub stopped");
    }
}
