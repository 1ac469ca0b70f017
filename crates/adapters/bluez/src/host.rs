//! [`HostBluetooth`] over BlueZ.

use std::future::Future;

use bluer::agent::AgentHandle;
use tokio::sync::{Mutex, OnceCell};

use omnihub_app::ports::{HostBluetooth, ToolOutput};
use omnihub_domain::capability::MediaAction;
use omnihub_domain::error::{OmniHubError, TransportError};

use crate::agent::{agent_for, agent_script};
use crate::error::BluezError;
use crate::media::{media_script, player_path};
use crate::tool::{self, BLUETOOTHCTL, DEFAULT_LIMIT, SDPTOOL};

/// Host Bluetooth access through the BlueZ daemon and its tools.
///
/// The D-Bus session is opened on first use. The registered agent stays
/// active as long as this value lives.
#[derive(Default)]
pub struct BluezHost {
    session: OnceCell<bluer::Session>,
    agent: Mutex<Option<AgentHandle>>,
}

impl BluezHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn session(&self) -> Result<&bluer::Session, BluezError> {
        self.session
            .get_or_try_init(|| async { Ok::<_, BluezError>(bluer::Session::new().await?) })
            .await
    }
}

impl HostBluetooth for BluezHost {
    fn run_tool(
        &self,
        args: Vec<String>,
    ) -> impl Future<Output = Result<ToolOutput, OmniHubError>> + Send {
        async move {
            let limit = tool::deadline(&args);
            Ok(tool::run(BLUETOOTHCTL, &args, None, limit).await?)
        }
    }

    fn run_agent_script(
        &self,
        capability: &str,
    ) -> impl Future<Output = Result<ToolOutput, OmniHubError>> + Send {
        let script = agent_script(capability);
        async move { Ok(tool::run(BLUETOOTHCTL, &[], Some(&script), DEFAULT_LIMIT).await?) }
    }

    fn register_agent(
        &self,
        capability: &str,
    ) -> impl Future<Output = Result<(), OmniHubError>> + Send {
        let agent = agent_for(capability);
        let capability = capability.to_string();
        async move {
            let agent = agent?;
            let session = self.session().await?;
            let handle = session.register_agent(agent).await.map_err(BluezError::from)?;
            *self.agent.lock().await = Some(handle);
            tracing::info!(%capability, "pairing agent registered on the system bus");
            Ok(())
        }
    }

    fn browse_services(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<String, OmniHubError>> + Send {
        let args = vec!["browse".to_string(), address.to_string()];
        async move {
            let output = tool::run(SDPTOOL, &args, None, DEFAULT_LIMIT).await?;
            if !output.success {
                return Err(TransportError::Failed {
                    operation: "sdptool browse",
                    detail: output.detail(),
                }
                .into());
            }
            Ok(output.stdout)
        }
    }

    fn media_control(
        &self,
        address: &str,
        action: MediaAction,
    ) -> impl Future<Output = Result<ToolOutput, OmniHubError>> + Send {
        let address = address.to_string();
        async move {
            let adapter = self.session().await?.default_adapter().await.map_err(BluezError::from)?;
            let player = player_path(adapter.name(), &address)?;
            let script = media_script(&player, action);
            tracing::debug!(%player, %action, "sending media control");
            Ok(tool::run(BLUETOOTHCTL, &[], Some(&script), DEFAULT_LIMIT).await?)
        }
    }
}
