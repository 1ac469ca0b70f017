//! IP light port — network lights listed from a catalog and reached by IP.

use std::future::Future;

use omnihub_domain::error::{OmniHubError, UnsupportedError};

/// One light as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpLightInfo {
    pub identifier: String,
    pub name: String,
    /// Device type (`Light`, `Camera`, ...), when the catalog names one.
    pub kind: Option<String>,
    /// IP address or `host:port`.
    pub address: String,
}

pub trait IpLights: Send + Sync {
    fn list_lights(&self) -> impl Future<Output = Result<Vec<IpLightInfo>, OmniHubError>> + Send;

    /// Whether the light answers on its address.
    fn ping(&self, address: &str) -> impl Future<Output = Result<bool, OmniHubError>> + Send;

    /// Switch the light and return its new on/off state.
    fn set_power(
        &self,
        address: &str,
        on: bool,
    ) -> impl Future<Output = Result<bool, OmniHubError>> + Send;
}

/// Source used when no light catalog is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIpLights;

impl IpLights for NoIpLights {
    fn list_lights(&self) -> impl Future<Output = Result<Vec<IpLightInfo>, OmniHubError>> + Send {
        async { Ok(Vec::new()) }
    }

    fn ping(&self, _address: &str) -> impl Future<Output = Result<bool, OmniHubError>> + Send {
        async { Err(UnsupportedError::NoProtocolFor { operation: "ping" }.into()) }
    }

    fn set_power(
        &self,
        address: &str,
        _on: bool,
    ) -> impl Future<Output = Result<bool, OmniHubError>> + Send {
        let address = address.to_string();
        async move { Err(UnsupportedError::LightPowerUnavailable { address }.into()) }
    }
}
