//! Accessory bridge port — an external device source (HomeKit-style).
//!
//! The bridge protocol is opaque to the hub; it only lists accessories and
//! forwards toggle/ping requests using the identifiers it handed out.

use std::future::Future;

use omnihub_domain::binding::BridgeRef;
use omnihub_domain::error::{OmniHubError, UnsupportedError};

/// One accessory as reported by the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryInfo {
    pub identifier: String,
    pub name: String,
    pub room: Option<String>,
    pub bridge: BridgeRef,
    pub is_on: Option<bool>,
}

pub trait AccessoryBridge: Send + Sync {
    fn list_accessories(
        &self,
    ) -> impl Future<Output = Result<Vec<AccessoryInfo>, OmniHubError>> + Send;

    /// Toggle, or set to `desired` when given. Returns the new on/off state.
    fn toggle(
        &self,
        bridge: &BridgeRef,
        desired: Option<bool>,
    ) -> impl Future<Output = Result<bool, OmniHubError>> + Send;

    fn ping(&self, bridge: &BridgeRef) -> impl Future<Output = Result<bool, OmniHubError>> + Send;
}

/// Bridge used when no accessory integration is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAccessoryBridge;

impl AccessoryBridge for NoAccessoryBridge {
    fn list_accessories(
        &self,
    ) -> impl Future<Output = Result<Vec<AccessoryInfo>, OmniHubError>> + Send {
        async { Ok(Vec::new()) }
    }

    fn toggle(
        &self,
        _bridge: &BridgeRef,
        _desired: Option<bool>,
    ) -> impl Future<Output = Result<bool, OmniHubError>> + Send {
        async {
            Err(UnsupportedError::NoProtocolFor {
                operation: "toggle",
            }
            .into())
        }
    }

    fn ping(&self, _bridge: &BridgeRef) -> impl Future<Output = Result<bool, OmniHubError>> + Send {
        async { Err(UnsupportedError::NoProtocolFor { operation: "ping" }.into()) }
    }
}
