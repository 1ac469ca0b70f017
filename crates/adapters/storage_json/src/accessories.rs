//! Accessory cache — read-only view of accessories paired by the bridge.
//!
//! The bridge integration writes its accessory list to a JSON file; the hub
//! surfaces those entries as devices. Live toggle and ping need the bridge
//! itself and are reported as unsupported.

use std::future::Future;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use omnihub_app::ports::{AccessoryBridge, AccessoryInfo};
use omnihub_domain::binding::BridgeRef;
use omnihub_domain::error::{OmniHubError, UnsupportedError};

use crate::file::read_json;

/// One cached accessory as written by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedAccessory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub room: Option<String>,
    pub pairing_id: String,
    pub aid: u64,
    pub iid: u64,
    #[serde(default)]
    pub is_on: Option<bool>,
}

impl From<CachedAccessory> for AccessoryInfo {
    fn from(cached: CachedAccessory) -> Self {
        Self {
            identifier: cached.id,
            name: cached.name,
            room: cached.room,
            bridge: BridgeRef {
                pairing_id: cached.pairing_id,
                aid: cached.aid,
                iid: cached.iid,
            },
            is_on: cached.is_on,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JsonAccessoryCache {
    path: PathBuf,
}

impl JsonAccessoryCache {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AccessoryBridge for JsonAccessoryCache {
    fn list_accessories(
        &self,
    ) -> impl Future<Output = Result<Vec<AccessoryInfo>, OmniHubError>> + Send {
        async move {
            let cached: Vec<CachedAccessory> = read_json(&self.path).await?.unwrap_or_default();
            Ok(cached.into_iter().map(AccessoryInfo::from).collect())
        }
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
