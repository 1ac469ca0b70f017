//! Wireless stack port — BLE discovery and attribute access.

use std::future::Future;
use std::time::Duration;

use omnihub_domain::error::OmniHubError;

/// A peripheral seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedDevice {
    /// Canonical `AA:BB:CC:DD:EE:FF` address.
    pub address: String,
    pub name: Option<String>,
    pub rssi: Option<i16>,
}

/// Short-range wireless primitives.
///
/// Implementations surface an abrupt disconnect as
/// [`TransportError::Closed`](omnihub_domain::error::TransportError::Closed).
pub trait WirelessStack: Send + Sync {
    fn scan(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<ScannedDevice>, OmniHubError>> + Send;

    /// Open and drop a connection; `Ok(false)` when the peer did not answer.
    fn connect(
        &self,
        address: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<bool, OmniHubError>> + Send;

    fn write_attribute(
        &self,
        address: &str,
        attribute: &str,
        payload: &[u8],
        with_response: bool,
    ) -> impl Future<Output = Result<(), OmniHubError>> + Send;
}
