//! Storage port — persistence of the device registry.

use std::future::Future;

use omnihub_domain::device::Device;
use omnihub_domain::error::OmniHubError;

/// Whole-registry persistence.
///
/// `persist` rewrites everything; callers serialize concurrent persists.
pub trait DeviceStore: Send + Sync {
    /// Load every stored device.
    ///
    /// A missing or corrupt store yields the seed set instead of an error.
    fn load(&self) -> impl Future<Output = Result<Vec<Device>, OmniHubError>> + Send;

    /// Replace the stored registry with `devices`.
    fn persist(&self, devices: Vec<Device>) -> impl Future<Output = Result<(), OmniHubError>> + Send;
}
