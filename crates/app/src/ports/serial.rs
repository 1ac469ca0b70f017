//! Serial channel port — RFCOMM byte exchange.

use std::future::Future;

use omnihub_domain::command::SerialOptions;
use omnihub_domain::error::OmniHubError;

/// A transient serial connection per exchange.
pub trait SerialChannel: Send + Sync {
    /// Connect, wait `options.wait`, send `payload`, then read up to
    /// `options.response_bytes` within `options.response_timeout`.
    ///
    /// A short read is not an error: whatever arrived is returned.
    fn exchange(
        &self,
        address: &str,
        channel: u8,
        payload: &[u8],
        options: SerialOptions,
    ) -> impl Future<Output = Result<Vec<u8>, OmniHubError>> + Send;
}
