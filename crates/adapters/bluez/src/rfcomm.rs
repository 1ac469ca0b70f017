//! [`SerialChannel`] over BlueZ RFCOMM sockets.

use std::future::Future;
use std::time::Duration;

use bluer::Address;
use bluer::rfcomm::{SocketAddr, Stream};
use tokio::io::{AsyncRead, AsyncReadExt as _, AsyncWriteExt as _};

use omnihub_app::ports::SerialChannel;
use omnihub_domain::command::SerialOptions;
use omnihub_domain::error::OmniHubError;

use crate::error::BluezError;

const READ_CHUNK: usize = 256;

/// Read up to `limit` bytes, giving up once nothing arrives for `idle`.
///
/// Stops early at end of stream. A short read is not an error.
///
/// # Errors
///
/// Returns [`BluezError::Io`] when the underlying read fails.
pub async fn read_response<R>(reader: &mut R, limit: usize, idle: Duration) -> Result<Vec<u8>, BluezError>
where
    R: AsyncRead + Unpin,
{
    let mut response = Vec::with_capacity(limit);
    let mut buffer = [0_u8; READ_CHUNK];
    while response.len() < limit {
        let want = (limit - response.len()).min(READ_CHUNK);
        match tokio::time::timeout(idle, reader.read(&mut buffer[..want])).await {
            Ok(Ok(0)) | Err(_) => break,
            Ok(Ok(read)) => response.extend_from_slice(&buffer[..read]),
            Ok(Err(err)) => return Err(BluezError::Io(err)),
        }
    }
    Ok(response)
}

/// One RFCOMM connection per exchange.
#[derive(Debug, Clone, Copy, Default)]
pub struct RfcommSerial;

impl RfcommSerial {
    async fn exchange_inner(
        address: Address,
        channel: u8,
        payload: &[u8],
        options: SerialOptions,
    ) -> Result<Vec<u8>, BluezError> {
        let mut stream = tokio::time::timeout(
            options.connect_timeout,
            Stream::connect(SocketAddr::new(address, channel)),
        )
        .await
        .map_err(|_| BluezError::ConnectTimeout)?
        .map_err(BluezError::Io)?;

        if !options.wait.is_zero() {
            tokio::time::sleep(options.wait).await;
        }
        if !payload.is_empty() {
            stream.write_all(payload).await.map_err(BluezError::Io)?;
        }
        let response =
            read_response(&mut stream, options.response_bytes, options.response_timeout).await?;

        if let Err(err) = stream.shutdown().await {
            tracing::debug!(%err, %address, "RFCOMM shutdown failed");
        }
        Ok(response)
    }
}

impl SerialChannel for RfcommSerial {
    fn exchange(
        &self,
        address: &str,
        channel: u8,
        payload: &[u8],
        options: SerialOptions,
    ) -> impl Future<Output = Result<Vec<u8>, OmniHubError>> + Send {
        let target = address
            .parse::<Address>()
            .map_err(|_| BluezError::InvalidAddress(address.to_string()));
        let payload = payload.to_vec();
        async move {
            let address = target?;
            tracing::debug!(%address, channel, bytes = payload.len(), "RFCOMM exchange");
            Ok(Self::exchange_inner(address, channel, &payload, options).await?)
        }
    }
}
