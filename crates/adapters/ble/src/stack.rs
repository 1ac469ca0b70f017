//! [`WirelessStack`] over the host's first BLE adapter.

use std::future::Future;
use std::time::Duration;

use btleplug::api::{BDAddr, Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::sync::OnceCell;

use omnihub_app::ports::{ScannedDevice, WirelessStack};
use omnihub_domain::error::OmniHubError;

use crate::config::BleConfig;
use crate::error::BleError;
use crate::gatt;

const LOOKUP_POLL: Duration = Duration::from_millis(250);

/// Build a [`ScannedDevice`] from advertised properties.
pub(crate) fn scanned(address: BDAddr, name: Option<String>, rssi: Option<i16>) -> ScannedDevice {
    ScannedDevice {
        address: address.to_string().to_ascii_uppercase(),
        name: name.filter(|name| !name.trim().is_empty()),
        rssi,
    }
}

fn parse_address(address: &str) -> Result<BDAddr, BleError> {
    address
        .parse()
        .map_err(|_| BleError::InvalidAddress(address.to_string()))
}

pub struct BleWirelessStack {
    config: BleConfig,
    adapter: OnceCell<Adapter>,
}

impl BleWirelessStack {
    #[must_use]
    pub fn new(config: BleConfig) -> Self {
        Self {
            config,
            adapter: OnceCell::new(),
        }
    }

    async fn adapter(&self) -> Result<&Adapter, BleError> {
        self.adapter
            .get_or_try_init(|| async {
                let manager = Manager::new().await?;
                let adapters = manager.adapters().await?;
                let central = adapters.into_iter().next().ok_or(BleError::NotAvailable)?;
                tracing::debug!("BLE adapter opened");
                Ok::<_, BleError>(central)
            })
            .await
    }

    async fn known(&self, central: &Adapter, address: BDAddr) -> Result<Option<Peripheral>, BleError> {
        for peripheral in central.peripherals().await? {
            if peripheral.address() == address {
                return Ok(Some(peripheral));
            }
        }
        Ok(None)
    }

    /// Find `address` among known peripherals, scanning briefly if needed.
    async fn lookup(&self, address: BDAddr) -> Result<Peripheral, BleError> {
        let central = self.adapter().await?;
        if let Some(peripheral) = self.known(central, address).await? {
            return Ok(peripheral);
        }

        tracing::debug!(%address, "peripheral unknown, scanning");
        central.start_scan(ScanFilter::default()).await?;
        let deadline = tokio::time::Instant::now() + self.config.lookup_scan();
        let mut found = None;
        while tokio::time::Instant::now() < deadline {
            tokio::time::sleep(LOOKUP_POLL).await;
            found = self.known(central, address).await?;
            if found.is_some() {
                break;
            }
        }
        if let Err(err) = central.stop_scan().await {
            tracing::warn!(%err, "failed to stop BLE scan");
        }
        found.ok_or_else(|| BleError::PeripheralNotFound {
            address: address.to_string(),
        })
    }

    async fn reach(&self, address: BDAddr) -> Result<bool, BleError> {
        let peripheral = self.lookup(address).await?;
        peripheral.connect().await?;
        let connected = peripheral.is_connected().await.unwrap_or(true);
        if let Err(err) = peripheral.disconnect().await {
            tracing::warn!(%err, %address, "failed to disconnect after reachability check");
        }
        Ok(connected)
    }

    async fn scan_inner(&self, timeout: Duration) -> Result<Vec<ScannedDevice>, BleError> {
        let central = self.adapter().await?;
        central.start_scan(ScanFilter::default()).await?;
        tokio::time::sleep(timeout).await;
        central.stop_scan().await?;

        let mut found = Vec::new();
        for peripheral in central.peripherals().await? {
            let Ok(Some(props)) = peripheral.properties().await else {
                continue;
            };
            found.push(scanned(props.address, props.local_name, props.rssi));
        }
        tracing::info!(count = found.len(), "BLE scan complete");
        Ok(found)
    }
}

impl WirelessStack for BleWirelessStack {
    fn scan(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<ScannedDevice>, OmniHubError>> + Send {
        async move { Ok(self.scan_inner(timeout).await?) }
    }

    fn connect(
        &self,
        address: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<bool, OmniHubError>> + Send {
        let address = parse_address(address);
        async move {
            let address = address?;
            match tokio::time::timeout(timeout, self.reach(address)).await {
                Ok(Ok(connected)) => Ok(connected),
                Ok(Err(BleError::PeripheralNotFound { .. })) | Err(_) => Ok(false),
                Ok(Err(BleError::Btle(err))) => {
                    tracing::debug!(%err, %address, "BLE connect failed");
                    Ok(false)
                }
                Ok(Err(err)) => Err(err.into()),
            }
        }
    }

    fn write_attribute(
        &self,
        address: &str,
        attribute: &str,
        payload: &[u8],
        with_response: bool,
    ) -> impl Future<Output = Result<(), OmniHubError>> + Send {
        let target = parse_address(address).and_then(|address| {
            gatt::parse_attribute(attribute).map(|uuid| (address, uuid))
        });
        let payload = payload.to_vec();
        async move {
            let (address, uuid) = target?;
            let write = async {
                let peripheral = self.lookup(address).await?;
                gatt::write_characteristic(&peripheral, uuid, &payload, with_response).await
            };
            tokio::time::timeout(self.config.write_connect_timeout(), write)
                .await
                .map_err(|_| BleError::Timeout("write"))??;
            tracing::debug!(%address, %uuid, bytes = payload.len(), "attribute written");
            Ok(())
        }
    }
}
