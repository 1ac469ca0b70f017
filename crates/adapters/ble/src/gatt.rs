//! GATT helpers for transient characteristic writes.
//!
//! [`write_characteristic`] connects, discovers services, writes, and always
//! disconnects, even on error.

use btleplug::api::{Characteristic, Peripheral as _, WriteType};
use btleplug::platform::Peripheral;
use uuid::Uuid;

use crate::error::BleError;

/// Bluetooth base UUID `00000000-0000-1000-8000-00805f9b34fb`.
const BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5f9b_34fb;

/// Parse a characteristic identifier.
///
/// Accepts 4 or 8 hex digits (optionally `0x`-prefixed), expanded against the
/// Bluetooth base UUID, or a full UUID.
///
/// # Errors
///
/// Returns [`BleError::InvalidAttribute`] for anything else.
pub fn parse_attribute(raw: &str) -> Result<Uuid, BleError> {
    let trimmed = raw.trim();
    let short = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let invalid = || BleError::InvalidAttribute(raw.to_string());
    match short.len() {
        4 | 8 => {
            let value = u32::from_str_radix(short, 16).map_err(|_| invalid())?;
            Ok(Uuid::from_u128(BASE_UUID | (u128::from(value) << 96)))
        }
        _ => Uuid::parse_str(trimmed).map_err(|_| invalid()),
    }
}

fn find_characteristic(peripheral: &Peripheral, uuid: Uuid) -> Result<Characteristic, BleError> {
    peripheral
        .characteristics()
        .into_iter()
        .find(|c| c.uuid == uuid)
        .ok_or(BleError::CharacteristicNotFound { uuid })
}

/// Connect to `peripheral`, write `payload` to the characteristic `uuid`,
/// then disconnect.
///
/// The caller applies the overall timeout.
///
/// # Errors
///
/// Returns [`BleError::CharacteristicNotFound`] when the peripheral does not
/// expose `uuid`, or [`BleError::Btle`] when connecting or writing fails.
pub async fn write_characteristic(
    peripheral: &Peripheral,
    uuid: Uuid,
    payload: &[u8],
    with_response: bool,
) -> Result<(), BleError> {
    peripheral.connect().await?;

    let result = write_inner(peripheral, uuid, payload, with_response).await;

    if let Err(err) = peripheral.disconnect().await {
        tracing::warn!(%err, "failed to disconnect peripheral");
    }

    result
}

async fn write_inner(
    peripheral: &Peripheral,
    uuid: Uuid,
    payload: &[u8],
    with_response: bool,
) -> Result<(), BleError> {
    peripheral.discover_services().await?;
    let characteristic = find_characteristic(peripheral, uuid)?;
    let write_type = if with_response {
        WriteType::WithResponse
    } else {
        WriteType::WithoutResponse
    };
    peripheral.write(&characteristic, payload, write_type).await?;
    Ok(())
}
