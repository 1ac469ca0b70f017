//! BLE adapter error types.

use omnihub_domain::error::{OmniHubError, TransportError, ValidationError};

/// Errors specific to the BLE adapter.
#[derive(Debug, thiserror::Error)]
pub enum BleError {
    /// No BLE adapter found on the host.
    #[error("no BLE adapter available")]
    NotAvailable,

    /// The peripheral was not seen by the host adapter.
    #[error("peripheral {address} not found")]
    PeripheralNotFound { address: String },

    /// The peripheral does not expose the requested characteristic.
    #[error("characteristic {uuid} not found")]
    CharacteristicNotFound { uuid: uuid::Uuid },

    /// The characteristic identifier is not a 16-bit, 32-bit or full UUID.
    #[error("invalid characteristic {0:?}")]
    InvalidAttribute(String),

    /// The address could not be parsed as a Bluetooth address.
    #[error("invalid bluetooth address {0:?}")]
    InvalidAddress(String),

    /// The operation did not finish in time.
    #[error("BLE {0} timed out")]
    Timeout(&'static str),

    /// A btleplug call failed.
    #[error("BLE operation error")]
    Btle(#[from] btleplug::Error),
}

impl BleError {
    fn is_disconnect(&self) -> bool {
        match self {
            Self::Btle(btleplug::Error::NotConnected) => true,
            Self::Btle(err) => {
                let text = err.to_string().to_ascii_lowercase();
                text.contains("disconnect") || text.contains("not connected")
            }
            _ => false,
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::Btle(err) => err.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<BleError> for OmniHubError {
    fn from(err: BleError) -> Self {
        if err.is_disconnect() {
            return TransportError::Closed {
                detail: err.detail(),
            }
            .into();
        }
        match err {
            BleError::InvalidAttribute(value) => ValidationError::InvalidField {
                field: "characteristic",
                value,
            }
            .into(),
            BleError::InvalidAddress(input) => ValidationError::InvalidAddress { input }.into(),
            BleError::Timeout(operation) => TransportError::Timeout { operation }.into(),
            other => TransportError::Failed {
                operation: "ble",
                detail: other.detail(),
            }
            .into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_not_available_error() {
        let err = BleError::NotAvailable;
        assert_eq!(err.to_string(), "no BLE adapter available");
    }

    #[test]
    fn should_convert_not_connected_to_closed_transport() {
        let err: OmniHubError = BleError::Btle(btleplug::Error::NotConnected).into();
        assert!(matches!(
            err,
            OmniHubError::Transport(TransportError::Closed { .. })
        ));
    }

    #[test]
    fn should_convert_timeout_to_transport_timeout() {
        let err: OmniHubError = BleError::Timeout("write").into();
        assert_eq!(err.to_string(), "transport error: write timed out");
    }

    #[test]
    fn should_convert_invalid_attribute_to_validation_error() {
        let err: OmniHubError = BleError::InvalidAttribute("zz".to_string()).into();
        assert!(matches!(err, OmniHubError::Validation(_)));
    }

    #[test]
    fn should_convert_missing_peripheral_to_failed_transport() {
        let err: OmniHubError = BleError::PeripheralNotFound {
            address: "AA:BB:CC:DD:EE:FF".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "transport error: ble failed: peripheral AA:BB:CC:DD:EE:FF not found"
        );
    }
}
