//! BLE adapter error types.

use smarttrack_domain::error::TrackerError;

/// Errors specific to the BLE adapter.
#[derive(Debug, thiserror::Error)]
pub enum BleError {
    /// No BLE adapter found on the host.
    #[error("no BLE adapter available")]
    NotAvailable,

    /// A btleplug operation failed.
    #[error("BLE operation failed")]
    Btleplug(#[from] btleplug::Error),

    /// The peripheral was never seen by this adapter.
    #[error("unknown peripheral {0}")]
    UnknownPeripheral(String),

    /// The service is not part of the discovered topology.
    #[error("unknown service {0}")]
    UnknownService(uuid::Uuid),

    /// The characteristic is not part of the discovered topology.
    #[error("unknown characteristic {0}")]
    UnknownCharacteristic(uuid::Uuid),
}

impl From<BleError> for TrackerError {
    fn from(err: BleError) -> Self {
        TrackerError::Radio(Box::new(err))
    }
}
