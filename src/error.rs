//! Error types for the airthings-wave-ble crate.

use thiserror::Error;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Bluetooth is not available or is disabled on this system.
    #[error("Bluetooth not available or disabled")]
    BluetoothUnavailable,

    /// No Wave Plus was found during discovery.
    #[error("Device not found: {identifier}")]
    DeviceNotFound {
        /// The identifier that was searched for.
        identifier: String,
    },

    /// Operation requires a connection but the device is not connected.
    #[error("Device not connected")]
    NotConnected,

    /// The sensor-data characteristic was not found on the device.
    #[error("Characteristic not found: service {service}, characteristic {characteristic}")]
    CharacteristicNotFound {
        /// The service UUID that was searched.
        service: String,
        /// The characteristic UUID that was searched.
        characteristic: String,
    },

    /// A read returned fewer bytes than the fixed payload layout.
    #[error("Payload too short: {actual} bytes (need at least {expected})")]
    PayloadTooShort {
        /// Number of bytes actually received.
        actual: usize,
        /// Minimum number of bytes the payload layout requires.
        expected: usize,
    },

    /// The payload carried a version tag this crate does not understand.
    #[error("Unsupported payload version {version} (newer firmware or not a Wave Plus?)")]
    UnsupportedPayloadVersion {
        /// The version tag observed in the payload.
        version: u8,
    },
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
