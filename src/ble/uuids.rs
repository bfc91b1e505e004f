//! BLE Service and Characteristic UUIDs.
//!
//! Contains all UUID constants used for Wave Plus communication.

use uuid::Uuid;

// Wave Plus sensor service (Airthings custom)
/// Airthings Wave Plus sensor service UUID.
pub const WAVE_PLUS_SERVICE_UUID: Uuid = Uuid::from_u128(0xb42e1c08_ade7_11e4_89d3_123b93f75cba);
/// Sensor-data characteristic UUID (Read).
pub const SENSOR_DATA_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0xb42e2a68_ade7_11e4_89d3_123b93f75cba);

// Airthings manufacturer ID for advertising data
/// Airthings' Bluetooth manufacturer ID.
pub const AIRTHINGS_MANUFACTURER_ID: u16 = 0x0334;

/// Check if a service UUID is the Wave Plus sensor service.
pub fn is_wave_plus_service(uuid: &Uuid) -> bool {
    *uuid == WAVE_PLUS_SERVICE_UUID
}
