//! Protocol module for parsing sensor payloads.

pub mod readings;

pub use readings::{is_valid_sensor_value, SensorReadings, PAYLOAD_VERSION};
