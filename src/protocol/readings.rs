//! Sensor payload parsing.
//!
//! Parses the fixed-layout value returned by a read of the Wave Plus
//! sensor-data characteristic.

use crate::error::{Error, Result};

/// The one payload version this crate understands.
pub const PAYLOAD_VERSION: u8 = 1;

/// Upper bound (inclusive) of the device's documented operating range for
/// the 16-bit sensor fields.
pub const MAX_SENSOR_VALUE: i16 = 16383;

/// Check whether a raw 16-bit sensor field holds a usable value.
///
/// Negative values are sentinel/error codes reported by the device and
/// values above [`MAX_SENSOR_VALUE`] are outside its operating range;
/// neither should be published.
pub fn is_valid_sensor_value(value: i16) -> bool {
    (0..=MAX_SENSOR_VALUE).contains(&value)
}

/// One decoded reading from the sensor-data characteristic.
///
/// Raw fields are kept as read off the wire; the accessor methods apply
/// the physical-unit conversions and validity gating.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorReadings {
    /// Payload format version tag.
    pub version: u8,
    /// Relative humidity in half-percent steps.
    pub humidity: u8,
    /// Ambient light level. Diagnostic only; the device reports it but it
    /// is not a calibrated measurement.
    pub ambient_light: u8,
    /// Short-term radon average, Bq/m³.
    pub radon: i16,
    /// Long-term radon average, Bq/m³.
    pub radon_lt: i16,
    /// Temperature in centidegrees Celsius.
    pub temperature: i16,
    /// Pressure in fiftieths of a hectopascal.
    pub pressure: u16,
    /// CO₂ concentration, ppm.
    pub co2: i16,
    /// Total VOC concentration, ppb.
    pub voc: i16,
}

impl SensorReadings {
    /// Minimum payload size (through the VOC field at bytes 14-15).
    pub const MIN_SIZE: usize = 16;

    /// Parse a sensor payload.
    ///
    /// The payload layout is little-endian:
    /// - Byte 0: version tag (must be `1`)
    /// - Byte 1: humidity (uint8, 0.5 %RH per count)
    /// - Byte 2: ambient light (uint8)
    /// - Byte 3: reserved
    /// - Bytes 4-5: radon short-term average (int16, Bq/m³)
    /// - Bytes 6-7: radon long-term average (int16, Bq/m³)
    /// - Bytes 8-9: temperature (int16, 0.01 °C per count)
    /// - Bytes 10-11: pressure (uint16, 0.02 hPa per count)
    /// - Bytes 12-13: CO₂ (int16, ppm)
    /// - Bytes 14-15: VOC (int16, ppb)
    ///
    /// Current firmware returns 20 bytes; the tail beyond byte 15 is
    /// ignored.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::MIN_SIZE {
            return Err(Error::PayloadTooShort {
                actual: data.len(),
                expected: Self::MIN_SIZE,
            });
        }

        let version = data[0];
        if version != PAYLOAD_VERSION {
            return Err(Error::UnsupportedPayloadVersion { version });
        }

        Ok(Self {
            version,
            humidity: data[1],
            ambient_light: data[2],
            radon: i16::from_le_bytes([data[4], data[5]]),
            radon_lt: i16::from_le_bytes([data[6], data[7]]),
            temperature: i16::from_le_bytes([data[8], data[9]]),
            pressure: u16::from_le_bytes([data[10], data[11]]),
            co2: i16::from_le_bytes([data[12], data[13]]),
            voc: i16::from_le_bytes([data[14], data[15]]),
        })
    }

    /// Relative humidity in %RH.
    pub fn humidity_percent(&self) -> f64 {
        self.humidity as f64 / 2.0
    }

    /// Temperature in °C.
    pub fn temperature_celsius(&self) -> f64 {
        self.temperature as f64 / 100.0
    }

    /// Pressure in hPa.
    pub fn pressure_hpa(&self) -> f64 {
        self.pressure as f64 / 50.0
    }

    /// Short-term radon average in Bq/m³, or `None` when the raw value is
    /// a sentinel or out of range.
    pub fn radon_becquerels(&self) -> Option<f64> {
        is_valid_sensor_value(self.radon).then(|| self.radon as f64)
    }

    /// Long-term radon average in Bq/m³, or `None` when the raw value is
    /// a sentinel or out of range.
    pub fn radon_long_term_becquerels(&self) -> Option<f64> {
        is_valid_sensor_value(self.radon_lt).then(|| self.radon_lt as f64)
    }

    /// CO₂ concentration in ppm, or `None` when the raw value is a
    /// sentinel or out of range.
    pub fn co2_ppm(&self) -> Option<f64> {
        is_valid_sensor_value(self.co2).then(|| self.co2 as f64)
    }

    /// Total VOC concentration in ppb, or `None` when the raw value is a
    /// sentinel or out of range.
    pub fn voc_ppb(&self) -> Option<f64> {
        is_valid_sensor_value(self.voc).then(|| self.voc as f64)
    }
}
