// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # airthings-wave-ble
//!
//! A cross-platform Rust client for reading Airthings Wave Plus air
//! quality monitors via Bluetooth Low Energy.
//!
//! The Wave Plus accepts a single central connection, contended with
//! other clients such as the vendor's mobile app. This crate therefore
//! does the minimum possible work per cycle: connect, resolve the
//! sensor-data characteristic, read it once, publish the decoded
//! measurements, and release the link.
//!
//! ## Measurements
//!
//! - **Humidity** (%RH) and **temperature** (°C)
//! - **Radon**, short-term and long-term averages (Bq/m³)
//! - **Pressure** (hPa)
//! - **CO₂** (ppm) and **total VOC** (ppb)
//!
//! Radon, CO₂, and VOC readings outside the device's documented range
//! (including the negative sentinel codes it reports while warming up)
//! are skipped for the cycle rather than published.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use airthings_wave_ble::{BleClient, MeasurementSinks, Result, WavePlus};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let (client, mut events) = BleClient::new().await?;
//!     client.discover(Duration::from_secs(30)).await?;
//!
//!     let sinks = MeasurementSinks::new()
//!         .on_radon(|bq| println!("radon: {bq} Bq/m³"))
//!         .on_co2(|ppm| println!("co2: {ppm} ppm"));
//!
//!     let mut driver = WavePlus::new(client, sinks);
//!     let mut poll = tokio::time::interval(Duration::from_secs(10));
//!
//!     loop {
//!         tokio::select! {
//!             _ = poll.tick() => driver.poll(),
//!             Some(event) = events.recv() => driver.handle_event(event),
//!         }
//!     }
//! }
//! ```
//!
//! ## Platform Notes
//!
//! ### macOS
//! Requires Bluetooth permission. Add `NSBluetoothAlwaysUsageDescription`
//! to your Info.plist for bundled apps.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### Windows
//! Requires Windows 10 or later with Bluetooth LE support.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for decoded readings

// Public modules
pub mod ble;
pub mod error;
pub mod protocol;
pub mod sink;
pub mod transport;
pub mod wave_plus;

// Re-exports for convenience
pub use ble::client::BleClient;
pub use ble::uuids::{SENSOR_DATA_CHARACTERISTIC_UUID, WAVE_PLUS_SERVICE_UUID};
pub use error::{Error, Result};
pub use protocol::{is_valid_sensor_value, SensorReadings};
pub use sink::MeasurementSinks;
pub use transport::{CharacteristicHandle, ConnectionId, Event, GattStatus, Transport};
pub use wave_plus::{ConnectionState, WavePlus};
