//! BLE communication module.
//!
//! This module provides the btleplug-backed transport and the UUID
//! constants for talking to a Wave Plus.

pub mod client;
pub mod uuids;

pub use client::BleClient;
pub use uuids::*;
