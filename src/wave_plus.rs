//! Wave Plus driver.
//!
//! Drives the read cycle for a single Wave Plus: while disconnected, each
//! poll re-enables the link and asks for a connection; once GATT discovery
//! resolves the sensor-data characteristic, exactly one read is issued;
//! the decoded measurements are published and the link is released so
//! other clients (e.g. the vendor's mobile app) can reach the device.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::ble::uuids::{SENSOR_DATA_CHARACTERISTIC_UUID, WAVE_PLUS_SERVICE_UUID};
use crate::error::Error;
use crate::protocol::SensorReadings;
use crate::sink::MeasurementSinks;
use crate::transport::{CharacteristicHandle, ConnectionId, Event, GattStatus, Transport};

/// Connection state of the driver's read cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No usable link. The next poll starts a fresh connection attempt.
    #[default]
    NotEstablished,
    /// Link open and the sensor-data characteristic resolved.
    Established,
}

impl ConnectionState {
    /// Check if the characteristic is resolved and readable.
    pub fn is_established(&self) -> bool {
        matches!(self, Self::Established)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotEstablished => write!(f, "NotEstablished"),
            Self::Established => write!(f, "Established"),
        }
    }
}

/// Driver for a single Airthings Wave Plus.
///
/// The driver is single-threaded and event-driven: an external scheduler
/// calls [`poll`](WavePlus::poll) on a fixed interval, and the transport
/// pushes [`Event`]s in as the link progresses. Both entry points must be
/// serialized onto one logical execution context; the driver performs no
/// internal locking.
pub struct WavePlus<T: Transport> {
    /// Link capability. The link itself is owned by the transport; the
    /// driver only toggles it through this interface.
    transport: T,
    /// Where decoded measurements go.
    sinks: MeasurementSinks,
    /// Current cycle state.
    state: ConnectionState,
    /// Handle of the sensor-data characteristic, valid while established.
    handle: Option<CharacteristicHandle>,
    /// Completion time of the most recent successful decode.
    last_read_at: Option<DateTime<Utc>>,
}

impl<T: Transport> WavePlus<T> {
    /// Create a driver over a transport with the given sink set.
    pub fn new(transport: T, sinks: MeasurementSinks) -> Self {
        Self {
            transport,
            sinks,
            state: ConnectionState::NotEstablished,
            handle: None,
            last_read_at: None,
        }
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    /// Completion time of the most recent successful decode, if any.
    pub fn last_read_at(&self) -> Option<DateTime<Utc>> {
        self.last_read_at
    }

    /// Scheduler entry point. Safe to call at any cadence.
    ///
    /// A no-op while established; the read cycle is driven entirely by
    /// transport events. While disconnected, re-enables the link and
    /// requests a connection unless an attempt is already underway.
    pub fn poll(&mut self) {
        if self.state.is_established() {
            return;
        }

        if !self.transport.is_link_enabled() {
            warn!("Reconnecting to device");
            self.transport.set_link_enabled(true);
            self.transport.request_connect();
        } else {
            warn!("Connection attempt already in progress");
        }
    }

    /// Feed one transport event into the state machine.
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::LinkOpened { status } => self.on_link_opened(status),
            Event::LinkClosed => self.on_link_closed(),
            Event::DiscoveryComplete => self.on_discovery_complete(),
            Event::ReadComplete {
                connection_id,
                handle,
                status,
                data,
            } => self.on_read_complete(connection_id, handle, status, &data),
        }
    }

    /// Log the fixed configuration and the wired sinks.
    pub fn dump_config(&self) {
        info!("Airthings Wave Plus");
        info!("  Service UUID: {}", WAVE_PLUS_SERVICE_UUID);
        info!("  Characteristic UUID: {}", SENSOR_DATA_CHARACTERISTIC_UUID);
        match self.last_read_at {
            Some(at) => info!("  Last successful read: {}", at.to_rfc3339()),
            None => info!("  Last successful read: never"),
        }
        self.sinks.log_config();
    }

    fn on_link_opened(&mut self, status: GattStatus) {
        if status.is_success() {
            info!("Connected successfully");
        } else {
            // A disconnect event follows; recovery happens on the next poll.
            warn!("Connection attempt finished with status {}", status);
        }
    }

    fn on_link_closed(&mut self) {
        warn!("Disconnected");
        self.state = ConnectionState::NotEstablished;
        self.handle = None;
    }

    fn on_discovery_complete(&mut self) {
        self.handle = None;

        match self
            .transport
            .lookup_characteristic(WAVE_PLUS_SERVICE_UUID, SENSOR_DATA_CHARACTERISTIC_UUID)
        {
            Some(handle) => {
                self.handle = Some(handle);
                self.state = ConnectionState::Established;
                self.request_read();
            }
            None => {
                warn!(
                    "No sensor characteristic found at service {} characteristic {}",
                    WAVE_PLUS_SERVICE_UUID, SENSOR_DATA_CHARACTERISTIC_UUID
                );
            }
        }
    }

    fn on_read_complete(
        &mut self,
        connection_id: ConnectionId,
        handle: CharacteristicHandle,
        status: GattStatus,
        data: &[u8],
    ) {
        if connection_id != self.transport.connection_id() {
            return;
        }
        if !status.is_success() {
            warn!(
                "Error reading characteristic at handle {}, status={}",
                handle, status
            );
            return;
        }
        // Results for unrelated reads must not be misrouted into the decoder.
        if Some(handle) == self.handle {
            self.read_sensors(data);
        }
    }

    /// Issue exactly one read of the resolved sensor-data characteristic.
    fn request_read(&mut self) {
        let Some(handle) = self.handle else {
            debug!("Read requested without a resolved characteristic");
            return;
        };

        let status = self.transport.read_characteristic(handle);
        if !status.is_success() {
            warn!("Error sending read request for sensor, status={}", status);
        }
    }

    fn read_sensors(&mut self, data: &[u8]) {
        let readings = match SensorReadings::parse(data) {
            Ok(readings) => readings,
            Err(Error::PayloadTooShort { actual, expected }) => {
                debug!(
                    "Truncated sensor payload ({} of {} bytes), skipping cycle",
                    actual, expected
                );
                return;
            }
            Err(err) => {
                error!("{}", err);
                return;
            }
        };

        debug!("version = {}", readings.version);
        debug!("ambient light = {}", readings.ambient_light);

        self.sinks.publish_humidity(readings.humidity_percent());
        if let Some(radon) = readings.radon_becquerels() {
            self.sinks.publish_radon(radon);
        }
        if let Some(radon_lt) = readings.radon_long_term_becquerels() {
            self.sinks.publish_radon_long_term(radon_lt);
        }
        self.sinks.publish_temperature(readings.temperature_celsius());
        self.sinks.publish_pressure(readings.pressure_hpa());
        if let Some(co2) = readings.co2_ppm() {
            self.sinks.publish_co2(co2);
        }
        if let Some(voc) = readings.voc_ppb() {
            self.sinks.publish_tvoc(voc);
        }

        self.last_read_at = Some(Utc::now());

        // The device accepts a single central connection, contended with
        // other clients. Release it now rather than holding it until the
        // next cycle.
        self.transport.set_link_enabled(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use bytes::Bytes;
    use mockall::predicate::eq;
    use parking_lot::Mutex;
    use std::sync::Arc;

    type PublishLog = Arc<Mutex<Vec<(&'static str, f64)>>>;

    fn recording_sinks() -> (MeasurementSinks, PublishLog) {
        let log: PublishLog = Arc::new(Mutex::new(Vec::new()));
        let mut sinks = MeasurementSinks::new();
        macro_rules! wire {
            ($method:ident, $name:literal) => {{
                let log = log.clone();
                sinks = sinks.$method(move |value| log.lock().push(($name, value)));
            }};
        }
        wire!(on_humidity, "humidity");
        wire!(on_radon, "radon");
        wire!(on_radon_long_term, "radon_lt");
        wire!(on_temperature, "temperature");
        wire!(on_pressure, "pressure");
        wire!(on_co2, "co2");
        wire!(on_tvoc, "tvoc");
        (sinks, log)
    }

    fn payload(version: u8, humidity: u8, radon: i16) -> Bytes {
        let mut data = vec![0u8; 20];
        data[0] = version;
        data[1] = humidity;
        data[4..6].copy_from_slice(&radon.to_le_bytes());
        data[6..8].copy_from_slice(&25i16.to_le_bytes());
        data[8..10].copy_from_slice(&2150i16.to_le_bytes());
        data[10..12].copy_from_slice(&50000u16.to_le_bytes());
        data[12..14].copy_from_slice(&600i16.to_le_bytes());
        data[14..16].copy_from_slice(&120i16.to_le_bytes());
        Bytes::from(data)
    }

    const HANDLE: CharacteristicHandle = CharacteristicHandle(7);
    const CONN: ConnectionId = ConnectionId(1);

    /// Mock that takes the driver through discovery to `Established`.
    fn established_transport() -> MockTransport {
        let mut transport = MockTransport::new();
        transport
            .expect_lookup_characteristic()
            .with(eq(WAVE_PLUS_SERVICE_UUID), eq(SENSOR_DATA_CHARACTERISTIC_UUID))
            .times(1)
            .return_const(Some(HANDLE));
        transport
            .expect_read_characteristic()
            .with(eq(HANDLE))
            .times(1)
            .return_const(GattStatus::SUCCESS);
        transport.expect_connection_id().return_const(CONN);
        transport
    }

    fn read_complete(data: Bytes) -> Event {
        Event::ReadComplete {
            connection_id: CONN,
            handle: HANDLE,
            status: GattStatus::SUCCESS,
            data,
        }
    }

    #[test]
    fn test_poll_reconnects_when_link_disabled() {
        let mut transport = MockTransport::new();
        transport.expect_is_link_enabled().times(1).return_const(false);
        transport
            .expect_set_link_enabled()
            .with(eq(true))
            .times(1)
            .return_const(());
        transport.expect_request_connect().times(1).return_const(());

        let mut driver = WavePlus::new(transport, MeasurementSinks::new());
        driver.poll();
        assert_eq!(driver.connection_state(), ConnectionState::NotEstablished);
    }

    #[test]
    fn test_poll_waits_while_connection_in_progress() {
        let mut transport = MockTransport::new();
        transport.expect_is_link_enabled().times(1).return_const(true);
        // No set_link_enabled or request_connect expected.

        let mut driver = WavePlus::new(transport, MeasurementSinks::new());
        driver.poll();
    }

    #[test]
    fn test_poll_is_noop_while_established() {
        let mut driver = WavePlus::new(established_transport(), MeasurementSinks::new());
        driver.handle_event(Event::DiscoveryComplete);
        assert_eq!(driver.connection_state(), ConnectionState::Established);

        // Any link inspection or toggle would trip the mock.
        driver.poll();
    }

    #[test]
    fn test_discovery_establishes_and_issues_one_read() {
        let mut driver = WavePlus::new(established_transport(), MeasurementSinks::new());
        driver.handle_event(Event::DiscoveryComplete);
        assert!(driver.connection_state().is_established());
    }

    #[test]
    fn test_discovery_miss_stalls_cycle() {
        let mut transport = MockTransport::new();
        transport
            .expect_lookup_characteristic()
            .times(1)
            .return_const(None);
        // No read may be submitted.

        let mut driver = WavePlus::new(transport, MeasurementSinks::new());
        driver.handle_event(Event::DiscoveryComplete);
        assert_eq!(driver.connection_state(), ConnectionState::NotEstablished);
    }

    #[test]
    fn test_read_submission_failure_is_not_retried() {
        let mut transport = MockTransport::new();
        transport
            .expect_lookup_characteristic()
            .times(1)
            .return_const(Some(HANDLE));
        transport
            .expect_read_characteristic()
            .times(1)
            .return_const(GattStatus::UNLIKELY_ERROR);

        let mut driver = WavePlus::new(transport, MeasurementSinks::new());
        driver.handle_event(Event::DiscoveryComplete);
        // Still established; recovery is deferred to the next full cycle.
        assert!(driver.connection_state().is_established());
    }

    #[test]
    fn test_successful_decode_publishes_and_releases_once() {
        let mut transport = established_transport();
        transport
            .expect_set_link_enabled()
            .with(eq(false))
            .times(1)
            .return_const(());

        let (sinks, log) = recording_sinks();
        let mut driver = WavePlus::new(transport, sinks);
        driver.handle_event(Event::DiscoveryComplete);
        driver.handle_event(read_complete(payload(1, 40, 30)));

        let published = log.lock().clone();
        assert_eq!(
            published,
            vec![
                ("humidity", 20.0),
                ("radon", 30.0),
                ("radon_lt", 25.0),
                ("temperature", 21.5),
                ("pressure", 1000.0),
                ("co2", 600.0),
                ("tvoc", 120.0),
            ]
        );
        assert!(driver.last_read_at().is_some());
    }

    #[test]
    fn test_invalid_radon_skips_channel_but_still_releases() {
        let mut transport = established_transport();
        transport
            .expect_set_link_enabled()
            .with(eq(false))
            .times(1)
            .return_const(());

        let (sinks, log) = recording_sinks();
        let mut driver = WavePlus::new(transport, sinks);
        driver.handle_event(Event::DiscoveryComplete);
        driver.handle_event(read_complete(payload(1, 40, -5)));

        let published = log.lock().clone();
        let channels: Vec<_> = published.iter().map(|(name, _)| *name).collect();
        assert!(!channels.contains(&"radon"));
        assert!(channels.contains(&"humidity"));
        assert!(channels.contains(&"temperature"));
        assert!(channels.contains(&"pressure"));
    }

    #[test]
    fn test_unsupported_version_publishes_nothing_and_keeps_link() {
        // No set_link_enabled expectation: a release would trip the mock.
        let (sinks, log) = recording_sinks();
        let mut driver = WavePlus::new(established_transport(), sinks);
        driver.handle_event(Event::DiscoveryComplete);
        driver.handle_event(read_complete(payload(2, 40, 30)));

        assert!(log.lock().is_empty());
        assert!(driver.last_read_at().is_none());
    }

    #[test]
    fn test_truncated_payload_publishes_nothing_and_keeps_link() {
        let (sinks, log) = recording_sinks();
        let mut driver = WavePlus::new(established_transport(), sinks);
        driver.handle_event(Event::DiscoveryComplete);
        driver.handle_event(read_complete(payload(1, 40, 30).slice(0..10)));

        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_read_for_other_connection_is_ignored() {
        let (sinks, log) = recording_sinks();
        let mut driver = WavePlus::new(established_transport(), sinks);
        driver.handle_event(Event::DiscoveryComplete);
        driver.handle_event(Event::ReadComplete {
            connection_id: ConnectionId(99),
            handle: HANDLE,
            status: GattStatus::SUCCESS,
            data: payload(1, 40, 30),
        });

        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_read_for_other_handle_is_ignored() {
        let (sinks, log) = recording_sinks();
        let mut driver = WavePlus::new(established_transport(), sinks);
        driver.handle_event(Event::DiscoveryComplete);
        driver.handle_event(Event::ReadComplete {
            connection_id: CONN,
            handle: CharacteristicHandle(99),
            status: GattStatus::SUCCESS,
            data: payload(1, 40, 30),
        });

        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_failed_read_status_publishes_nothing() {
        let (sinks, log) = recording_sinks();
        let mut driver = WavePlus::new(established_transport(), sinks);
        driver.handle_event(Event::DiscoveryComplete);
        driver.handle_event(Event::ReadComplete {
            connection_id: CONN,
            handle: HANDLE,
            status: GattStatus::UNLIKELY_ERROR,
            data: Bytes::new(),
        });

        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_link_closed_resets_state() {
        let mut driver = WavePlus::new(established_transport(), MeasurementSinks::new());
        driver.handle_event(Event::DiscoveryComplete);
        assert!(driver.connection_state().is_established());

        driver.handle_event(Event::LinkClosed);
        assert_eq!(driver.connection_state(), ConnectionState::NotEstablished);
    }

    #[test]
    fn test_link_opened_does_not_change_state() {
        let mut driver = WavePlus::new(MockTransport::new(), MeasurementSinks::new());
        driver.handle_event(Event::LinkOpened {
            status: GattStatus::SUCCESS,
        });
        assert_eq!(driver.connection_state(), ConnectionState::NotEstablished);

        driver.handle_event(Event::LinkOpened {
            status: GattStatus::UNLIKELY_ERROR,
        });
        assert_eq!(driver.connection_state(), ConnectionState::NotEstablished);
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(format!("{}", ConnectionState::Established), "Established");
        assert_eq!(
            format!("{}", ConnectionState::NotEstablished),
            "NotEstablished"
        );
    }
}
