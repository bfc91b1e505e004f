//! The transport seam between the driver and the BLE stack.
//!
//! The driver never talks to a BLE library directly. It holds a
//! [`Transport`] capability for the few link operations it needs, and it
//! consumes [`Event`]s the transport pushes back as the link progresses.
//! Everything the driver submits is fire-and-forget: completion arrives
//! later as a separate event, never as a return value.

use bytes::Bytes;
use std::fmt;
use uuid::Uuid;

/// ATT status code for a link or read operation.
///
/// `0x00` is success; any other value is the raw error code reported by
/// the peer or the local stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GattStatus(pub u8);

impl GattStatus {
    /// The operation completed successfully.
    pub const SUCCESS: Self = Self(0x00);

    /// ATT "Unlikely Error", used as the catch-all when the underlying
    /// stack reports a failure without a protocol-level code.
    pub const UNLIKELY_ERROR: Self = Self(0x0e);

    /// Check whether this status represents success.
    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }
}

impl fmt::Display for GattStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// Identifier for one connection attempt.
///
/// Read completions carry the id of the connection they belong to so
/// results from a torn-down attempt cannot be misrouted into a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConnectionId(pub u16);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle for a characteristic resolved by service discovery.
///
/// Only valid for the connection it was resolved on; the transport will
/// not deliver events for a handle after that link has dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacteristicHandle(pub u16);

impl fmt::Display for CharacteristicHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Asynchronous event pushed from the transport into the driver.
///
/// For a given connection attempt the transport delivers events in the
/// order link-opened, discovery-complete, read-complete, link-closed.
#[derive(Debug, Clone)]
pub enum Event {
    /// The link came up (or failed to; see `status`).
    LinkOpened {
        /// Result of the connection attempt.
        status: GattStatus,
    },
    /// The link went down.
    LinkClosed,
    /// GATT service discovery finished and characteristics can be resolved.
    DiscoveryComplete,
    /// A previously submitted read finished.
    ReadComplete {
        /// The connection attempt this read belongs to.
        connection_id: ConnectionId,
        /// The characteristic that was read.
        handle: CharacteristicHandle,
        /// Result of the read.
        status: GattStatus,
        /// The returned bytes (empty unless `status` is success).
        data: Bytes,
    },
}

/// Link operations the driver is allowed to perform.
///
/// The link itself is a shared resource owned by the transport; the driver
/// only toggles it (enable to attempt a connection, disable to yield it to
/// other clients) and submits single reads. Implementations must not block:
/// `request_connect` and `read_characteristic` kick off work whose outcome
/// arrives later as an [`Event`].
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    /// Resolve a characteristic by service and characteristic UUID.
    ///
    /// Returns `None` when discovery has not run on the current link or
    /// the device does not expose the pair.
    fn lookup_characteristic(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Option<CharacteristicHandle>;

    /// Submit a read for a resolved characteristic.
    ///
    /// The returned status only covers submission; the read result is
    /// delivered later as [`Event::ReadComplete`].
    fn read_characteristic(&self, handle: CharacteristicHandle) -> GattStatus;

    /// Whether the link is currently enabled (connected or connecting).
    fn is_link_enabled(&self) -> bool;

    /// Enable or disable the link. Disabling tears down any connection so
    /// another client can reach the device.
    fn set_link_enabled(&self, enabled: bool);

    /// Start a connection attempt. Progress is reported via [`Event`]s.
    fn request_connect(&self);

    /// The id of the current (or most recent) connection attempt.
    fn connection_id(&self) -> ConnectionId;
}
