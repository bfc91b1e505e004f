//! btleplug-backed transport.
//!
//! [`BleClient`] implements [`Transport`] over a real BLE stack. Driver
//! submissions are fire-and-forget: each kicks off a tokio task whose
//! outcome comes back through the event channel handed out at
//! construction. The link-enabled flag lives here, not in the driver; a
//! failed or dropped connection disables itself so the driver's next poll
//! starts a fresh attempt.

use btleplug::api::{Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use bytes::Bytes;
use futures::stream::StreamExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::ble::uuids::{AIRTHINGS_MANUFACTURER_ID, WAVE_PLUS_SERVICE_UUID};
use crate::error::{Error, Result};
use crate::transport::{CharacteristicHandle, ConnectionId, Event, GattStatus, Transport};

struct Inner {
    /// The BLE adapter in use.
    adapter: Adapter,
    /// The discovered Wave Plus, once found.
    peripheral: RwLock<Option<Peripheral>>,
    /// Resolved characteristics by minted handle, per connection.
    characteristics: RwLock<HashMap<CharacteristicHandle, Characteristic>>,
    /// Handle lookup by (service UUID, characteristic UUID).
    handles: RwLock<HashMap<(Uuid, Uuid), CharacteristicHandle>>,
    /// Source for minted handles.
    next_handle: AtomicU16,
    /// Whether the link is wanted. Toggled by the driver; also cleared
    /// here when a connection fails or drops.
    link_enabled: AtomicBool,
    /// Bumped on every successful connect.
    connection_id: AtomicU16,
    /// Events toward the driver loop.
    event_tx: mpsc::UnboundedSender<Event>,
}

impl Inner {
    fn send(&self, event: Event) {
        // The receiver only goes away on shutdown.
        let _ = self.event_tx.send(event);
    }

    fn connection_id(&self) -> ConnectionId {
        ConnectionId(self.connection_id.load(Ordering::SeqCst))
    }
}

/// btleplug-backed [`Transport`] for a single Wave Plus.
///
/// Cheap to clone; clones share the same link, caches, and event channel.
#[derive(Clone)]
pub struct BleClient {
    inner: Arc<Inner>,
}

impl BleClient {
    /// Create a client on the first available Bluetooth adapter.
    ///
    /// Returns the client and the receiving end of its event channel. The
    /// receiver is the single consumer the driver loop reads from.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<(Self, mpsc::UnboundedReceiver<Event>)> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapters = manager.adapters().await.map_err(Error::Bluetooth)?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(Error::BluetoothUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self::with_adapter(adapter))
    }

    /// Create a client with a specific adapter.
    ///
    /// Spawns the disconnect watcher, so this must be called from within
    /// a tokio runtime.
    pub fn with_adapter(adapter: Adapter) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(Inner {
            adapter,
            peripheral: RwLock::new(None),
            characteristics: RwLock::new(HashMap::new()),
            handles: RwLock::new(HashMap::new()),
            next_handle: AtomicU16::new(1),
            link_enabled: AtomicBool::new(false),
            connection_id: AtomicU16::new(0),
            event_tx,
        });

        let client = Self { inner };
        client.spawn_disconnect_watcher();

        (client, event_rx)
    }

    /// Scan until a Wave Plus shows up, then remember it as the target.
    ///
    /// A device matches when it advertises the Wave Plus sensor service,
    /// carries Airthings manufacturer data, or names itself an
    /// "Airthings Wave".
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] when the timeout elapses first.
    pub async fn discover(&self, timeout: Duration) -> Result<()> {
        info!("Scanning for an Airthings Wave Plus");

        let mut events = self.inner.adapter.events().await.map_err(Error::Bluetooth)?;

        self.inner
            .adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(Error::Bluetooth)?;

        let found = tokio::time::timeout(timeout, async {
            while let Some(event) = events.next().await {
                let id = match event {
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                    CentralEvent::ManufacturerDataAdvertisement {
                        id,
                        manufacturer_data,
                    } if manufacturer_data.contains_key(&AIRTHINGS_MANUFACTURER_ID) => id,
                    _ => continue,
                };

                if let Some(peripheral) = self.matching_peripheral(&id).await {
                    return Some(peripheral);
                }
            }
            None
        })
        .await
        .unwrap_or(None);

        if let Err(e) = self.inner.adapter.stop_scan().await {
            debug!("Failed to stop scan: {}", e);
        }

        match found {
            Some(peripheral) => {
                info!("Found Wave Plus: {:?}", peripheral.id());
                *self.inner.peripheral.write() = Some(peripheral);
                Ok(())
            }
            None => Err(Error::DeviceNotFound {
                identifier: "Airthings Wave Plus".to_string(),
            }),
        }
    }

    /// Fetch the peripheral behind an event id and check whether it is a
    /// Wave Plus.
    async fn matching_peripheral(&self, id: &PeripheralId) -> Option<Peripheral> {
        let peripheral = match self.inner.adapter.peripheral(id).await {
            Ok(p) => p,
            Err(e) => {
                trace!("Failed to get peripheral: {}", e);
                return None;
            }
        };

        let properties = match peripheral.properties().await {
            Ok(Some(p)) => p,
            _ => return None,
        };

        let is_wave_plus = properties
            .manufacturer_data
            .contains_key(&AIRTHINGS_MANUFACTURER_ID)
            || properties.services.contains(&WAVE_PLUS_SERVICE_UUID)
            || properties
                .local_name
                .as_ref()
                .map(|n| n.contains("Airthings Wave"))
                .unwrap_or(false);

        is_wave_plus.then_some(peripheral)
    }

    /// Watch adapter events and surface link loss as [`Event::LinkClosed`].
    fn spawn_disconnect_watcher(&self) {
        let inner = self.inner.clone();

        tokio::spawn(async move {
            let mut events = match inner.adapter.events().await {
                Ok(events) => events,
                Err(e) => {
                    warn!("Failed to get adapter events: {}", e);
                    return;
                }
            };

            while let Some(event) = events.next().await {
                if let CentralEvent::DeviceDisconnected(id) = event {
                    let ours = inner
                        .peripheral
                        .read()
                        .as_ref()
                        .map(|p| p.id() == id)
                        .unwrap_or(false);
                    if !ours {
                        continue;
                    }

                    debug!("Device disconnected: {:?}", id);
                    inner.characteristics.write().clear();
                    inner.handles.write().clear();
                    // A link that dropped on its own is no longer wanted;
                    // the driver's next poll re-enables it.
                    inner.link_enabled.store(false, Ordering::SeqCst);
                    inner.send(Event::LinkClosed);
                }
            }
        });
    }

    /// Cache every characteristic discovery found, minting a stable
    /// handle per (service, characteristic) pair.
    fn cache_characteristics(inner: &Inner, peripheral: &Peripheral) {
        let mut characteristics = inner.characteristics.write();
        let mut handles = inner.handles.write();
        characteristics.clear();
        handles.clear();

        for service in peripheral.services() {
            for characteristic in service.characteristics {
                let handle =
                    CharacteristicHandle(inner.next_handle.fetch_add(1, Ordering::SeqCst));
                trace!(
                    "Characteristic {} in service {} -> handle {}",
                    characteristic.uuid,
                    service.uuid,
                    handle
                );
                handles.insert((service.uuid, characteristic.uuid), handle);
                characteristics.insert(handle, characteristic);
            }
        }

        debug!("Cached {} characteristics", characteristics.len());
    }
}

impl Transport for BleClient {
    fn lookup_characteristic(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Option<CharacteristicHandle> {
        self.inner
            .handles
            .read()
            .get(&(service, characteristic))
            .copied()
    }

    fn read_characteristic(&self, handle: CharacteristicHandle) -> GattStatus {
        let peripheral = match self.inner.peripheral.read().clone() {
            Some(p) => p,
            None => return GattStatus::UNLIKELY_ERROR,
        };
        let characteristic = match self.inner.characteristics.read().get(&handle).cloned() {
            Some(c) => c,
            None => return GattStatus::UNLIKELY_ERROR,
        };

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let connection_id = inner.connection_id();
            match peripheral.read(&characteristic).await {
                Ok(data) => {
                    trace!("Read {} bytes from handle {}", data.len(), handle);
                    inner.send(Event::ReadComplete {
                        connection_id,
                        handle,
                        status: GattStatus::SUCCESS,
                        data: Bytes::from(data),
                    });
                }
                Err(e) => {
                    debug!("Read from handle {} failed: {}", handle, e);
                    inner.send(Event::ReadComplete {
                        connection_id,
                        handle,
                        status: GattStatus::UNLIKELY_ERROR,
                        data: Bytes::new(),
                    });
                }
            }
        });

        GattStatus::SUCCESS
    }

    fn is_link_enabled(&self) -> bool {
        self.inner.link_enabled.load(Ordering::SeqCst)
    }

    fn set_link_enabled(&self, enabled: bool) {
        let was_enabled = self.inner.link_enabled.swap(enabled, Ordering::SeqCst);

        if was_enabled && !enabled {
            // Deliberate release: tear the connection down so another
            // client can take the device's single central slot.
            let inner = self.inner.clone();
            tokio::spawn(async move {
                let peripheral = inner.peripheral.read().clone();
                if let Some(peripheral) = peripheral {
                    match peripheral.disconnect().await {
                        Ok(()) => info!("Released connection to device"),
                        Err(e) => debug!("Disconnect failed: {}", e),
                    }
                }
            });
        }
    }

    fn request_connect(&self) {
        let inner = self.inner.clone();

        tokio::spawn(async move {
            let peripheral = match inner.peripheral.read().clone() {
                Some(p) => p,
                None => {
                    warn!("Connect requested before a device was discovered");
                    inner.link_enabled.store(false, Ordering::SeqCst);
                    return;
                }
            };

            match peripheral.connect().await {
                Ok(()) => {
                    inner.connection_id.fetch_add(1, Ordering::SeqCst);
                    inner.send(Event::LinkOpened {
                        status: GattStatus::SUCCESS,
                    });
                }
                Err(e) => {
                    warn!("Connection attempt failed: {}", e);
                    inner.link_enabled.store(false, Ordering::SeqCst);
                    inner.send(Event::LinkOpened {
                        status: GattStatus::UNLIKELY_ERROR,
                    });
                    inner.send(Event::LinkClosed);
                    return;
                }
            }

            match peripheral.discover_services().await {
                Ok(()) => {
                    BleClient::cache_characteristics(&inner, &peripheral);
                    inner.send(Event::DiscoveryComplete);
                }
                Err(e) => {
                    warn!("Service discovery failed: {}", e);
                    inner.link_enabled.store(false, Ordering::SeqCst);
                    if let Err(e) = peripheral.disconnect().await {
                        debug!("Disconnect after failed discovery failed: {}", e);
                    }
                    inner.send(Event::LinkClosed);
                }
            }
        });
    }

    fn connection_id(&self) -> ConnectionId {
        self.inner.connection_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_is_cheap_to_share() {
        // Clones must share state; the driver and its tasks hold copies.
        fn assert_clone_send_sync<T: Clone + Send + Sync>() {}
        assert_clone_send_sync::<BleClient>();
    }
}
