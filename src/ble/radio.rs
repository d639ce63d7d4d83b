//! The radio host interface.
//!
//! Controllers never talk to btleplug directly; they are written against the
//! [`Radio`] trait so scanning and connection logic is testable without
//! hardware. [`BtleRadio`] is the production implementation. The radio is an
//! explicitly owned, injected instance, constructed on screen mount and
//! dropped on unmount.

use async_trait::async_trait;
use btleplug::api::{Central, CentralEvent, CentralState, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager};
use futures::stream::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Default negotiated transfer-size hint passed with a connect handshake.
pub const DEFAULT_MTU_HINT: u16 = 512;

/// Power state of the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RadioState {
    /// The radio is powered on and ready.
    PoweredOn,
    /// The radio is powered off.
    PoweredOff,
    /// The radio state could not be determined.
    #[default]
    Unknown,
}

impl std::fmt::Display for RadioState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PoweredOn => write!(f, "PoweredOn"),
            Self::PoweredOff => write!(f, "PoweredOff"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A single advertisement observed during a scan.
///
/// Advertisements may arrive in any order and may duplicate; deduplication
/// is the scan controller's job.
#[derive(Debug, Clone)]
pub struct Advertisement {
    /// Stable peripheral identifier for this session.
    pub id: String,
    /// Advertised name, if the peripheral broadcasts one.
    pub local_name: Option<String>,
    /// Signal strength in dBm (more negative = weaker).
    pub rssi: Option<i16>,
}

/// A service discovered during capability discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    /// The service UUID.
    pub uuid: Uuid,
    /// UUIDs of the service's characteristics.
    pub characteristics: Vec<Uuid>,
}

/// Options for a connect handshake.
#[derive(Debug, Clone, Copy)]
pub struct ConnectOptions {
    /// Requested transfer-size hint. Backends that cannot negotiate it
    /// ignore the hint.
    pub mtu_hint: Option<u16>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            mtu_hint: Some(DEFAULT_MTU_HINT),
        }
    }
}

/// Subscription handle for scan events.
///
/// Returned by [`Radio::start_scan`]; the owning controller holds it for the
/// duration of the scan and releases it on stop. Dropping the handle cancels
/// the underlying event forwarding, so no further events are delivered.
pub struct ScanSubscription {
    rx: mpsc::Receiver<Advertisement>,
    task: Option<JoinHandle<()>>,
}

impl ScanSubscription {
    pub(crate) fn new(rx: mpsc::Receiver<Advertisement>, task: Option<JoinHandle<()>>) -> Self {
        Self { rx, task }
    }

    /// Receive the next advertisement. Returns `None` once the subscription
    /// is closed by the radio.
    pub async fn recv(&mut self) -> Option<Advertisement> {
        self.rx.recv().await
    }
}

impl Drop for ScanSubscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// The radio host, consumed as a black box.
#[async_trait]
pub trait Radio: Send + Sync {
    /// Current power state of the radio.
    async fn state(&self) -> RadioState;

    /// Begin scanning and return the subscription delivering advertisements.
    async fn start_scan(&self) -> Result<ScanSubscription>;

    /// Stop scanning at the radio level.
    async fn stop_scan(&self) -> Result<()>;

    /// Perform a connect handshake with the identified peripheral. The
    /// caller bounds this with its own deadline.
    async fn connect(&self, id: &str, options: ConnectOptions) -> Result<()>;

    /// Enumerate the peripheral's services and characteristics.
    async fn discover_services(&self, id: &str) -> Result<Vec<ServiceInfo>>;

    /// Tear down the link to the identified peripheral.
    async fn disconnect(&self, id: &str) -> Result<()>;
}

/// btleplug-backed radio implementation.
pub struct BtleRadio {
    adapter: Adapter,
}

impl BtleRadio {
    /// Create a radio using the first available Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
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

        Ok(Self { adapter })
    }

    /// Create a radio backed by a specific adapter.
    pub fn with_adapter(adapter: Adapter) -> Self {
        Self { adapter }
    }

    async fn find_peripheral(&self, id: &str) -> Result<btleplug::platform::Peripheral> {
        let peripherals = self.adapter.peripherals().await.map_err(Error::Bluetooth)?;

        peripherals
            .into_iter()
            .find(|p| p.id().to_string() == id)
            .ok_or_else(|| Error::DeviceNotFound {
                identifier: id.to_string(),
            })
    }

    /// Forward one central event's peripheral as an advertisement.
    async fn forward(
        adapter: &Adapter,
        id: btleplug::platform::PeripheralId,
        tx: &mpsc::Sender<Advertisement>,
    ) {
        let peripheral = match adapter.peripheral(&id).await {
            Ok(p) => p,
            Err(e) => {
                trace!("Failed to get peripheral: {}", e);
                return;
            }
        };

        let properties = match peripheral.properties().await {
            Ok(Some(p)) => p,
            _ => return,
        };

        let advertisement = Advertisement {
            id: id.to_string(),
            local_name: properties.local_name,
            rssi: properties.rssi,
        };

        let _ = tx.send(advertisement).await;
    }
}

#[async_trait]
impl Radio for BtleRadio {
    async fn state(&self) -> RadioState {
        match self.adapter.adapter_state().await {
            Ok(CentralState::PoweredOn) => RadioState::PoweredOn,
            Ok(CentralState::PoweredOff) => RadioState::PoweredOff,
            _ => RadioState::Unknown,
        }
    }

    async fn start_scan(&self) -> Result<ScanSubscription> {
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(Error::Bluetooth)?;

        let mut events = self.adapter.events().await.map_err(Error::Bluetooth)?;

        let (tx, rx) = mpsc::channel(64);
        let adapter = self.adapter.clone();

        let task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                match event {
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                        Self::forward(&adapter, id, &tx).await;
                    }
                    CentralEvent::DeviceDisconnected(id) => {
                        debug!("Device disconnected: {:?}", id);
                    }
                    _ => {}
                }

                if tx.is_closed() {
                    break;
                }
            }

            debug!("Scan event forwarding ended");
        });

        Ok(ScanSubscription::new(rx, Some(task)))
    }

    async fn stop_scan(&self) -> Result<()> {
        self.adapter.stop_scan().await.map_err(Error::Bluetooth)
    }

    async fn connect(&self, id: &str, options: ConnectOptions) -> Result<()> {
        let peripheral = self.find_peripheral(id).await?;

        if let Some(mtu) = options.mtu_hint {
            // btleplug negotiates MTU internally; the hint is advisory only.
            trace!(mtu, "Transfer-size hint not negotiable through this backend");
        }

        peripheral.connect().await.map_err(Error::Bluetooth)
    }

    async fn discover_services(&self, id: &str) -> Result<Vec<ServiceInfo>> {
        let peripheral = self.find_peripheral(id).await?;

        peripheral
            .discover_services()
            .await
            .map_err(Error::Bluetooth)?;

        let services = peripheral
            .services()
            .into_iter()
            .map(|s| ServiceInfo {
                uuid: s.uuid,
                characteristics: s.characteristics.iter().map(|c| c.uuid).collect(),
            })
            .collect();

        Ok(services)
    }

    async fn disconnect(&self, id: &str) -> Result<()> {
        let peripheral = self.find_peripheral(id).await?;
        peripheral.disconnect().await.map_err(Error::Bluetooth)
    }
}
